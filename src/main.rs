use anyhow::{bail, Context, Result};
use clap::Parser;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use flasharb_bot::config::load_config;
use flasharb_bot::engine::{ArbExecutor, PathScanner, Scheduler};
use flasharb_bot::venue::VenueQuoter;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "flasharb-bot", about = "Flash-loan DEX arbitrage engine")]
struct Args {
    /// Path to the static tables (tokens, venues, routes, fee tiers).
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config/engine.json")]
    config: String,

    /// Submit real transactions. Without this flag every candidate stops
    /// after simulation.
    #[arg(long)]
    live: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut config = load_config(&args.config)?;
    if args.live {
        config.live_mode = true;
    }
    info!(
        "configuration loaded: {} tokens, {} venues, {} routes",
        config.tokens.len(),
        config.venues.len(),
        config.routes.len()
    );
    info!(
        "premium {} bps, slippage buffer {} bps, min profit ${:.2}",
        config.premium_bps, config.slippage_buffer_bps, config.min_profit_usd
    );

    let provider =
        Provider::<Http>::try_from(config.rpc_url.as_str()).context("RPC_URL is not a valid URL")?;
    let provider = Arc::new(provider);

    // Preflight: refuse to start against a dead RPC, a missing contract,
    // or an unfunded signer.
    let block = provider
        .get_block_number()
        .await
        .context("RPC endpoint unreachable")?;
    info!("connected, current block {}", block);

    let code = provider
        .get_code(config.flash_arb_address, None)
        .await
        .context("failed to fetch flash-arb contract code")?;
    if code.as_ref().is_empty() {
        bail!(
            "no contract deployed at {:?} on chain {}",
            config.flash_arb_address,
            config.chain_id
        );
    }

    let wallet: LocalWallet = config
        .private_key
        .parse()
        .context("PRIVATE_KEY is not a valid key")?;
    let wallet = wallet.with_chain_id(config.chain_id);
    let balance = provider.get_balance(wallet.address(), None).await?;
    if balance.is_zero() {
        bail!("signer {:?} has no native balance for gas", wallet.address());
    }
    info!("signer {:?}, gas balance {}", wallet.address(), balance);

    let config = Arc::new(config);
    if config.live_mode {
        warn!("LIVE MODE: real transactions will be submitted");
    } else {
        info!("dry-run mode: candidates are simulated, never submitted");
    }

    let quoter = Arc::new(VenueQuoter::new(Arc::clone(&provider), Arc::clone(&config)));
    let scanner = PathScanner::new(quoter, Arc::clone(&config));
    let executor = ArbExecutor::new(provider.as_ref().clone(), wallet, Arc::clone(&config));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received, finishing current cycle");
            let _ = shutdown_tx.send(true);
        }
    });

    Scheduler::new(scanner, executor, config, shutdown_rx)
        .run()
        .await
}
