//! Configuration management.
//!
//! Secrets and endpoints come from the environment (`.env` supported);
//! static tables (tokens, venues, routes, fee tiers) come from a JSON file.
//! Any missing or malformed required setting is fatal at startup — the
//! engine never runs on a partial configuration.

use crate::types::{Route, Token, Venue, VenueKind};
use anyhow::{bail, Context, Result};
use ethers::types::{Address, U256};
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Fee tiers tried for concentrated-liquidity quotes when no pair-specific
/// override is configured, in priority order.
pub const DEFAULT_FEE_TIERS: [u32; 3] = [500, 3_000, 10_000];

/// Fully resolved engine configuration. Read-only after startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub private_key: String,
    pub flash_arb_address: Address,

    pub tokens: Vec<Token>,
    pub venues: Vec<Venue>,
    pub routes: Vec<Route>,
    /// Base trade amount per borrow token, smallest units.
    pub base_amounts: HashMap<Address, U256>,
    /// Pair-specific fee tier priority lists, keyed (token_in, token_out).
    pub fee_tier_overrides: HashMap<(Address, Address), Vec<u32>>,
    pub default_fee_tiers: Vec<u32>,

    pub min_profit_usd: f64,
    pub premium_bps: u32,
    pub slippage_buffer_bps: u32,

    pub scan_interval: Duration,
    pub cooldown_interval: Duration,
    pub quote_timeout: Duration,
    pub retry_count: u32,
    pub retry_backoff: Duration,

    /// Whether the static-price estimator may supply stale fallback quotes
    /// when live venue calls fail.
    pub enable_fallback_estimates: bool,
    pub live_mode: bool,
}

impl EngineConfig {
    pub fn token(&self, address: Address) -> Option<&Token> {
        self.tokens.iter().find(|t| t.address == address)
    }

    pub fn token_by_symbol(&self, symbol: &str) -> Option<&Token> {
        self.tokens.iter().find(|t| t.symbol == symbol)
    }

    /// Display symbol for an address, short hex if unconfigured.
    pub fn symbol_of(&self, address: Address) -> String {
        match self.token(address) {
            Some(token) => token.symbol.clone(),
            None => {
                let hex = format!("{:?}", address);
                hex[..10.min(hex.len())].to_string()
            }
        }
    }

    /// Fee tier priority list for a directed pair: override first,
    /// generic defaults otherwise.
    pub fn fee_tiers_for(&self, token_in: Address, token_out: Address) -> Vec<u32> {
        self.fee_tier_overrides
            .get(&(token_in, token_out))
            .cloned()
            .unwrap_or_else(|| self.default_fee_tiers.clone())
    }

    pub fn base_amount_for(&self, token: Address) -> Option<U256> {
        self.base_amounts.get(&token).copied()
    }
}

// Raw JSON shapes, resolved into the runtime config below.

#[derive(Debug, Deserialize)]
struct RawTables {
    tokens: Vec<RawToken>,
    venues: Vec<RawVenue>,
    /// Routes as ordered token symbol lists, e.g. ["USDC","WETH","USDC"].
    routes: Vec<Vec<String>>,
    /// Directional fee tier overrides keyed "IN/OUT", e.g. "USDC/WETH".
    #[serde(default)]
    fee_tiers: HashMap<String, Vec<u32>>,
}

#[derive(Debug, Deserialize)]
struct RawToken {
    symbol: String,
    address: String,
    decimals: u8,
    #[serde(default)]
    usd_price: Option<f64>,
    /// Base trade amount in smallest units, decimal string.
    #[serde(default)]
    base_amount: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVenue {
    name: String,
    kind: VenueKind,
    entry_point: String,
    /// Hub token symbol for two-hop constant-product fallback.
    #[serde(default)]
    hub_token: Option<String>,
}

/// Load the full engine configuration: environment + JSON tables.
pub fn load_config(tables_path: &str) -> Result<EngineConfig> {
    dotenv::dotenv().ok();

    let json = std::fs::read_to_string(tables_path)
        .with_context(|| format!("failed to read config tables from {}", tables_path))?;

    let rpc_url = required_env("RPC_URL")?;
    let private_key = required_env("PRIVATE_KEY")?;
    let flash_arb_address = parse_address(&required_env("FLASH_ARB_ADDRESS")?)
        .context("FLASH_ARB_ADDRESS is not a valid address")?;
    let chain_id: u64 = env_parse_or("CHAIN_ID", 137)?;

    let mut config = resolve_tables(&json)?;
    config.rpc_url = rpc_url;
    config.private_key = private_key;
    config.flash_arb_address = flash_arb_address;
    config.chain_id = chain_id;

    config.min_profit_usd = env_parse_or("MIN_PROFIT_USD", 1.0)?;
    config.premium_bps = env_parse_or("PREMIUM_BPS", 9)?;
    config.slippage_buffer_bps = env_parse_or("SLIPPAGE_BUFFER_BPS", 200)?;
    config.scan_interval = Duration::from_millis(env_parse_or("SCAN_INTERVAL_MS", 10_000u64)?);
    config.cooldown_interval =
        Duration::from_millis(env_parse_or("COOLDOWN_INTERVAL_MS", 30_000u64)?);
    config.quote_timeout = Duration::from_millis(env_parse_or("QUOTE_TIMEOUT_MS", 10_000u64)?);
    config.retry_count = env_parse_or("RETRY_COUNT", 3)?;
    config.retry_backoff = Duration::from_millis(env_parse_or("RETRY_BACKOFF_MS", 1_000u64)?);
    config.enable_fallback_estimates = env_flag("ENABLE_FALLBACK_ESTIMATES")?;
    config.live_mode = env_flag("LIVE_MODE")?;

    Ok(config)
}

/// Parse and resolve the static JSON tables into an `EngineConfig` with
/// placeholder env-derived fields. Split out for testability.
pub fn resolve_tables(json: &str) -> Result<EngineConfig> {
    let raw: RawTables = serde_json::from_str(json).context("invalid config tables JSON")?;

    let mut tokens = Vec::with_capacity(raw.tokens.len());
    let mut base_amounts = HashMap::new();
    for rt in &raw.tokens {
        let address = parse_address(&rt.address)
            .with_context(|| format!("token {}: invalid address {}", rt.symbol, rt.address))?;
        if let Some(base) = &rt.base_amount {
            let amount = U256::from_dec_str(base)
                .with_context(|| format!("token {}: invalid base_amount {}", rt.symbol, base))?;
            base_amounts.insert(address, amount);
        }
        tokens.push(Token {
            address,
            decimals: rt.decimals,
            symbol: rt.symbol.clone(),
            usd_price: rt.usd_price,
        });
    }

    let lookup = |symbol: &str| -> Result<Address> {
        tokens
            .iter()
            .find(|t| t.symbol == symbol)
            .map(|t| t.address)
            .with_context(|| format!("unknown token symbol: {}", symbol))
    };

    let mut venues = Vec::with_capacity(raw.venues.len());
    for rv in &raw.venues {
        let entry_point = parse_address(&rv.entry_point)
            .with_context(|| format!("venue {}: invalid entry point {}", rv.name, rv.entry_point))?;
        let hub_token = match &rv.hub_token {
            Some(symbol) => Some(lookup(symbol)?),
            None => None,
        };
        venues.push(Venue {
            name: rv.name.clone(),
            kind: rv.kind,
            entry_point,
            hub_token,
        });
    }
    if venues.is_empty() {
        bail!("no venues configured");
    }

    let mut routes = Vec::with_capacity(raw.routes.len());
    for symbols in &raw.routes {
        let addresses = symbols
            .iter()
            .map(|s| lookup(s))
            .collect::<Result<Vec<_>>>()?;
        let symbol = symbols.join(">");
        routes.push(Route::new(symbol, addresses)?);
    }
    if routes.is_empty() {
        bail!("no routes configured");
    }

    let mut fee_tier_overrides = HashMap::new();
    for (pair, tiers) in &raw.fee_tiers {
        let (a, b) = pair
            .split_once('/')
            .with_context(|| format!("fee tier key must be IN/OUT, got {}", pair))?;
        if tiers.is_empty() {
            bail!("fee tier list for {} is empty", pair);
        }
        fee_tier_overrides.insert((lookup(a)?, lookup(b)?), tiers.clone());
    }

    Ok(EngineConfig {
        rpc_url: String::new(),
        chain_id: 137,
        private_key: String::new(),
        flash_arb_address: Address::zero(),
        tokens,
        venues,
        routes,
        base_amounts,
        fee_tier_overrides,
        default_fee_tiers: DEFAULT_FEE_TIERS.to_vec(),
        min_profit_usd: 1.0,
        premium_bps: 9,
        slippage_buffer_bps: 200,
        scan_interval: Duration::from_secs(10),
        cooldown_interval: Duration::from_secs(30),
        quote_timeout: Duration::from_secs(10),
        retry_count: 3,
        retry_backoff: Duration::from_secs(1),
        enable_fallback_estimates: false,
        live_mode: false,
    })
}

fn parse_address(raw: &str) -> Result<Address> {
    Address::from_str(raw.trim()).map_err(|e| anyhow::anyhow!("{}: {}", raw, e))
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{} not set", name))
}

fn env_parse_or<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}={} is invalid: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

fn env_flag(name: &str) -> Result<bool> {
    match std::env::var(name) {
        Ok(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => bail!("{}={} is not a boolean", name, other),
        },
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLES: &str = r#"{
        "tokens": [
            {"symbol": "USDC", "address": "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359", "decimals": 6, "usd_price": 1.0, "base_amount": "100000000"},
            {"symbol": "WETH", "address": "0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619", "decimals": 18, "usd_price": 2500.0},
            {"symbol": "WMATIC", "address": "0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270", "decimals": 18, "usd_price": 0.7}
        ],
        "venues": [
            {"name": "uniswap-v3", "kind": "concentrated_liquidity", "entry_point": "0x61fFE014bA17989E743c5F6cB21bF9697530B21e"},
            {"name": "quickswap-v2", "kind": "constant_product", "entry_point": "0xa5E0829CaCEd8fFDD4De3c43696c57F7D7A678ff", "hub_token": "WMATIC"}
        ],
        "routes": [
            ["USDC", "WETH", "USDC"]
        ],
        "fee_tiers": {
            "USDC/WETH": [500],
            "WETH/USDC": [500, 3000]
        }
    }"#;

    #[test]
    fn test_resolve_tables() {
        let config = resolve_tables(TABLES).unwrap();

        assert_eq!(config.tokens.len(), 3);
        assert_eq!(config.venues.len(), 2);
        assert_eq!(config.routes.len(), 1);

        let usdc = config.token_by_symbol("USDC").unwrap();
        assert_eq!(usdc.decimals, 6);
        assert_eq!(
            config.base_amount_for(usdc.address),
            Some(U256::from(100_000_000u64))
        );

        let route = &config.routes[0];
        assert_eq!(route.symbol, "USDC>WETH>USDC");
        assert!(route.is_closed_loop());

        let v2 = &config.venues[1];
        assert_eq!(v2.kind, VenueKind::ConstantProduct);
        assert_eq!(
            v2.hub_token,
            Some(config.token_by_symbol("WMATIC").unwrap().address)
        );
    }

    #[test]
    fn test_fee_tier_priority() {
        let config = resolve_tables(TABLES).unwrap();
        let usdc = config.token_by_symbol("USDC").unwrap().address;
        let weth = config.token_by_symbol("WETH").unwrap().address;
        let wmatic = config.token_by_symbol("WMATIC").unwrap().address;

        // Directional override
        assert_eq!(config.fee_tiers_for(usdc, weth), vec![500]);
        assert_eq!(config.fee_tiers_for(weth, usdc), vec![500, 3000]);
        // No override falls back to defaults
        assert_eq!(
            config.fee_tiers_for(usdc, wmatic),
            DEFAULT_FEE_TIERS.to_vec()
        );
    }

    #[test]
    fn test_unknown_route_symbol_is_fatal() {
        let json = TABLES.replace("[\"USDC\", \"WETH\", \"USDC\"]", "[\"USDC\", \"DOGE\", \"USDC\"]");
        let err = resolve_tables(&json).unwrap_err();
        assert!(err.to_string().contains("DOGE"));
    }

    #[test]
    fn test_empty_routes_is_fatal() {
        let json = TABLES.replace("[\"USDC\", \"WETH\", \"USDC\"]", "");
        assert!(resolve_tables(&json).is_err());
    }

    #[test]
    fn test_symbol_of_unknown_address() {
        let config = resolve_tables(TABLES).unwrap();
        let label = config.symbol_of(Address::repeat_byte(0xaa));
        assert!(label.starts_with("0x"));
    }
}
