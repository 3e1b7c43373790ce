//! Execution controller.
//!
//! Simulate-then-submit over the deployed flash-arb contract. Every
//! attempt dry-runs the exact calldata via `eth_call` first; a failed
//! simulation rejects the attempt before any transaction exists. At most
//! one attempt is in flight at a time, and a confirmed revert is never
//! retried within the cycle.

use crate::config::EngineConfig;
use crate::contracts::IFlashArb;
use crate::types::{EngineError, ExecutionResult, ExecutionStatus, Opportunity};
use async_trait::async_trait;
use ethers::contract::builders::ContractCall;
use ethers::middleware::SignerMiddleware;
use ethers::prelude::Middleware;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256, U64};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of a single execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    Simulating,
    Submitting,
    Confirming,
}

/// Seam between the scheduler and the transaction layer.
#[async_trait]
pub trait ExecutionEngine: Send {
    async fn execute(&mut self, opportunity: &Opportunity)
        -> Result<ExecutionResult, EngineError>;
    fn in_flight(&self) -> bool;
}

pub struct ArbExecutor<M: Middleware> {
    contract: IFlashArb<SignerMiddleware<M, LocalWallet>>,
    config: Arc<EngineConfig>,
    state: ExecutionState,
    dry_run: bool,
}

impl<M: Middleware + 'static> ArbExecutor<M> {
    pub fn new(provider: M, wallet: LocalWallet, config: Arc<EngineConfig>) -> Self {
        let wallet = wallet.with_chain_id(config.chain_id);
        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        let contract = IFlashArb::new(config.flash_arb_address, client);
        Self {
            contract,
            dry_run: !config.live_mode,
            config,
            state: ExecutionState::Idle,
        }
    }

    fn route_call(
        &self,
        opportunity: &Opportunity,
    ) -> Result<ContractCall<SignerMiddleware<M, LocalWallet>, U256>, EngineError> {
        let (path, venues, fees) = route_params(&self.config, opportunity)?;
        Ok(self.contract.execute_flash_arb(
            opportunity.borrow_token,
            opportunity.amount_in,
            path,
            venues,
            fees,
            opportunity.buffered_required,
        ))
    }
}

#[async_trait]
impl<M: Middleware + 'static> ExecutionEngine for ArbExecutor<M> {
    async fn execute(
        &mut self,
        opportunity: &Opportunity,
    ) -> Result<ExecutionResult, EngineError> {
        if self.state != ExecutionState::Idle {
            return Err(EngineError::ExecutionInFlight);
        }
        if opportunity.stale {
            return Ok(ExecutionResult::rejected(
                &opportunity.route,
                "stale quotes, not eligible for automatic execution",
            ));
        }

        let call = self.route_call(opportunity)?;

        self.state = ExecutionState::Simulating;
        info!(
            "simulating {} plan {:?}: {} in, {} min return",
            opportunity.route, opportunity.plan, opportunity.amount_in, opportunity.buffered_required
        );
        match call.call().await {
            Ok(expected) => debug!("simulation ok, expected return {}", expected),
            Err(e) => {
                self.state = ExecutionState::Idle;
                warn!("{}: simulation failed: {}", opportunity.route, e);
                return Ok(ExecutionResult::rejected(
                    &opportunity.route,
                    format!("simulation failed: {}", e),
                ));
            }
        }

        if self.dry_run {
            self.state = ExecutionState::Idle;
            info!(
                "DRY RUN {}: simulation passed, submission disabled",
                opportunity.route
            );
            return Ok(ExecutionResult::rejected(
                &opportunity.route,
                "dry-run: simulation passed, submission disabled",
            ));
        }

        self.state = ExecutionState::Submitting;
        let pending = match call.send().await {
            Ok(pending) => pending,
            Err(e) => {
                self.state = ExecutionState::Idle;
                return Err(EngineError::Submission(e.to_string()));
            }
        };
        let tx_hash = pending.tx_hash();
        info!("{}: submitted {:?}", opportunity.route, tx_hash);

        self.state = ExecutionState::Confirming;
        let receipt = match pending.await {
            Ok(Some(receipt)) => receipt,
            Ok(None) => {
                self.state = ExecutionState::Idle;
                return Err(EngineError::Confirmation(
                    tx_hash,
                    "transaction dropped without a receipt".to_string(),
                ));
            }
            Err(e) => {
                self.state = ExecutionState::Idle;
                return Err(EngineError::Confirmation(tx_hash, e.to_string()));
            }
        };
        self.state = ExecutionState::Idle;

        let gas_used = receipt.gas_used.unwrap_or_default();
        let status = if receipt.status == Some(U64::from(1)) {
            info!(
                "{}: confirmed in block {:?}, gas used {}",
                opportunity.route, receipt.block_number, gas_used
            );
            ExecutionStatus::Succeeded
        } else {
            warn!("{}: reverted on-chain ({:?})", opportunity.route, tx_hash);
            ExecutionStatus::Reverted
        };

        Ok(ExecutionResult {
            route: opportunity.route.clone(),
            tx_hash: Some(tx_hash),
            status,
            gas_used,
        })
    }

    fn in_flight(&self) -> bool {
        self.state != ExecutionState::Idle
    }
}

/// Calldata parameters for one opportunity: the token path, the venue
/// entry point per hop, and the fee tier per hop (0 marks a
/// constant-product hop).
pub(crate) fn route_params(
    config: &EngineConfig,
    opportunity: &Opportunity,
) -> Result<(Vec<Address>, Vec<Address>, Vec<u32>), EngineError> {
    if opportunity.hops.is_empty() {
        return Err(EngineError::Config(format!(
            "opportunity {} has no hops",
            opportunity.route
        )));
    }
    if opportunity.plan.len() != opportunity.hops.len() {
        return Err(EngineError::Config(format!(
            "opportunity {}: {} plan entries for {} hops",
            opportunity.route,
            opportunity.plan.len(),
            opportunity.hops.len()
        )));
    }

    let mut path = Vec::with_capacity(opportunity.hops.len() + 1);
    path.push(opportunity.hops[0].token_in);
    for hop in &opportunity.hops {
        path.push(hop.token_out);
    }

    let mut venues = Vec::with_capacity(opportunity.plan.len());
    for &index in &opportunity.plan {
        let venue = config.venues.get(index).ok_or_else(|| {
            EngineError::Config(format!("venue index {} out of range", index))
        })?;
        venues.push(venue.entry_point);
    }

    let fees = opportunity
        .hops
        .iter()
        .map(|hop| hop.fee_tier().unwrap_or(0))
        .collect();

    Ok((path, venues, fees))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolve_tables;
    use crate::types::{Quote, QuoteOutcome};
    use ethers::providers::{Http, Provider};

    // Well-known development key, never holds funds.
    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    const TABLES: &str = r#"{
        "tokens": [
            {"symbol": "USDC", "address": "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359", "decimals": 6, "usd_price": 1.0, "base_amount": "100000000"},
            {"symbol": "WETH", "address": "0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619", "decimals": 18, "usd_price": 2500.0}
        ],
        "venues": [
            {"name": "uniswap-v3", "kind": "concentrated_liquidity", "entry_point": "0x61fFE014bA17989E743c5F6cB21bF9697530B21e"},
            {"name": "quickswap-v2", "kind": "constant_product", "entry_point": "0xa5E0829CaCEd8fFDD4De3c43696c57F7D7A678ff"}
        ],
        "routes": [
            ["USDC", "WETH", "USDC"]
        ]
    }"#;

    fn quote(venue: &str, token_in: Address, token_out: Address, fee_tier: Option<u32>) -> Quote {
        Quote {
            venue: venue.to_string(),
            token_in,
            token_out,
            amount_in: U256::from(1u64),
            outcome: QuoteOutcome::Filled {
                amount_out: U256::from(1u64),
                fee_tier,
            },
            stale: false,
        }
    }

    fn opportunity(config: &EngineConfig, stale: bool) -> Opportunity {
        let usdc = config.token_by_symbol("USDC").unwrap().address;
        let weth = config.token_by_symbol("WETH").unwrap().address;
        Opportunity {
            route: "USDC>WETH>USDC".to_string(),
            plan: vec![0, 1],
            borrow_token: usdc,
            output_token: usdc,
            amount_in: U256::from(100_000_000u64),
            amount_out: U256::from(103_500_000u64),
            required_repay: U256::from(100_090_000u64),
            buffered_required: U256::from(102_091_800u64),
            net_profit: U256::from(1_408_200u64),
            profit_usd: 1.4082,
            stale,
            hops: vec![
                quote("uniswap-v3", usdc, weth, Some(500)),
                quote("quickswap-v2", weth, usdc, None),
            ],
        }
    }

    fn executor(config: Arc<EngineConfig>) -> ArbExecutor<Provider<Http>> {
        // Unroutable endpoint: tests must finish before any network call.
        let provider = Provider::<Http>::try_from("http://127.0.0.1:1").unwrap();
        let wallet: LocalWallet = TEST_KEY.parse().unwrap();
        ArbExecutor::new(provider, wallet, config)
    }

    #[test]
    fn test_route_params_layout() {
        let config = resolve_tables(TABLES).unwrap();
        let opp = opportunity(&config, false);
        let usdc = config.token_by_symbol("USDC").unwrap().address;
        let weth = config.token_by_symbol("WETH").unwrap().address;

        let (path, venues, fees) = route_params(&config, &opp).unwrap();
        assert_eq!(path, vec![usdc, weth, usdc]);
        assert_eq!(
            venues,
            vec![config.venues[0].entry_point, config.venues[1].entry_point]
        );
        // Fee tier carries through for the V3 hop, 0 marks the V2 hop.
        assert_eq!(fees, vec![500, 0]);
    }

    #[test]
    fn test_route_params_rejects_bad_venue_index() {
        let config = resolve_tables(TABLES).unwrap();
        let mut opp = opportunity(&config, false);
        opp.plan = vec![0, 9];
        assert!(matches!(
            route_params(&config, &opp),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_route_params_rejects_empty_hops() {
        let config = resolve_tables(TABLES).unwrap();
        let mut opp = opportunity(&config, false);
        opp.hops.clear();
        opp.plan.clear();
        assert!(matches!(
            route_params(&config, &opp),
            Err(EngineError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_opportunity_rejected_before_any_call() {
        let config = Arc::new(resolve_tables(TABLES).unwrap());
        let mut executor = executor(Arc::clone(&config));
        let opp = opportunity(&config, true);

        let result = executor.execute(&opp).await.unwrap();
        match result.status {
            ExecutionStatus::FailedBeforeSubmit(reason) => assert!(reason.contains("stale")),
            other => panic!("expected pre-submit rejection, got {:?}", other),
        }
        assert!(result.tx_hash.is_none());
        assert!(!executor.in_flight());
    }

    #[tokio::test]
    async fn test_in_flight_guard() {
        let config = Arc::new(resolve_tables(TABLES).unwrap());
        let mut executor = executor(Arc::clone(&config));
        executor.state = ExecutionState::Confirming;

        let opp = opportunity(&config, false);
        assert!(executor.in_flight());
        assert!(matches!(
            executor.execute(&opp).await,
            Err(EngineError::ExecutionInFlight)
        ));
    }
}
