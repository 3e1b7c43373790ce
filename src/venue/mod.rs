//! Venue quote providers.
//!
//! One provider per liquidity-venue family, unified behind [`QuoteSource`]:
//! given (venue, tokenIn, tokenOut, amountIn), produce an output amount or
//! an explicit failure. Providers never raise — every transport fault,
//! revert, timeout, or malformed response becomes a failed `QuoteOutcome`.

mod estimator;
mod v2_router;
mod v3_quoter;

pub use estimator::PriceEstimator;
pub use v2_router::V2Router;
pub use v3_quoter::V3Quoter;

use crate::config::EngineConfig;
use crate::types::{Quote, QuoteOutcome, Venue, VenueKind};
use async_trait::async_trait;
use ethers::prelude::Middleware;
use ethers::types::{Address, U256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The quote contract every venue family implements.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(
        &self,
        venue: &Venue,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Quote;
}

/// Per-call retry settings for transient venue failures.
#[derive(Debug, Clone)]
pub(crate) struct RetryPolicy {
    pub timeout: Duration,
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    fn from_config(config: &EngineConfig) -> Self {
        Self {
            timeout: config.quote_timeout,
            retries: config.retry_count.max(1),
            backoff: config.retry_backoff,
        }
    }
}

/// How a venue call ultimately failed after the retry policy ran out.
#[derive(Debug, Clone)]
pub(crate) enum CallFailure {
    /// The call reverted on-chain. Terminal, never retried.
    Reverted(String),
    /// Timeouts / transport errors exhausted the retry budget.
    Exhausted(String),
}

impl CallFailure {
    pub fn reason(&self) -> &str {
        match self {
            CallFailure::Reverted(msg) | CallFailure::Exhausted(msg) => msg,
        }
    }
}

/// Run a venue call with timeout and bounded linear-backoff retry.
/// Reverts fail immediately; timeouts and transport errors retry up to
/// `policy.retries` attempts with `backoff * attempt` delay between them.
pub(crate) async fn call_with_retry<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    mut attempt: F,
) -> Result<T, CallFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let mut last_error = String::new();

    for i in 0..policy.retries {
        match tokio::time::timeout(policy.timeout, attempt()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(message)) => {
                let lowered = message.to_lowercase();
                if lowered.contains("revert") || lowered.contains("require(false)") {
                    debug!("{}: reverted: {}", label, message);
                    return Err(CallFailure::Reverted(message));
                }
                debug!("{}: attempt {} failed: {}", label, i + 1, message);
                last_error = message;
            }
            Err(_) => {
                debug!("{}: attempt {} timed out", label, i + 1);
                last_error = format!("timed out after {:?}", policy.timeout);
            }
        }

        if i + 1 < policy.retries {
            tokio::time::sleep(policy.backoff * (i + 1)).await;
        }
    }

    Err(CallFailure::Exhausted(format!(
        "{} attempts failed, last: {}",
        policy.retries, last_error
    )))
}

/// Dispatching quote provider over the configured venue families, with an
/// optional static-price fallback for RPC degradation.
pub struct VenueQuoter<M> {
    v2: V2Router<M>,
    v3: V3Quoter<M>,
    estimator: Option<PriceEstimator>,
    config: Arc<EngineConfig>,
}

impl<M: Middleware + 'static> VenueQuoter<M> {
    pub fn new(provider: Arc<M>, config: Arc<EngineConfig>) -> Self {
        let policy = RetryPolicy::from_config(&config);
        let estimator = if config.enable_fallback_estimates {
            Some(PriceEstimator::from_config(&config))
        } else {
            None
        };
        Self {
            v2: V2Router::new(Arc::clone(&provider), policy.clone()),
            v3: V3Quoter::new(provider, Arc::clone(&config), policy),
            estimator,
            config,
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> QuoteSource for VenueQuoter<M> {
    async fn quote(
        &self,
        venue: &Venue,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Quote {
        // Degenerate inputs quote to zero without touching the network.
        if amount_in.is_zero() || token_in == token_out {
            return Quote {
                venue: venue.name.clone(),
                token_in,
                token_out,
                amount_in,
                outcome: QuoteOutcome::Filled {
                    amount_out: U256::zero(),
                    fee_tier: None,
                },
                stale: false,
            };
        }

        let outcome = match venue.kind {
            VenueKind::ConstantProduct => {
                self.v2
                    .quote_outcome(venue, token_in, token_out, amount_in)
                    .await
            }
            VenueKind::ConcentratedLiquidity => {
                self.v3
                    .quote_outcome(venue, token_in, token_out, amount_in)
                    .await
            }
        };

        if let QuoteOutcome::Unavailable { reason } = &outcome {
            if let Some(estimator) = &self.estimator {
                if let Some(amount_out) = estimator.estimate(token_in, token_out, amount_in) {
                    warn!(
                        "{}: live quote failed ({}), using STALE static estimate {} -> {}",
                        venue.name,
                        reason,
                        self.config.symbol_of(token_in),
                        self.config.symbol_of(token_out)
                    );
                    return Quote {
                        venue: venue.name.clone(),
                        token_in,
                        token_out,
                        amount_in,
                        outcome: QuoteOutcome::Filled {
                            amount_out,
                            fee_tier: None,
                        },
                        stale: true,
                    };
                }
            }
        }

        Quote {
            venue: venue.name.clone(),
            token_in,
            token_out,
            amount_in,
            outcome,
            stale: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::{Http, Provider};

    fn test_policy() -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(50),
            retries: 3,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failure() {
        let policy = test_policy();
        let mut calls = 0u32;
        let result = call_with_retry("test", &policy, || {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt < 3 {
                    Err("connection reset".to_string())
                } else {
                    Ok(U256::from(7u64))
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), U256::from(7u64));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_revert_is_terminal() {
        let policy = test_policy();
        let mut calls = 0u32;
        let result: Result<U256, _> = call_with_retry("test", &policy, || {
            calls += 1;
            async { Err("execution reverted: STF".to_string()) }
        })
        .await;
        assert!(matches!(result, Err(CallFailure::Reverted(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_degrade() {
        let policy = test_policy();
        let result: Result<U256, _> = call_with_retry("test", &policy, || async {
            Err("503 service unavailable".to_string())
        })
        .await;
        match result {
            Err(CallFailure::Exhausted(msg)) => assert!(msg.contains("3 attempts")),
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fallback_estimate_is_stale_when_live_quotes_fail() {
        let mut config = crate::config::resolve_tables(
            r#"{
                "tokens": [
                    {"symbol": "USDC", "address": "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359", "decimals": 6, "usd_price": 1.0},
                    {"symbol": "WETH", "address": "0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619", "decimals": 18, "usd_price": 2500.0}
                ],
                "venues": [
                    {"name": "uniswap-v3", "kind": "concentrated_liquidity", "entry_point": "0x61fFE014bA17989E743c5F6cB21bF9697530B21e"}
                ],
                "routes": [["USDC", "WETH", "USDC"]]
            }"#,
        )
        .unwrap();
        config.enable_fallback_estimates = true;
        config.retry_count = 1;
        config.retry_backoff = Duration::from_millis(1);
        config.quote_timeout = Duration::from_millis(200);
        let config = Arc::new(config);

        // Unroutable endpoint: every fee tier fails, the estimator steps in.
        let provider = Arc::new(Provider::<Http>::try_from("http://127.0.0.1:1").unwrap());
        let quoter = VenueQuoter::new(provider, Arc::clone(&config));

        let venue = config.venues[0].clone();
        let usdc = config.token_by_symbol("USDC").unwrap().address;
        let weth = config.token_by_symbol("WETH").unwrap().address;

        let quote = quoter
            .quote(&venue, usdc, weth, U256::from(100_000_000u64))
            .await;

        // 100 USDC at $1 -> 0.04 WETH at $2500, flagged stale.
        assert!(quote.stale);
        assert_eq!(
            quote.filled_amount(),
            Some(U256::from(40_000_000_000_000_000u64))
        );
    }

    #[tokio::test]
    async fn test_no_fallback_without_opt_in() {
        let mut config = crate::config::resolve_tables(
            r#"{
                "tokens": [
                    {"symbol": "USDC", "address": "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359", "decimals": 6, "usd_price": 1.0},
                    {"symbol": "WETH", "address": "0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619", "decimals": 18, "usd_price": 2500.0}
                ],
                "venues": [
                    {"name": "uniswap-v3", "kind": "concentrated_liquidity", "entry_point": "0x61fFE014bA17989E743c5F6cB21bF9697530B21e"}
                ],
                "routes": [["USDC", "WETH", "USDC"]]
            }"#,
        )
        .unwrap();
        config.retry_count = 1;
        config.retry_backoff = Duration::from_millis(1);
        config.quote_timeout = Duration::from_millis(200);
        let config = Arc::new(config);

        let provider = Arc::new(Provider::<Http>::try_from("http://127.0.0.1:1").unwrap());
        let quoter = VenueQuoter::new(provider, Arc::clone(&config));

        let venue = config.venues[0].clone();
        let usdc = config.token_by_symbol("USDC").unwrap().address;
        let weth = config.token_by_symbol("WETH").unwrap().address;

        let quote = quoter
            .quote(&venue, usdc, weth, U256::from(100_000_000u64))
            .await;
        assert!(quote.filled_amount().is_none());
        assert!(!quote.stale);
    }

    #[tokio::test]
    async fn test_degenerate_quote_is_zero_without_network() {
        let tables = crate::config::resolve_tables(
            r#"{
                "tokens": [
                    {"symbol": "USDC", "address": "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359", "decimals": 6, "usd_price": 1.0}
                ],
                "venues": [
                    {"name": "uniswap-v3", "kind": "concentrated_liquidity", "entry_point": "0x61fFE014bA17989E743c5F6cB21bF9697530B21e"}
                ],
                "routes": [["USDC", "USDC"]]
            }"#,
        )
        .unwrap();
        let config = Arc::new(tables);
        let provider = Arc::new(Provider::<Http>::try_from("http://127.0.0.1:1").unwrap());
        let quoter = VenueQuoter::new(provider, Arc::clone(&config));

        let venue = config.venues[0].clone();
        let usdc = config.tokens[0].address;

        // Same token, zero amount: quotes to zero, no venue call issued.
        let quote = quoter.quote(&venue, usdc, usdc, U256::zero()).await;
        assert_eq!(quote.filled_amount(), Some(U256::zero()));
        assert!(!quote.stale);
    }
}
