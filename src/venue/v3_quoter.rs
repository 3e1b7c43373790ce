//! Concentrated-liquidity quote provider.
//!
//! Quotes through a Uniswap V3-style Quoter contract, walking the fee tier
//! priority list for the pair (pair-specific override first, generic
//! defaults otherwise). The first tier yielding a non-zero output wins;
//! exhausting the list is a failure.

use super::{call_with_retry, CallFailure, RetryPolicy};
use crate::config::EngineConfig;
use crate::contracts::IQuoter;
use crate::types::{QuoteOutcome, Venue};
use ethers::prelude::Middleware;
use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::debug;

pub struct V3Quoter<M> {
    provider: Arc<M>,
    config: Arc<EngineConfig>,
    policy: RetryPolicy,
}

impl<M: Middleware + 'static> V3Quoter<M> {
    pub(crate) fn new(provider: Arc<M>, config: Arc<EngineConfig>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            config,
            policy,
        }
    }

    pub(crate) async fn quote_outcome(
        &self,
        venue: &Venue,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> QuoteOutcome {
        let quoter = IQuoter::new(venue.entry_point, Arc::clone(&self.provider));
        let tiers = self.config.fee_tiers_for(token_in, token_out);
        let mut last_reason = "no fee tiers configured".to_string();

        for fee in tiers {
            let label = format!("{} quote (fee {})", venue.name, fee);
            let result = call_with_retry(&label, &self.policy, || {
                let call = quoter.quote_exact_input_single(
                    token_in,
                    token_out,
                    fee,
                    amount_in,
                    U256::zero(),
                );
                async move { call.call().await.map_err(|e| e.to_string()) }
            })
            .await;

            match result {
                Ok(amount_out) if !amount_out.is_zero() => {
                    debug!(
                        "{}: {} -> {} filled at fee tier {}",
                        venue.name, amount_in, amount_out, fee
                    );
                    return QuoteOutcome::Filled {
                        amount_out,
                        fee_tier: Some(fee),
                    };
                }
                Ok(_) => {
                    last_reason = format!("fee tier {} returned zero output", fee);
                }
                Err(failure) => {
                    last_reason = format!("fee tier {}: {}", fee, failure.reason());
                    if let CallFailure::Exhausted(_) = failure {
                        debug!("{}: retries exhausted at fee tier {}", venue.name, fee);
                    }
                }
            }
        }

        QuoteOutcome::Unavailable {
            reason: format!("all fee tiers failed; last: {}", last_reason),
        }
    }
}
