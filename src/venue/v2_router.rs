//! Constant-product quote provider.
//!
//! Quotes through a Uniswap V2-style router (`getAmountsOut`). Tries the
//! direct two-token path first; on failure, retries through the venue's
//! configured hub token (when neither endpoint is the hub) before
//! declaring the pair unavailable.

use super::{call_with_retry, CallFailure, RetryPolicy};
use crate::contracts::IUniswapV2Router02;
use crate::types::{QuoteOutcome, Venue};
use ethers::prelude::Middleware;
use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::debug;

pub struct V2Router<M> {
    provider: Arc<M>,
    policy: RetryPolicy,
}

impl<M: Middleware + 'static> V2Router<M> {
    pub(crate) fn new(provider: Arc<M>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub(crate) async fn quote_outcome(
        &self,
        venue: &Venue,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> QuoteOutcome {
        let router = IUniswapV2Router02::new(venue.entry_point, Arc::clone(&self.provider));

        let direct = self
            .amounts_out(venue, &router, vec![token_in, token_out], amount_in)
            .await;
        let direct_reason = match direct {
            Ok(amount_out) if !amount_out.is_zero() => {
                debug!("{}: direct path filled {} -> {}", venue.name, amount_in, amount_out);
                return QuoteOutcome::Filled {
                    amount_out,
                    fee_tier: None,
                };
            }
            Ok(_) => "direct path returned zero output".to_string(),
            Err(failure) => format!("direct path: {}", failure.reason()),
        };

        // Hub fallback: route through the configured hub token.
        if let Some(hub) = venue.hub_token {
            if token_in != hub && token_out != hub {
                match self
                    .amounts_out(venue, &router, vec![token_in, hub, token_out], amount_in)
                    .await
                {
                    Ok(amount_out) if !amount_out.is_zero() => {
                        debug!(
                            "{}: hub path filled {} -> {} via {:?}",
                            venue.name, amount_in, amount_out, hub
                        );
                        return QuoteOutcome::Filled {
                            amount_out,
                            fee_tier: None,
                        };
                    }
                    Ok(_) => {
                        return QuoteOutcome::Unavailable {
                            reason: format!("{}; hub path returned zero output", direct_reason),
                        }
                    }
                    Err(failure) => {
                        return QuoteOutcome::Unavailable {
                            reason: format!("{}; hub path: {}", direct_reason, failure.reason()),
                        }
                    }
                }
            }
        }

        QuoteOutcome::Unavailable {
            reason: direct_reason,
        }
    }

    /// One `getAmountsOut` call with retry; returns the final path amount.
    async fn amounts_out(
        &self,
        venue: &Venue,
        router: &IUniswapV2Router02<M>,
        path: Vec<Address>,
        amount_in: U256,
    ) -> Result<U256, CallFailure> {
        let label = format!("{} getAmountsOut ({} hops)", venue.name, path.len() - 1);
        let expected_len = path.len();

        let amounts = call_with_retry(&label, &self.policy, || {
            let call = router.get_amounts_out(amount_in, path.clone());
            async move { call.call().await.map_err(|e| e.to_string()) }
        })
        .await?;

        if amounts.len() != expected_len {
            return Err(CallFailure::Exhausted(format!(
                "malformed response: {} amounts for {} path entries",
                amounts.len(),
                expected_len
            )));
        }

        Ok(*amounts.last().expect("validated non-empty"))
    }
}
