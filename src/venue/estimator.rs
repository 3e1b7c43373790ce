//! Static-price fallback estimator.
//!
//! Approximates a swap output from configured reference USD prices when
//! every live venue call has failed. Results exist for availability during
//! RPC degradation only: callers must mark them stale, and stale quotes
//! are never eligible for automatic execution.

use crate::config::EngineConfig;
use ethers::types::{Address, U256};
use std::collections::HashMap;

/// Micro-USD price scale (integer arithmetic only for amounts).
const PRICE_SCALE: f64 = 1e6;

pub struct PriceEstimator {
    /// address -> (price in micro-USD, decimals)
    prices: HashMap<Address, (u64, u8)>,
}

impl PriceEstimator {
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut prices = HashMap::new();
        for token in &config.tokens {
            if let Some(price) = token.usd_price {
                if price > 0.0 {
                    let micro = (price * PRICE_SCALE).round() as u64;
                    prices.insert(token.address, (micro, token.decimals));
                }
            }
        }
        Self { prices }
    }

    /// Estimated output amount, or `None` when either token lacks a
    /// configured reference price.
    ///
    /// amount_out = amount_in * price_in * 10^dec_out / (price_out * 10^dec_in)
    pub fn estimate(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Option<U256> {
        let (price_in, dec_in) = *self.prices.get(&token_in)?;
        let (price_out, dec_out) = *self.prices.get(&token_out)?;
        if price_out == 0 {
            return None;
        }

        let numerator = amount_in * U256::from(price_in) * U256::exp10(dec_out as usize);
        let denominator = U256::from(price_out) * U256::exp10(dec_in as usize);
        let amount_out = numerator / denominator;

        if amount_out.is_zero() {
            None
        } else {
            Some(amount_out)
        }
    }
}
