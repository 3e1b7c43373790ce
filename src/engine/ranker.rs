//! Opportunity ranking.
//!
//! Keeps strictly profitable opportunities above the USD threshold and
//! orders them best-first. Ties on USD profit break toward the smaller
//! input amount (less capital at risk for the same return).

use crate::types::Opportunity;
use std::cmp::Ordering;

pub fn rank(mut opportunities: Vec<Opportunity>, min_profit_usd: f64) -> Vec<Opportunity> {
    opportunities.retain(|o| !o.net_profit.is_zero() && o.profit_usd >= min_profit_usd);
    opportunities.sort_by(|a, b| {
        b.profit_usd
            .partial_cmp(&a.profit_usd)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.amount_in.cmp(&b.amount_in))
    });
    opportunities
}
