//! Path scanner.
//!
//! Walks each configured route hop by hop, feeding every hop's output into
//! the next hop's input, and materializes an [`Opportunity`] when the final
//! output clears the buffered repayment. Route variants differ only in
//! which venue serves each hop; all variants of all routes are evaluated
//! concurrently within a cycle, with a single join barrier at the end.

use super::profit;
use crate::config::EngineConfig;
use crate::types::{Opportunity, PathResult, Quote, QuoteOutcome, Route};
use crate::venue::QuoteSource;
use ethers::types::U256;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct PathScanner<Q> {
    quoter: Arc<Q>,
    config: Arc<EngineConfig>,
}

impl<Q: QuoteSource> PathScanner<Q> {
    pub fn new(quoter: Arc<Q>, config: Arc<EngineConfig>) -> Self {
        Self { quoter, config }
    }

    /// Evaluate every route variant once and collect the profitable ones.
    pub async fn scan_cycle(&self) -> Vec<Opportunity> {
        let mut jobs = Vec::new();
        for route in &self.config.routes {
            let Some(amount_in) = self.config.base_amount_for(route.borrow_token()) else {
                warn!(
                    "route {}: no base amount configured for borrow token, skipping",
                    route.symbol
                );
                continue;
            };
            for plan in self.plans_for(route.hop_count()) {
                jobs.push(self.evaluate(route, plan, amount_in));
            }
        }
        join_all(jobs).await.into_iter().flatten().collect()
    }

    /// Quote one route under one venue plan. Hops run sequentially because
    /// each hop's input is the previous hop's output; a failed or zero-output
    /// hop short-circuits the variant for this cycle.
    pub async fn scan_path(&self, route: &Route, plan: &[usize], amount_in: U256) -> PathResult {
        if plan.len() != route.hop_count() {
            return PathResult::NoLiquidity {
                hop: 0,
                reason: format!(
                    "plan has {} entries for {} hops",
                    plan.len(),
                    route.hop_count()
                ),
            };
        }

        let mut hops: Vec<Quote> = Vec::with_capacity(route.hop_count());
        let mut amount = amount_in;
        let mut stale = false;

        for (i, pair) in route.tokens.windows(2).enumerate() {
            let Some(venue) = self.config.venues.get(plan[i]) else {
                return PathResult::NoLiquidity {
                    hop: i,
                    reason: format!("venue index {} out of range", plan[i]),
                };
            };

            let quote = self.quoter.quote(venue, pair[0], pair[1], amount).await;
            match &quote.outcome {
                QuoteOutcome::Filled { amount_out, .. } if !amount_out.is_zero() => {
                    stale |= quote.stale;
                    amount = *amount_out;
                    hops.push(quote);
                }
                QuoteOutcome::Filled { .. } => {
                    return PathResult::NoLiquidity {
                        hop: i,
                        reason: format!("{}: zero output", venue.name),
                    };
                }
                QuoteOutcome::Unavailable { reason } => {
                    return PathResult::NoLiquidity {
                        hop: i,
                        reason: format!("{}: {}", venue.name, reason),
                    };
                }
            }
        }

        PathResult::Quoted {
            hops,
            amount_out: amount,
            stale,
        }
    }

    async fn evaluate(
        &self,
        route: &Route,
        plan: Vec<usize>,
        amount_in: U256,
    ) -> Option<Opportunity> {
        match self.scan_path(route, &plan, amount_in).await {
            PathResult::Quoted {
                hops,
                amount_out,
                stale,
            } => self.build_opportunity(route, plan, amount_in, hops, amount_out, stale),
            PathResult::NoLiquidity { hop, reason } => {
                debug!(
                    "route {} plan {:?}: no liquidity at hop {}: {}",
                    route.symbol, plan, hop, reason
                );
                None
            }
        }
    }

    fn build_opportunity(
        &self,
        route: &Route,
        plan: Vec<usize>,
        amount_in: U256,
        hops: Vec<Quote>,
        amount_out: U256,
        stale: bool,
    ) -> Option<Opportunity> {
        let required_repay = profit::required_repay(amount_in, self.config.premium_bps);
        let buffered_required =
            profit::buffered_required(required_repay, self.config.slippage_buffer_bps);
        let net_profit = profit::net_profit(amount_out, buffered_required);

        if net_profit.is_zero() {
            debug!(
                "route {} plan {:?}: output {} under buffered requirement {}",
                route.symbol, plan, amount_out, buffered_required
            );
            return None;
        }

        let Some(token) = self.config.token(route.output_token()) else {
            warn!("route {}: output token not configured, skipping", route.symbol);
            return None;
        };
        let Some(profit_usd) = profit::profit_usd(net_profit, token) else {
            warn!(
                "route {}: {} has no reference price, cannot value profit, skipping",
                route.symbol, token.symbol
            );
            return None;
        };
        if profit_usd < self.config.min_profit_usd {
            debug!(
                "route {} plan {:?}: ${:.4} under ${:.2} threshold",
                route.symbol, plan, profit_usd, self.config.min_profit_usd
            );
            return None;
        }

        Some(Opportunity {
            route: route.symbol.clone(),
            plan,
            borrow_token: route.borrow_token(),
            output_token: route.output_token(),
            amount_in,
            amount_out,
            required_repay,
            buffered_required,
            net_profit,
            profit_usd,
            stale,
            hops,
        })
    }

    /// Venue assignment variants for a route of `hops` hops: venues
    /// round-robined forward, plus the same rotation in reverse venue order
    /// when that yields a different plan.
    fn plans_for(&self, hops: usize) -> Vec<Vec<usize>> {
        let n = self.config.venues.len();
        let forward: Vec<usize> = (0..hops).map(|i| i % n).collect();
        let reverse: Vec<usize> = (0..hops).map(|i| (n - 1) - (i % n)).collect();
        if forward == reverse {
            vec![forward]
        } else {
            vec![forward, reverse]
        }
    }
}
