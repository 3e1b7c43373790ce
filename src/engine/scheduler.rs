//! Polling scheduler.
//!
//! Fixed-cadence scan loop: quote every route variant, report what was
//! found, rank, then hand at most one candidate to the executor. A cycle
//! that attempted an execution pauses for the longer cooldown interval
//! before the next scan. Cycle-level failures are logged and the loop
//! continues; only shutdown stops it.

use super::cooldown::RouteCooldown;
use super::executor::ExecutionEngine;
use super::ranker;
use super::scanner::PathScanner;
use crate::config::EngineConfig;
use crate::types::ExecutionStatus;
use crate::venue::QuoteSource;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Cooldown defaults in scan cycles.
const INITIAL_COOLDOWN_CYCLES: u64 = 2;
const MAX_COOLDOWN_CYCLES: u64 = 32;
const CLEANUP_EVERY: u64 = 100;

pub struct Scheduler<Q, E> {
    scanner: PathScanner<Q>,
    executor: E,
    cooldown: RouteCooldown,
    config: Arc<EngineConfig>,
    shutdown: watch::Receiver<bool>,
    cycle: u64,
}

impl<Q: QuoteSource, E: ExecutionEngine> Scheduler<Q, E> {
    pub fn new(
        scanner: PathScanner<Q>,
        executor: E,
        config: Arc<EngineConfig>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            scanner,
            executor,
            cooldown: RouteCooldown::new(INITIAL_COOLDOWN_CYCLES, MAX_COOLDOWN_CYCLES),
            config,
            shutdown,
            cycle: 0,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        info!(
            "scheduler started: scan every {:?}, post-execution pause {:?}",
            self.config.scan_interval, self.config.cooldown_interval
        );

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let attempted = self.run_cycle().await;
            let pause = if attempted {
                self.config.cooldown_interval
            } else {
                self.config.scan_interval
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = self.shutdown.changed() => {}
            }
        }

        info!("scheduler stopped after {} cycles", self.cycle);
        Ok(())
    }

    /// One scan cycle. Returns whether an execution was attempted.
    async fn run_cycle(&mut self) -> bool {
        self.cycle += 1;
        if self.cycle % CLEANUP_EVERY == 0 {
            self.cooldown.cleanup(self.cycle);
        }

        let opportunities = self.scanner.scan_cycle().await;
        for opp in &opportunities {
            info!(
                "cycle {}: {} plan {:?} | in {} out {} | net {} (${:.4}){}",
                self.cycle,
                opp.route,
                opp.plan,
                opp.amount_in,
                opp.amount_out,
                opp.net_profit,
                opp.profit_usd,
                if opp.stale { " [STALE]" } else { "" }
            );
        }

        let ranked = ranker::rank(opportunities, self.config.min_profit_usd);
        if ranked.is_empty() {
            debug!("cycle {}: nothing executable", self.cycle);
            return false;
        }

        // Shutdown arriving during the quote fan-in must not start a new
        // submission.
        if *self.shutdown.borrow() {
            info!(
                "cycle {}: shutdown requested, not executing candidates",
                self.cycle
            );
            return false;
        }

        if self.executor.in_flight() {
            warn!(
                "cycle {}: execution still in flight, skipping candidates",
                self.cycle
            );
            return false;
        }

        let candidate = ranked
            .iter()
            .find(|o| !o.stale && !self.cooldown.is_cooled_down(&o.route, &o.plan, self.cycle));
        let Some(opp) = candidate else {
            info!(
                "cycle {}: {} candidates, all stale or cooling down",
                self.cycle,
                ranked.len()
            );
            return false;
        };

        match self.executor.execute(opp).await {
            Ok(result) => match &result.status {
                ExecutionStatus::Succeeded => {
                    info!(
                        "cycle {}: {} executed, tx {:?}, gas {}",
                        self.cycle, result.route, result.tx_hash, result.gas_used
                    );
                    self.cooldown.record_success(&opp.route, &opp.plan);
                }
                ExecutionStatus::Reverted => {
                    warn!(
                        "cycle {}: {} reverted ({:?}), not retrying",
                        self.cycle, result.route, result.tx_hash
                    );
                    self.cooldown.record_failure(&opp.route, &opp.plan, self.cycle);
                }
                ExecutionStatus::FailedBeforeSubmit(reason) => {
                    info!(
                        "cycle {}: {} rejected before submit: {}",
                        self.cycle, result.route, reason
                    );
                    // Dry-run rejections are expected, not route failures.
                    if !reason.starts_with("dry-run") {
                        self.cooldown.record_failure(&opp.route, &opp.plan, self.cycle);
                    }
                }
            },
            Err(e) => {
                error!("cycle {}: execution error: {}", self.cycle, e);
                self.cooldown.record_failure(&opp.route, &opp.plan, self.cycle);
            }
        }

        true
    }
}
