//! Route-level cooldown tracking.
//!
//! After a failed execution attempt the (route, venue plan) pair sits out
//! a number of scan cycles before it may be attempted again. Repeated
//! failures escalate the cooldown; a success clears the entry.

use std::collections::HashMap;
use tracing::{debug, info};

const ESCALATION_FACTOR: u64 = 5;

type RouteKey = (String, Vec<usize>);

#[derive(Debug, Clone)]
struct CooldownEntry {
    last_failed_cycle: u64,
    cooldown_cycles: u64,
    failure_count: u32,
}

pub struct RouteCooldown {
    entries: HashMap<RouteKey, CooldownEntry>,
    initial_cooldown: u64,
    max_cooldown: u64,
}

impl RouteCooldown {
    pub fn new(initial_cooldown: u64, max_cooldown: u64) -> Self {
        Self {
            entries: HashMap::new(),
            initial_cooldown,
            max_cooldown,
        }
    }

    /// Whether this route variant may be attempted at the given cycle.
    pub fn is_cooled_down(&self, route: &str, plan: &[usize], cycle: u64) -> bool {
        match self.entries.get(&(route.to_string(), plan.to_vec())) {
            Some(entry) => cycle < entry.last_failed_cycle + entry.cooldown_cycles,
            None => false,
        }
    }

    pub fn record_failure(&mut self, route: &str, plan: &[usize], cycle: u64) {
        let key = (route.to_string(), plan.to_vec());
        let entry = self
            .entries
            .entry(key)
            .and_modify(|e| {
                e.last_failed_cycle = cycle;
                e.cooldown_cycles = (e.cooldown_cycles * ESCALATION_FACTOR).min(self.max_cooldown);
                e.failure_count += 1;
            })
            .or_insert(CooldownEntry {
                last_failed_cycle: cycle,
                cooldown_cycles: self.initial_cooldown,
                failure_count: 1,
            });
        info!(
            "route {} plan {:?}: failure #{}, cooling down {} cycles",
            route, plan, entry.failure_count, entry.cooldown_cycles
        );
    }

    pub fn record_success(&mut self, route: &str, plan: &[usize]) {
        if self
            .entries
            .remove(&(route.to_string(), plan.to_vec()))
            .is_some()
        {
            debug!("route {} plan {:?}: success, cooldown cleared", route, plan);
        }
    }

    /// Drop entries whose cooldown has long expired.
    pub fn cleanup(&mut self, cycle: u64) {
        let before = self.entries.len();
        self.entries
            .retain(|_, e| cycle < e.last_failed_cycle + e.cooldown_cycles * 2);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("cooldown cleanup: {} expired entries removed", removed);
        }
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }
}
