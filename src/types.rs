//! Core data model for the arbitrage engine.
//!
//! All on-chain amounts are `U256` integers in the token's smallest unit.
//! Floating point only appears in USD display values, never in amounts that
//! feed repayment or profit comparisons.

use ethers::types::{Address, TxHash, U256};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// A configured token. Immutable after startup.
#[derive(Debug, Clone)]
pub struct Token {
    pub address: Address,
    pub decimals: u8,
    pub symbol: String,
    /// Reference USD price used for profit thresholds and display.
    pub usd_price: Option<f64>,
}

impl Token {
    /// Format a raw amount for human-readable logs.
    pub fn format_amount(&self, amount: U256) -> String {
        let divisor = 10f64.powi(self.decimals as i32);
        format!("{:.6}", u256_to_f64(amount) / divisor)
    }

    /// Convert a raw amount to USD using the configured reference price.
    /// Display/threshold use only.
    pub fn amount_to_usd(&self, amount: U256) -> Option<f64> {
        let price = self.usd_price?;
        let divisor = 10f64.powi(self.decimals as i32);
        Some(u256_to_f64(amount) / divisor * price)
    }
}

/// Liquidity venue families. A closed set: new families are new variants,
/// not address-string branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueKind {
    /// x*y=k reserve-curve AMM quoted through a router (`getAmountsOut`).
    ConstantProduct,
    /// Tick/fee-tier AMM quoted through a Quoter contract.
    ConcentratedLiquidity,
}

impl fmt::Display for VenueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VenueKind::ConstantProduct => write!(f, "V2"),
            VenueKind::ConcentratedLiquidity => write!(f, "V3"),
        }
    }
}

/// A configured liquidity venue. Immutable after startup.
#[derive(Debug, Clone)]
pub struct Venue {
    pub name: String,
    pub kind: VenueKind,
    /// Router address for constant-product venues, Quoter address for
    /// concentrated-liquidity venues.
    pub entry_point: Address,
    /// Optional routing hub (e.g. WMATIC) for two-hop constant-product
    /// fallback when the direct pair has no liquidity.
    pub hub_token: Option<Address>,
}

/// Outcome of a single venue quote call.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    Filled {
        amount_out: U256,
        /// Fee tier actually used (concentrated-liquidity only).
        fee_tier: Option<u32>,
    },
    Unavailable {
        reason: String,
    },
}

/// One venue quote. Created per call, never persisted.
#[derive(Debug, Clone)]
pub struct Quote {
    pub venue: String,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub outcome: QuoteOutcome,
    /// True when produced by the static estimation fallback rather than a
    /// live call. Stale quotes propagate into opportunities and make them
    /// ineligible for automatic execution.
    pub stale: bool,
}

impl Quote {
    /// Output amount if the quote filled, `None` on failure.
    pub fn filled_amount(&self) -> Option<U256> {
        match &self.outcome {
            QuoteOutcome::Filled { amount_out, .. } => Some(*amount_out),
            QuoteOutcome::Unavailable { .. } => None,
        }
    }

    /// Fee tier used, if any.
    pub fn fee_tier(&self) -> Option<u32> {
        match &self.outcome {
            QuoteOutcome::Filled { fee_tier, .. } => *fee_tier,
            QuoteOutcome::Unavailable { .. } => None,
        }
    }
}

/// An ordered multi-hop token route. Static configuration.
/// Closed arbitrage loops have `tokens.first() == tokens.last()`.
#[derive(Debug, Clone)]
pub struct Route {
    pub symbol: String,
    pub tokens: Vec<Address>,
}

impl Route {
    pub fn new(symbol: String, tokens: Vec<Address>) -> Result<Self, EngineError> {
        if tokens.len() < 2 {
            return Err(EngineError::Config(format!(
                "route {} needs at least 2 tokens, got {}",
                symbol,
                tokens.len()
            )));
        }
        Ok(Self { symbol, tokens })
    }

    /// Number of swaps in this route.
    pub fn hop_count(&self) -> usize {
        self.tokens.len() - 1
    }

    /// The token borrowed via flash loan (first in the route).
    pub fn borrow_token(&self) -> Address {
        self.tokens[0]
    }

    /// The token the route ends in (equals the borrow token for closed loops).
    pub fn output_token(&self) -> Address {
        *self.tokens.last().expect("validated non-empty")
    }

    pub fn is_closed_loop(&self) -> bool {
        self.tokens.first() == self.tokens.last()
    }
}

/// Result of evaluating one route variant for one cycle.
#[derive(Debug, Clone)]
pub enum PathResult {
    /// Every hop filled; `amount_out` is the end-to-end output.
    Quoted {
        hops: Vec<Quote>,
        amount_out: U256,
        stale: bool,
    },
    /// A hop failed; the route is skipped for this cycle.
    NoLiquidity { hop: usize, reason: String },
}

/// A candidate profitable trade surviving premium and slippage deductions.
/// Created per scan cycle, discarded after the ranking/execution decision.
#[derive(Debug, Clone)]
pub struct Opportunity {
    pub route: String,
    /// Venue index (into the configured venue list) per hop.
    pub plan: Vec<usize>,
    pub borrow_token: Address,
    pub output_token: Address,
    pub amount_in: U256,
    pub amount_out: U256,
    pub required_repay: U256,
    pub buffered_required: U256,
    /// Net profit in output-token smallest units.
    pub net_profit: U256,
    /// Net profit in reference currency.
    pub profit_usd: f64,
    /// True if any hop quote came from the estimation fallback.
    /// Stale opportunities are reported but never auto-executed.
    pub stale: bool,
    pub hops: Vec<Quote>,
}

/// Terminal status of an execution attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionStatus {
    Succeeded,
    Reverted,
    /// Rejected before any transaction was submitted (simulation failure,
    /// stale quotes, dry-run mode). No funds were at risk.
    FailedBeforeSubmit(String),
}

/// Outcome of one execution attempt.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub route: String,
    pub tx_hash: Option<TxHash>,
    pub status: ExecutionStatus,
    pub gas_used: U256,
}

impl ExecutionResult {
    pub fn rejected(route: &str, reason: impl Into<String>) -> Self {
        Self {
            route: route.to_string(),
            tx_hash: None,
            status: ExecutionStatus::FailedBeforeSubmit(reason.into()),
            gas_used: U256::zero(),
        }
    }
}

/// Engine-level error kinds. Quote failures are data (`QuoteOutcome`),
/// not errors; these cover configuration and execution faults.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("an execution attempt is already in flight")]
    ExecutionInFlight,
    #[error("transaction submission failed: {0}")]
    Submission(String),
    #[error("confirmation failed for {0:?}: {1}")]
    Confirmation(TxHash, String),
}

/// Lossy conversion for display math. Saturates above u128 range.
pub fn u256_to_f64(value: U256) -> f64 {
    if value.bits() > 128 {
        u128::MAX as f64
    } else {
        value.as_u128() as f64
    }
}
