//! Flash-loan arbitrage engine for EVM chains.
//!
//! Scans configured multi-hop routes across constant-product and
//! concentrated-liquidity venues, models profitability after the flash-loan
//! premium and a slippage buffer, and executes the best candidate through a
//! deployed flash-arb contract with a mandatory simulation gate.

pub mod config;
pub mod contracts;
pub mod engine;
pub mod types;
pub mod venue;

pub use config::{load_config, EngineConfig};
pub use engine::{ArbExecutor, ExecutionEngine, PathScanner, Scheduler};
pub use types::{
    EngineError, ExecutionResult, ExecutionStatus, Opportunity, PathResult, Quote, QuoteOutcome,
    Route, Token, Venue, VenueKind,
};
pub use venue::{QuoteSource, VenueQuoter};
