//! Decision and execution core: profit model, path scanner, ranker,
//! execution controller, cooldown tracking, and the polling scheduler.

pub mod cooldown;
pub mod executor;
pub mod profit;
pub mod ranker;
pub mod scanner;
pub mod scheduler;

pub use cooldown::RouteCooldown;
pub use executor::{ArbExecutor, ExecutionEngine, ExecutionState};
pub use ranker::rank;
pub use scanner::PathScanner;
pub use scheduler::Scheduler;
