//! Pre-built queueing networks.
//!
//! Each scenario wires a network, the observer that integrates its
//! scenario-level statistics and the per-tick hooks it needs.

pub mod bank;
pub mod bank_road;
pub mod runner;
pub mod types;

// Re-export main types
pub use bank::{BankLayout, build_bank};
pub use bank_road::{BankRoadLayout, build_bank_road};
pub use runner::{ScenarioError, ScenarioKind, ScenarioResult, ScenarioResults, ScenarioRunner};
pub use types::{
    BankMetrics, BankStatistics, HeldOutputDrainer, LaneChanges, QueueBalancer, ScenarioConfig,
};
