//! Flowline Simulation Scenarios - ready-made queueing networks.
//!
//! Wires the bank and bank-plus-road networks on top of `flowline-core`,
//! collects their scenario-level statistics and checks engine invariants
//! on every tick.
//!
//! # Example
//!
//! ```rust,no_run
//! use flowline_sim::{ScenarioConfig, ScenarioRunner};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runner = ScenarioRunner::new(ScenarioConfig::default());
//! let results = runner.run_all()?;
//! for result in results.iter() {
//!     println!("{}", result.summary());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]

pub mod invariants;
pub mod scenarios;

pub use invariants::{
    BufferCapacityInvariant, BufferScheduleInvariant, ClockMirrorInvariant, Invariant,
    InvariantMonitor, InvariantViolation, StationCapacityInvariant,
};
pub use scenarios::{
    BankLayout, BankMetrics, BankRoadLayout, BankStatistics, HeldOutputDrainer, LaneChanges,
    QueueBalancer, ScenarioConfig, ScenarioError, ScenarioKind, ScenarioResult, ScenarioResults,
    ScenarioRunner, build_bank, build_bank_road,
};
