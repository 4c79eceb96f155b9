//! Flowline Core - discrete-event simulation of queueing networks
//!
//! Entities flow from sources through gates, bounded buffers and
//! multi-worker stations. A single logical clock advances from one
//! scheduled event to the next; statistics gathered before the warm-up
//! boundary are discarded.
//!
//! ```text
//! Source ──► Gate ──► Buffer ──► Station ──► ... ──► sink
//!   ▲                                │
//!   └──────── Model (next-event time advance) ◄──┘
//! ```

pub mod config;
pub mod delay;
pub mod entity;
pub mod errors;
pub mod model;
pub mod network;
pub mod random;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::SimulationConfig;
pub use delay::{Delay, DelayConfig, Distribution};
pub use entity::{Entity, EntityId};
pub use errors::{ConfigError, FlowlineError, Result};
pub use model::{MAX_ZERO_LENGTH_TICKS, Model, Observer, RunConfig, SimulationReport, TickAction};
pub use network::{
    BufferSpec, ElementId, ElementKind, ExtractionPolicy, GateSpec, Network, NetworkBuilder,
    NetworkView, SelectionMode, SourceSpec, StationSpec,
};
pub use random::RandomSource;

/// Simulated time. Continuous, starts at zero.
pub type SimTime = f64;
