//! Error types for network construction and simulation setup.
//!
//! Only misconfiguration is an error. Buffer overflow, busy stations and
//! routing dead-ends are modelled outcomes that increment counters. The one
//! run-time failure is a clock that stops advancing.

use thiserror::Error;

/// Misconfiguration. Fatal; everything but a stalled clock surfaces before the first tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Element needs a delay distribution but none was configured
    #[error("No delay distribution configured for {element}")]
    MissingDistribution {
        /// Element name
        element: String,
    },

    /// Distribution name is not one of uniform, exponential, normal, erlang
    #[error("Unknown distribution '{name}', expected one of: uniform, exponential, normal, erlang")]
    UnknownDistribution {
        /// Name as supplied by the operator
        name: String,
    },

    /// Distribution selected but its parameter block is absent
    #[error("Missing parameters for {distribution} distribution")]
    MissingParameters {
        /// Distribution name
        distribution: &'static str,
    },

    /// A distribution parameter is out of range
    #[error("Invalid {distribution} parameter {parameter} = {value}")]
    InvalidParameter {
        /// Distribution name
        distribution: &'static str,
        /// Parameter name
        parameter: &'static str,
        /// Offending value
        value: f64,
    },

    /// Successor selection mode name not recognised
    #[error("Unknown selection mode '{mode}', expected one of: default, priority, chance")]
    UnknownSelectionMode {
        /// Mode as supplied by the operator
        mode: String,
    },

    /// Element id does not belong to this network
    #[error("Unknown element id {id}")]
    UnknownElement {
        /// Raw arena index
        id: usize,
    },

    /// Operation applied to an element of the wrong kind
    #[error("{element} is a {actual}, expected a {expected}")]
    WrongElementKind {
        /// Element name
        element: String,
        /// Kind required by the operation
        expected: &'static str,
        /// Kind of the element
        actual: &'static str,
    },

    /// Station declared with zero workers
    #[error("Station {station} must have at least one worker")]
    ZeroWorkers {
        /// Station name
        station: String,
    },

    /// Buffer declared with zero capacity
    #[error("Buffer {buffer} must have a capacity of at least one")]
    ZeroCapacity {
        /// Buffer name
        buffer: String,
    },

    /// Gate forwards to exactly one successor
    #[error("Gate {gate} must have exactly one successor, found {count}")]
    GateFanOut {
        /// Gate name
        gate: String,
        /// Number of successors wired
        count: usize,
    },

    /// Gates wired into a loop have no station or buffer to resolve to
    #[error("Gate chain starting at {gate} loops back on itself")]
    GateCycle {
        /// First gate of the chain
        gate: String,
    },

    /// Sources generate entities, they cannot receive them
    #[error("Source {source_name} cannot be the successor of {from}")]
    SourceAsSuccessor {
        /// Upstream element name
        from: String,
        /// Source name
        source_name: String,
    },

    /// Successor weight is NaN, or not a finite non-negative probability
    /// in chance mode
    #[error("Invalid successor weight {weight} from {from}")]
    InvalidWeight {
        /// Upstream element name
        from: String,
        /// Offending weight
        weight: f64,
    },

    /// Scheduled time must be finite and non-negative
    #[error("Invalid scheduled time {time} for {element}")]
    InvalidScheduleTime {
        /// Element name
        element: String,
        /// Offending time
        time: f64,
    },

    /// Only stations and sources drive the clock
    #[error("{element} cannot schedule its own events")]
    NotSchedulable {
        /// Element name
        element: String,
    },

    /// More initial entities than the element can hold
    #[error("Cannot seed {requested} entities into {element} with room for {capacity}")]
    SeedExceedsCapacity {
        /// Element name
        element: String,
        /// Entities requested
        requested: usize,
        /// Buffer capacity or station worker count
        capacity: usize,
    },

    /// Simulation horizon is inconsistent
    #[error("Invalid horizon: total time {total_time}, warm-up {warmup}")]
    InvalidHorizon {
        /// Total simulated time
        total_time: f64,
        /// Statistics start time
        warmup: f64,
    },

    /// No element has a scheduled event, so the clock can never advance
    #[error("No element has a scheduled event; set an initial schedule before simulating")]
    NothingScheduled,

    /// Source delay can only sample zero, so the source would refire forever
    /// without moving the clock
    #[error("Source {source_name} has a zero inter-arrival delay ({distribution})")]
    ZeroArrivalDelay {
        /// Source name
        source_name: String,
        /// Distribution as configured
        distribution: String,
    },

    /// Too many consecutive ticks fired without the clock moving
    #[error("Clock stalled at {clock} after {ticks} zero-length ticks")]
    ClockStalled {
        /// Clock value that never advanced
        clock: f64,
        /// Consecutive zero-length ticks
        ticks: u64,
    },
}

/// Errors that can bubble up from any Flowline subsystem.
#[derive(Debug, Error)]
pub enum FlowlineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowlineError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            FlowlineError::Config(e) => format!("Invalid model configuration: {e}"),
            FlowlineError::Io(e) => format!("Could not read or write file: {e}"),
            FlowlineError::Json(e) => format!("Malformed scenario file: {e}"),
        }
    }
}

/// Convenience alias for `Result<T, FlowlineError>`.
pub type Result<T> = std::result::Result<T, FlowlineError>;
