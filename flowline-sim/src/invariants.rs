//! Invariant checking framework for simulation validation.
//!
//! Invariants inspect the [`Network`] between ticks. [`InvariantMonitor`]
//! runs a set of them as a [`TickAction`] and keeps the violations it sees.

use std::fmt;

use flowline_core::{ElementKind, Network, SimTime, TickAction};
use serde::Serialize;
use tracing::warn;

/// Maximum number of violations a monitor keeps before it stops recording.
const MAX_INVARIANT_VIOLATIONS: usize = 10;

/// Violation of a simulation invariant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: String,
    /// Detailed description of the violation
    pub description: String,
    /// Simulated time at which the violation was observed
    pub clock: SimTime,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invariant '{}' violated at t={:.4}: {}",
            self.invariant, self.clock, self.description
        )
    }
}

/// Trait for checking simulation invariants.
pub trait Invariant {
    /// Checks if invariant holds for the current network state.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if the invariant condition is not met.
    fn check(&self, network: &Network) -> Result<(), InvariantViolation>;

    /// Returns name of this invariant.
    fn name(&self) -> &str;

    /// Builds a violation of this invariant at the network's clock.
    fn violation(&self, network: &Network, description: String) -> InvariantViolation {
        InvariantViolation {
            invariant: self.name().to_string(),
            description,
            clock: network.clock(),
        }
    }
}

/// Buffers never store more than their capacity.
pub struct BufferCapacityInvariant;

impl Invariant for BufferCapacityInvariant {
    fn check(&self, network: &Network) -> Result<(), InvariantViolation> {
        for id in network.ids_of(ElementKind::Buffer) {
            if let Some(buffer) = network.buffer(id)
                && buffer.len() > buffer.capacity()
            {
                return Err(self.violation(
                    network,
                    format!(
                        "{} stores {} entities, capacity {}",
                        network.name(id),
                        buffer.len(),
                        buffer.capacity()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "BufferCapacity"
    }
}

/// Active tasks plus held outputs never exceed a station's worker count.
pub struct StationCapacityInvariant;

impl Invariant for StationCapacityInvariant {
    fn check(&self, network: &Network) -> Result<(), InvariantViolation> {
        for id in network.ids_of(ElementKind::Station) {
            if let Some(station) = network.station(id)
                && station.occupancy() > station.workers()
            {
                return Err(self.violation(
                    network,
                    format!(
                        "{} has {} active and {} held with {} workers",
                        network.name(id),
                        station.active(),
                        station.held_len(),
                        station.workers()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "StationCapacity"
    }
}

/// Buffers never own a self-triggered event.
pub struct BufferScheduleInvariant;

impl Invariant for BufferScheduleInvariant {
    fn check(&self, network: &Network) -> Result<(), InvariantViolation> {
        for id in network.ids_of(ElementKind::Buffer) {
            if let Some(time) = network.next_event_time(id) {
                return Err(self.violation(
                    network,
                    format!("{} scheduled itself at {time}", network.name(id)),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "BufferSchedule"
    }
}

/// Every element's local clock mirrors the global clock.
pub struct ClockMirrorInvariant;

impl Invariant for ClockMirrorInvariant {
    fn check(&self, network: &Network) -> Result<(), InvariantViolation> {
        let clock = network.clock();
        for id in network.ids() {
            if let Some(base) = network.base(id)
                && base.clock() != clock
            {
                return Err(self.violation(
                    network,
                    format!(
                        "{} reads t={} while the network is at t={clock}",
                        base.name(),
                        base.clock()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "ClockMirror"
    }
}

/// Runs invariants after every tick and records what they report.
pub struct InvariantMonitor {
    invariants: Vec<Box<dyn Invariant>>,
    violations: Vec<InvariantViolation>,
    dropped: usize,
}

impl InvariantMonitor {
    /// Creates a monitor without invariants.
    pub fn new() -> Self {
        Self {
            invariants: Vec::new(),
            violations: Vec::new(),
            dropped: 0,
        }
    }

    /// Creates a monitor with every engine invariant installed.
    pub fn with_engine_invariants() -> Self {
        let mut monitor = Self::new();
        monitor.add_invariant(Box::new(BufferCapacityInvariant));
        monitor.add_invariant(Box::new(StationCapacityInvariant));
        monitor.add_invariant(Box::new(BufferScheduleInvariant));
        monitor.add_invariant(Box::new(ClockMirrorInvariant));
        monitor
    }

    /// Adds invariant to check after each tick.
    pub fn add_invariant(&mut self, invariant: Box<dyn Invariant>) {
        self.invariants.push(invariant);
    }

    /// Checks every invariant against `network`, recording failures.
    pub fn check(&mut self, network: &Network) {
        for invariant in &self.invariants {
            if let Err(violation) = invariant.check(network) {
                if self.violations.len() < MAX_INVARIANT_VIOLATIONS {
                    warn!("{violation}");
                    self.violations.push(violation);
                } else {
                    self.dropped += 1;
                }
            }
        }
    }

    /// Recorded violations, oldest first.
    pub fn violations(&self) -> &[InvariantViolation] {
        &self.violations
    }

    /// Total violations observed, including those past the recording limit.
    pub fn violation_count(&self) -> usize {
        self.violations.len() + self.dropped
    }

    /// Returns true if no invariant has failed yet.
    pub fn is_clean(&self) -> bool {
        self.violation_count() == 0
    }

    /// Hands over the recorded violations.
    pub fn into_violations(self) -> Vec<InvariantViolation> {
        self.violations
    }
}

impl Default for InvariantMonitor {
    fn default() -> Self {
        Self::with_engine_invariants()
    }
}

impl TickAction for InvariantMonitor {
    fn on_tick(&mut self, network: &mut Network) {
        self.check(network);
    }
}
