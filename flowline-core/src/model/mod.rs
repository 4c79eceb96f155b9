//! Next-event scheduler.
//!
//! The model owns the network and the single global clock. Each tick jumps
//! the clock to the earliest scheduled element event, accumulating
//! time-weighted statistics over the skipped interval first, then fires
//! every element due at the new time. Statistics gathered before the
//! warm-up boundary are discarded exactly once, at the first tick whose
//! target time lies beyond it.

mod report;

pub use report::{BufferReport, SimulationReport, SourceReport, StationReport};

use tracing::{debug, info, trace, warn};

use crate::SimTime;
use crate::errors::ConfigError;
use crate::network::{ElementKind, Network};

/// Consecutive ticks allowed to fire without moving the clock.
pub const MAX_ZERO_LENGTH_TICKS: u64 = 10_000;

/// Simulation horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunConfig {
    total_time: SimTime,
    warmup: SimTime,
}

impl RunConfig {
    /// # Errors
    ///
    /// - `ConfigError::InvalidHorizon` - `total_time` not positive, or
    ///   `warmup` outside `[0, total_time)`
    pub fn new(total_time: SimTime, warmup: SimTime) -> Result<Self, ConfigError> {
        let valid = total_time.is_finite()
            && warmup.is_finite()
            && total_time > 0.0
            && warmup >= 0.0
            && warmup < total_time;
        if !valid {
            return Err(ConfigError::InvalidHorizon { total_time, warmup });
        }
        Ok(Self { total_time, warmup })
    }

    pub fn total_time(&self) -> SimTime {
        self.total_time
    }

    /// Statistics start time.
    pub fn warmup(&self) -> SimTime {
        self.warmup
    }

    /// Length of the measurement window.
    pub fn window(&self) -> SimTime {
        self.total_time - self.warmup
    }
}

/// Aggregate statistics collected alongside the per-element ones.
pub trait Observer {
    /// Called once per tick, before the clock advances, with the network
    /// state that held during the elapsed interval.
    fn accumulate(&mut self, network: &Network, elapsed: SimTime);

    /// Called exactly once per run, at the end of the warm-up tick.
    fn reset(&mut self) {}
}

impl Observer for () {
    fn accumulate(&mut self, _network: &Network, _elapsed: SimTime) {}
}

/// Scenario-specific logic run at the end of every tick.
pub trait TickAction {
    fn on_tick(&mut self, network: &mut Network);
}

impl<F> TickAction for F
where
    F: FnMut(&mut Network),
{
    fn on_tick(&mut self, network: &mut Network) {
        self(network)
    }
}

/// Drives a [`Network`] through simulated time.
#[derive(Debug)]
pub struct Model {
    network: Network,
    config: RunConfig,
    ticks: u64,
    warmup_applied: bool,
    zero_length_ticks: u64,
    stalled: bool,
}

impl Model {
    pub fn new(network: Network, config: RunConfig) -> Self {
        Self {
            network,
            config,
            ticks: 0,
            warmup_applied: false,
            zero_length_ticks: 0,
            stalled: false,
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Mutable network access between ticks.
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    pub fn config(&self) -> RunConfig {
        self.config
    }

    pub fn clock(&self) -> SimTime {
        self.network.clock()
    }

    /// Ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Returns true once the warm-up reset has been applied.
    pub fn warmup_applied(&self) -> bool {
        self.warmup_applied
    }

    /// Returns true once the clock stopped advancing.
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Returns true once the clock reached the horizon or stalled.
    pub fn is_finished(&self) -> bool {
        self.stalled || self.network.clock() >= self.config.total_time
    }

    /// Runs ticks until the clock reaches the horizon.
    ///
    /// # Errors
    ///
    /// - `ConfigError::NothingScheduled` - No element has a scheduled event,
    ///   so the clock could never advance
    /// - `ConfigError::ClockStalled` - More than [`MAX_ZERO_LENGTH_TICKS`]
    ///   consecutive ticks fired at the same time
    pub fn run(
        &mut self,
        observer: &mut dyn Observer,
        actions: &mut [&mut dyn TickAction],
    ) -> Result<SimulationReport, ConfigError> {
        if !self.is_finished() && self.network.earliest_event().is_none() {
            return Err(ConfigError::NothingScheduled);
        }

        info!(
            "Starting simulation: {} elements, total time {}, warm-up {}",
            self.network.len(),
            self.config.total_time,
            self.config.warmup
        );

        while self.step(observer, actions).is_some() {}

        if self.stalled {
            return Err(ConfigError::ClockStalled {
                clock: self.network.clock(),
                ticks: MAX_ZERO_LENGTH_TICKS,
            });
        }

        let report = self.report();
        info!(
            "Simulation finished after {} ticks at clock {:.4}",
            self.ticks,
            self.network.clock()
        );
        Ok(report)
    }

    /// Report of the current state.
    pub fn report(&self) -> SimulationReport {
        SimulationReport::from_network(&self.network, self.config, self.ticks)
    }

    /// Performs exactly one tick. Returns the new clock, or `None` if the
    /// horizon was already reached or the clock stalled.
    ///
    /// When no element is scheduled, the tick runs to the horizon without
    /// firing anything.
    pub fn step(
        &mut self,
        observer: &mut dyn Observer,
        actions: &mut [&mut dyn TickAction],
    ) -> Option<SimTime> {
        if self.is_finished() {
            return None;
        }

        let clock = self.network.clock();
        let next = self.network.earliest_event();
        let next_time = next.map_or(self.config.total_time, |(_, time)| time.max(clock));
        let elapsed = next_time - clock;

        if elapsed > 0.0 {
            self.zero_length_ticks = 0;
        } else if next.is_some() {
            self.zero_length_ticks += 1;
            if self.zero_length_ticks > MAX_ZERO_LENGTH_TICKS {
                warn!(
                    "Clock stuck at {:.4} for {} ticks, stopping",
                    clock, MAX_ZERO_LENGTH_TICKS
                );
                self.stalled = true;
                return None;
            }
        }
        let crossing = !self.warmup_applied && next_time > self.config.warmup;

        if crossing {
            debug!("Warm-up boundary crossed at {:.4}, resetting statistics", next_time);
        }
        for id in self.network.ids() {
            if crossing {
                self.network.reset_statistics(id);
            }
            self.network.record_occupancy(id, elapsed);
        }
        observer.accumulate(&self.network, elapsed);

        self.network.advance_clock(next_time);

        if let Some((trigger, _)) = next {
            trace!("t={:.4} fire {}", next_time, self.network.name(trigger));
            self.network.on_self_event(trigger);

            for id in self.network.ids() {
                if self.network.next_event_time(id) == Some(next_time) {
                    trace!("t={:.4} co-fire {}", next_time, self.network.name(id));
                    self.network.on_self_event(id);
                }
            }
        } else {
            debug!("No element scheduled, running out the clock to {}", next_time);
        }

        if next_time > self.config.warmup {
            for id in self.network.ids_of(ElementKind::Station) {
                if self
                    .network
                    .station(id)
                    .is_some_and(|station| station.recover_when_idle())
                {
                    self.network.recover_if_idle(id);
                }
            }
        }

        for action in actions.iter_mut() {
            action.on_tick(&mut self.network);
        }

        if crossing {
            observer.reset();
            self.warmup_applied = true;
        }

        self.ticks += 1;
        Some(next_time)
    }
}
