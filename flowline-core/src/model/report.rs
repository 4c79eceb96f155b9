//! End-of-run report.

use serde::Serialize;

use super::RunConfig;
use crate::SimTime;
use crate::network::{ElementKind, Network};

/// Per-source totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub name: String,
    /// Entities manufactured since the warm-up reset
    pub generated: u64,
    /// Entities for which no successor could be chosen
    pub unrouted: u64,
}

/// Per-buffer totals and averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferReport {
    pub name: String,
    /// `None` for unbounded buffers
    pub capacity: Option<usize>,
    /// Entities stored at the end of the run
    pub length: usize,
    pub extracted: u64,
    pub overflows: u64,
    /// Time-integrated length over the measurement window
    pub average_length: f64,
}

/// Per-station totals and utilization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationReport {
    pub name: String,
    /// `None` for unbounded stations
    pub workers: Option<usize>,
    pub completed: u64,
    pub failures: u64,
    pub dropped: u64,
    /// Completions plus failures
    pub processed: u64,
    pub busy_time: SimTime,
    /// Busy time over the measurement window
    pub utilization: f64,
    /// In-service tasks at the end of the run
    pub active: usize,
    /// Held outputs at the end of the run
    pub held: usize,
}

/// Result of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub total_time: SimTime,
    pub warmup: SimTime,
    /// `total_time - warmup`, the denominator of every average
    pub window: SimTime,
    pub ticks: u64,
    /// Clock after the last tick; may overshoot `total_time`
    pub final_clock: SimTime,
    pub sources: Vec<SourceReport>,
    pub buffers: Vec<BufferReport>,
    pub stations: Vec<StationReport>,
}

impl SimulationReport {
    pub(crate) fn from_network(network: &Network, config: RunConfig, ticks: u64) -> Self {
        let window = config.window();

        let sources = network
            .ids_of(ElementKind::Source)
            .into_iter()
            .filter_map(|id| {
                let source = network.source(id)?;
                Some(SourceReport {
                    name: network.name(id).to_string(),
                    generated: network.completed(id),
                    unrouted: source.unrouted(),
                })
            })
            .collect();

        let buffers = network
            .ids_of(ElementKind::Buffer)
            .into_iter()
            .filter_map(|id| {
                let buffer = network.buffer(id)?;
                Some(BufferReport {
                    name: network.name(id).to_string(),
                    capacity: buffer.is_bounded().then_some(buffer.capacity()),
                    length: buffer.len(),
                    extracted: network.completed(id),
                    overflows: buffer.overflows(),
                    average_length: buffer.average_length(window),
                })
            })
            .collect();

        let stations = network
            .ids_of(ElementKind::Station)
            .into_iter()
            .filter_map(|id| {
                let station = network.station(id)?;
                Some(StationReport {
                    name: network.name(id).to_string(),
                    workers: (station.workers() != usize::MAX).then_some(station.workers()),
                    completed: network.completed(id),
                    failures: station.failures(),
                    dropped: station.dropped(),
                    processed: network.processed(id),
                    busy_time: station.busy_time(),
                    utilization: station.utilization(window),
                    active: station.active(),
                    held: station.held_len(),
                })
            })
            .collect();

        Self {
            total_time: config.total_time(),
            warmup: config.warmup(),
            window,
            ticks,
            final_clock: network.clock(),
            sources,
            buffers,
            stations,
        }
    }

    pub fn source(&self, name: &str) -> Option<&SourceReport> {
        self.sources.iter().find(|report| report.name == name)
    }

    pub fn buffer(&self, name: &str) -> Option<&BufferReport> {
        self.buffers.iter().find(|report| report.name == name)
    }

    pub fn station(&self, name: &str) -> Option<&StationReport> {
        self.stations.iter().find(|report| report.name == name)
    }

    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!(
            "Simulation Report (time: {}, warm-up: {}, window: {})\n",
            self.total_time, self.warmup, self.window
        ));
        summary.push_str(&format!(
            "Ticks: {}, final clock: {:.4}\n",
            self.ticks, self.final_clock
        ));

        if !self.sources.is_empty() {
            summary.push_str("\nSources:\n");
            for source in &self.sources {
                summary.push_str(&format!(
                    "  {}: generated {}, unrouted {}\n",
                    source.name, source.generated, source.unrouted
                ));
            }
        }

        if !self.buffers.is_empty() {
            summary.push_str("\nBuffers:\n");
            for buffer in &self.buffers {
                let capacity = buffer
                    .capacity
                    .map_or_else(|| "unbounded".to_string(), |c| c.to_string());
                summary.push_str(&format!(
                    "  {} (capacity {}): average length {:.4}, overflows {}, extracted {}, stored {}\n",
                    buffer.name,
                    capacity,
                    buffer.average_length,
                    buffer.overflows,
                    buffer.extracted,
                    buffer.length
                ));
            }
        }

        if !self.stations.is_empty() {
            summary.push_str("\nStations:\n");
            for station in &self.stations {
                let workers = station
                    .workers
                    .map_or_else(|| "unbounded".to_string(), |w| w.to_string());
                summary.push_str(&format!(
                    "  {} ({} workers): average load {:.4}, completed {}, failures {}, dropped {}, processed {}\n",
                    station.name,
                    workers,
                    station.utilization,
                    station.completed,
                    station.failures,
                    station.dropped,
                    station.processed
                ));
            }
        }

        summary
    }
}
