//! Scenario configuration, statistics and per-tick hooks.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use flowline_core::{
    ConfigError, DelayConfig, Distribution, ElementId, FlowlineError, Network, Observer,
    RunConfig, SimTime, SimulationConfig, TickAction,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Mean client inter-arrival time of the bank.
pub const BANK_ARRIVAL_MEAN: f64 = 0.5;
/// Mean cashier service time.
pub const CASHIER_SERVICE_MEAN: f64 = 0.3;
/// Length difference at which a client switches lanes.
pub const LANE_CHANGE_THRESHOLD: usize = 2;

/// Run parameters of a scenario, loadable from JSON.
///
/// ```json
/// {
///   "totalTime": 1000.0,
///   "warmup": 100.0,
///   "seed": 7,
///   "arrivals": { "distribution": "exponential", "exponential": { "lambda": 2.0 } }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScenarioConfig {
    /// Horizon and seed
    #[serde(flatten)]
    pub simulation: SimulationConfig,
    /// Client inter-arrival delay; exponential with mean 0.5 when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrivals: Option<DelayConfig>,
    /// Cashier service delay; exponential with mean 0.3 when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<DelayConfig>,
}

impl ScenarioConfig {
    /// Scenario with default delays and the given horizon.
    pub fn new(total_time: SimTime, warmup: SimTime, seed: u64) -> Self {
        Self {
            simulation: SimulationConfig {
                total_time,
                warmup,
                seed,
            },
            ..Self::default()
        }
    }

    /// Parses a scenario from JSON text.
    ///
    /// # Errors
    ///
    /// - `FlowlineError::Json` - Malformed JSON or wrong field types
    pub fn from_json_str(json: &str) -> Result<Self, FlowlineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a scenario from a JSON file.
    ///
    /// # Errors
    ///
    /// - `FlowlineError::Io` - File cannot be read
    /// - `FlowlineError::Json` - Malformed JSON or wrong field types
    pub fn from_file(path: &Path) -> Result<Self, FlowlineError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Seed of every random draw of the run.
    pub fn seed(&self) -> u64 {
        self.simulation.seed
    }

    /// Validated horizon.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidHorizon` - Total time or warm-up out of range
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        self.simulation.run_config()
    }

    /// Client inter-arrival distribution.
    ///
    /// # Errors
    ///
    /// - `ConfigError::UnknownDistribution` / `MissingParameters` - Bad override
    pub fn arrival_distribution(&self) -> Result<Distribution, ConfigError> {
        resolve(&self.arrivals, BANK_ARRIVAL_MEAN)
    }

    /// Cashier service distribution.
    ///
    /// # Errors
    ///
    /// - `ConfigError::UnknownDistribution` / `MissingParameters` - Bad override
    pub fn service_distribution(&self) -> Result<Distribution, ConfigError> {
        resolve(&self.service, CASHIER_SERVICE_MEAN)
    }
}

fn resolve(config: &Option<DelayConfig>, default_mean: f64) -> Result<Distribution, ConfigError> {
    match config {
        Some(config) => Distribution::try_from(config.clone()),
        None => Ok(Distribution::exponential_mean(default_mean)),
    }
}

/// Lane changes made by a [`QueueBalancer`], shared with the
/// [`BankStatistics`] that resets them at the warm-up boundary.
#[derive(Debug, Clone, Default)]
pub struct LaneChanges(Rc<Cell<u64>>);

impl LaneChanges {
    /// Current count.
    pub fn get(&self) -> u64 {
        self.0.get()
    }

    fn increment(&self) {
        self.0.set(self.0.get() + 1);
    }

    fn reset(&self) {
        self.0.set(0);
    }
}

/// Time-integrated number of clients inside the bank.
///
/// Clients inside are those waiting in either queue plus those occupying
/// a cashier, whether in service or held at the exit.
#[derive(Debug, Clone)]
pub struct BankStatistics {
    queues: [ElementId; 2],
    cashiers: [ElementId; 2],
    clients_inside: f64,
    lane_changes: LaneChanges,
}

impl BankStatistics {
    /// Creates statistics over the given queues and cashiers.
    pub fn new(queues: [ElementId; 2], cashiers: [ElementId; 2], lane_changes: LaneChanges) -> Self {
        Self {
            queues,
            cashiers,
            clients_inside: 0.0,
            lane_changes,
        }
    }

    /// Integral of clients inside over time.
    pub fn clients_inside(&self) -> f64 {
        self.clients_inside
    }

    /// Lane changes since the warm-up boundary.
    pub fn lane_changes(&self) -> u64 {
        self.lane_changes.get()
    }
}

impl Observer for BankStatistics {
    fn accumulate(&mut self, network: &Network, elapsed: SimTime) {
        let waiting: usize = self.queues.iter().map(|&id| network.buffer_len(id)).sum();
        let serving: usize = self.cashiers.iter().map(|&id| network.occupancy(id)).sum();
        self.clients_inside += elapsed * (waiting + serving) as f64;
    }

    fn reset(&mut self) {
        self.clients_inside = 0.0;
        self.lane_changes.reset();
    }
}

/// Moves the last client of the longer queue to the head of the shorter
/// one whenever their lengths differ by at least two.
#[derive(Debug, Clone)]
pub struct QueueBalancer {
    queues: [ElementId; 2],
    lane_changes: LaneChanges,
}

impl QueueBalancer {
    /// Creates a balancer between two queues.
    pub fn new(queues: [ElementId; 2], lane_changes: LaneChanges) -> Self {
        Self {
            queues,
            lane_changes,
        }
    }

    fn switch(&self, network: &mut Network, from: ElementId, to: ElementId) {
        if network.buffer_len(from) < network.buffer_len(to) + LANE_CHANGE_THRESHOLD {
            return;
        }
        let Some(client) = network.pop_back(from) else {
            return;
        };
        match network.push_front(to, client) {
            Ok(()) => {
                self.lane_changes.increment();
                debug!(
                    "t={:.4} lane change {} -> {}",
                    network.clock(),
                    network.name(from),
                    network.name(to)
                );
            }
            Err(client) => {
                // The shorter queue is full only if capacities differ; put
                // the client back where it was.
                let _ = network.push_back(from, client);
            }
        }
    }
}

impl TickAction for QueueBalancer {
    fn on_tick(&mut self, network: &mut Network) {
        let [first, second] = self.queues;
        self.switch(network, first, second);
        self.switch(network, second, first);
    }
}

/// Drains held outputs of two stations in random order, the first
/// station leading with probability `first_probability`.
#[derive(Debug, Clone)]
pub struct HeldOutputDrainer {
    stations: [ElementId; 2],
    first_probability: f64,
}

impl HeldOutputDrainer {
    /// Creates a drainer over two stations.
    pub fn new(stations: [ElementId; 2], first_probability: f64) -> Self {
        Self {
            stations,
            first_probability,
        }
    }
}

impl TickAction for HeldOutputDrainer {
    fn on_tick(&mut self, network: &mut Network) {
        let [first, second] = self.stations;
        let order = if network.rng_mut().random_bool(self.first_probability) {
            [first, second]
        } else {
            [second, first]
        };
        for station in order {
            network.drain_held(station);
        }
    }
}

/// Bank figures derived at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankMetrics {
    /// Clients created since the warm-up boundary
    pub generated: u64,
    /// Time-average of clients inside the bank
    pub average_clients_inside: f64,
    /// Measurement window divided by the clients the cashiers processed
    pub average_departure_interval: f64,
    /// Queue and cashier time-integrals per generated client
    pub average_time_in_bank: f64,
    /// Queue overflows per generated client
    pub loss_fraction: f64,
    /// Lane changes since the warm-up boundary
    pub lane_changes: u64,
}

impl BankMetrics {
    /// Derives the bank figures from the final network state.
    pub fn compute(
        network: &Network,
        creator: ElementId,
        queues: [ElementId; 2],
        cashiers: [ElementId; 2],
        statistics: &BankStatistics,
        window: SimTime,
    ) -> Self {
        let generated = network.completed(creator);
        let processed: u64 = cashiers.iter().map(|&id| network.processed(id)).sum();
        let queue_time: f64 = queues
            .iter()
            .filter_map(|&id| network.buffer(id))
            .map(|buffer| buffer.integrated_length())
            .sum();
        let busy_time: f64 = cashiers
            .iter()
            .filter_map(|&id| network.station(id))
            .map(|station| station.busy_time())
            .sum();
        let overflows: u64 = queues
            .iter()
            .filter_map(|&id| network.buffer(id))
            .map(|buffer| buffer.overflows())
            .sum();

        Self {
            generated,
            average_clients_inside: ratio(statistics.clients_inside(), window),
            average_departure_interval: ratio(window, processed as f64),
            average_time_in_bank: ratio(queue_time + busy_time, generated as f64),
            loss_fraction: ratio(overflows as f64, generated as f64),
            lane_changes: statistics.lane_changes(),
        }
    }

    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Clients generated: {}\n\
             Average number of clients inside bank: {:.4}\n\
             Average interval between departures: {:.4}\n\
             Average time spent by client in bank: {:.4}\n\
             Fraction of lost clients: {:.4}\n\
             Lane changes: {}\n",
            self.generated,
            self.average_clients_inside,
            self.average_departure_interval,
            self.average_time_in_bank,
            self.loss_fraction,
            self.lane_changes
        )
    }
}

/// `numerator / denominator`, or zero when nothing was counted.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
