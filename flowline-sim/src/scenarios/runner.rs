//! Scenario runner and result collection.

use std::fmt;
use std::str::FromStr;

use flowline_core::{ConfigError, Model, SimulationReport, TickAction};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use super::bank::build_bank;
use super::bank_road::build_bank_road;
use super::types::{BankMetrics, LaneChanges, ScenarioConfig};
use crate::invariants::InvariantMonitor;

/// Errors that can occur while running a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Scenario could not be built or started
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The engine broke one of its own invariants during the run
    #[error("{count} invariant violation(s) in scenario {scenario}; first: {first}")]
    InvariantViolations {
        /// Scenario that was running
        scenario: ScenarioKind,
        /// Total number of violations
        count: usize,
        /// First recorded violation
        first: String,
    },

    /// Scenario name not recognised
    #[error("Unknown scenario: {name} (expected 'bank' or 'bank-road')")]
    UnknownScenario {
        /// Name as given
        name: String,
    },
}

/// Available scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    /// Two cashiers with lane changes
    Bank,
    /// Bank with held outputs, exit queue and road crossing
    BankRoad,
}

impl ScenarioKind {
    /// Every scenario, in run order.
    pub const ALL: [ScenarioKind; 2] = [ScenarioKind::Bank, ScenarioKind::BankRoad];

    /// Name as used on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioKind::Bank => "bank",
            ScenarioKind::BankRoad => "bank-road",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioKind {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank" => Ok(ScenarioKind::Bank),
            "bank-road" => Ok(ScenarioKind::BankRoad),
            _ => Err(ScenarioError::UnknownScenario {
                name: s.to_string(),
            }),
        }
    }
}

/// Runs scenarios under one configuration.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    config: ScenarioConfig,
}

impl ScenarioRunner {
    /// Creates runner for the given configuration.
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    /// Configuration every scenario runs with.
    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Runs all scenarios and collects results.
    ///
    /// # Errors
    ///
    /// - `ScenarioError::Config` - Invalid horizon or delay override
    /// - `ScenarioError::InvariantViolations` - Engine invariant broken during a run
    pub fn run_all(&self) -> Result<ScenarioResults, ScenarioError> {
        let mut results = ScenarioResults::new();
        for kind in ScenarioKind::ALL {
            results.add_result(self.run(kind)?);
        }
        Ok(results)
    }

    /// Runs one scenario to the end of its horizon.
    ///
    /// # Errors
    ///
    /// - `ScenarioError::Config` - Invalid horizon or delay override
    /// - `ScenarioError::InvariantViolations` - Engine invariant broken during the run
    pub fn run(&self, kind: ScenarioKind) -> Result<ScenarioResult, ScenarioError> {
        let run_config = self.config.run_config()?;
        info!(
            "Running scenario {kind} (seed {}, time {}, warm-up {})",
            self.config.seed(),
            run_config.total_time(),
            run_config.warmup()
        );

        let lane_changes = LaneChanges::default();
        let mut monitor = InvariantMonitor::with_engine_invariants();

        let (model, bank, statistics, report) = match kind {
            ScenarioKind::Bank => {
                let (network, layout) = build_bank(&self.config)?;
                let mut statistics = layout.statistics(lane_changes.clone());
                let mut balancer = layout.balancer(lane_changes);
                let mut model = Model::new(network, run_config);
                let mut actions: [&mut dyn TickAction; 2] = [&mut balancer, &mut monitor];
                let report = model.run(&mut statistics, &mut actions)?;
                (model, layout, statistics, report)
            }
            ScenarioKind::BankRoad => {
                let (network, layout) = build_bank_road(&self.config)?;
                let mut statistics = layout.bank.statistics(lane_changes.clone());
                let mut balancer = layout.bank.balancer(lane_changes);
                let mut drainer = layout.drainer();
                let mut model = Model::new(network, run_config);
                let mut actions: [&mut dyn TickAction; 3] =
                    [&mut balancer, &mut drainer, &mut monitor];
                let report = model.run(&mut statistics, &mut actions)?;
                (model, layout.bank, statistics, report)
            }
        };

        if let Some(first) = monitor.violations().first() {
            return Err(ScenarioError::InvariantViolations {
                scenario: kind,
                count: monitor.violation_count(),
                first: first.to_string(),
            });
        }

        let metrics = bank.metrics(model.network(), &statistics, run_config.window());
        info!(
            "Scenario {kind} finished after {} ticks: {} clients, loss {:.4}",
            report.ticks, metrics.generated, metrics.loss_fraction
        );

        Ok(ScenarioResult {
            scenario: kind,
            seed: self.config.seed(),
            metrics,
            report,
        })
    }
}

/// Results from running a single scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioResult {
    /// Scenario that produced this result
    pub scenario: ScenarioKind,
    /// Seed of the run
    pub seed: u64,
    /// Bank-level figures
    pub metrics: BankMetrics,
    /// Per-element engine report
    pub report: SimulationReport,
}

impl ScenarioResult {
    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "=== Scenario {} (seed {}) ===\n{}\n---------MODEL STATS---------\n{}",
            self.scenario,
            self.seed,
            self.report.summary(),
            self.metrics.summary()
        )
    }
}

/// Collection of results from multiple scenarios, in run order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScenarioResults {
    results: Vec<ScenarioResult>,
}

impl ScenarioResults {
    /// Creates empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scenario result.
    pub fn add_result(&mut self, result: ScenarioResult) {
        self.results.push(result);
    }

    /// Gets a scenario result by kind.
    pub fn get_result(&self, kind: ScenarioKind) -> Option<&ScenarioResult> {
        self.results.iter().find(|result| result.scenario == kind)
    }

    /// Iterates results in run order.
    pub fn iter(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter()
    }

    /// Number of collected results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if no result was collected.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
