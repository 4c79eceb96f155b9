//! Run-level configuration.
//!
//! Horizon and seed defaults live here so the CLI, the scenario runner and
//! the tests agree on them.

use serde::{Deserialize, Serialize};

use crate::SimTime;
use crate::errors::ConfigError;
use crate::model::RunConfig;

/// Horizon and seed of one simulation run.
///
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    /// Simulated time at which the run stops
    pub total_time: SimTime,
    /// Simulated time before which statistics are discarded
    pub warmup: SimTime,
    /// Seed for every random draw of the run
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            total_time: 1000.0,
            warmup: 0.0,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    /// Creates a configuration for fast deterministic tests.
    pub fn for_testing() -> Self {
        Self {
            total_time: 100.0,
            warmup: 0.0,
            seed: 42,
        }
    }

    /// Creates configuration with environment variable overrides.
    ///
    /// Reads `FLOWLINE_TOTAL_TIME`, `FLOWLINE_WARMUP` and `FLOWLINE_SEED`;
    /// unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(total_time) = std::env::var("FLOWLINE_TOTAL_TIME")
            && let Ok(value) = total_time.parse::<f64>()
        {
            config.total_time = value;
        }

        if let Ok(warmup) = std::env::var("FLOWLINE_WARMUP")
            && let Ok(value) = warmup.parse::<f64>()
        {
            config.warmup = value;
        }

        if let Ok(seed) = std::env::var("FLOWLINE_SEED")
            && let Ok(value) = seed.parse::<u64>()
        {
            config.seed = value;
        }

        config
    }

    /// Validated horizon for [`Model`](crate::Model).
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidHorizon` - Total time or warm-up out of range
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        RunConfig::new(self.total_time, self.warmup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = SimulationConfig::default();

        assert_eq!(config.total_time, 1000.0);
        assert_eq!(config.warmup, 0.0);
        assert_eq!(config.seed, 42);
        assert!(config.run_config().is_ok());
    }

    #[test]
    fn test_testing_preset() {
        let config = SimulationConfig::for_testing();
        assert!(config.total_time < SimulationConfig::default().total_time);
        assert_eq!(config.run_config().unwrap().window(), config.total_time);
    }

    #[test]
    fn test_invalid_horizon() {
        let config = SimulationConfig {
            total_time: 10.0,
            warmup: 20.0,
            seed: 1,
        };
        assert!(matches!(
            config.run_config(),
            Err(ConfigError::InvalidHorizon { .. })
        ));
    }

    #[test]
    fn test_partial_json() {
        let config: SimulationConfig = serde_json::from_str(r#"{ "totalTime": 50.0 }"#).unwrap();
        assert_eq!(config.total_time, 50.0);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("FLOWLINE_TOTAL_TIME", "250.5");
            std::env::set_var("FLOWLINE_WARMUP", "25");
            std::env::set_var("FLOWLINE_SEED", "12345");
        }

        let config = SimulationConfig::from_env();

        assert_eq!(config.total_time, 250.5);
        assert_eq!(config.warmup, 25.0);
        assert_eq!(config.seed, 12345);

        // Cleanup
        unsafe {
            std::env::remove_var("FLOWLINE_TOTAL_TIME");
            std::env::remove_var("FLOWLINE_WARMUP");
            std::env::remove_var("FLOWLINE_SEED");
        }
    }
}
