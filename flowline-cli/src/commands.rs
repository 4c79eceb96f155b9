//! CLI command implementations

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use flowline_core::SimulationConfig;
use flowline_sim::{ScenarioConfig, ScenarioKind, ScenarioResults, ScenarioRunner};
use tracing::debug;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Two cashiers fed by one arrival stream, with lane changes
    Bank(RunArgs),
    /// The bank with an exit queue onto a busy road
    BankRoad(RunArgs),
    /// Run every scenario with the same settings
    All(RunArgs),
}

/// Options shared by every scenario command
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Simulated time to run for
    #[arg(short, long)]
    pub time: Option<f64>,
    /// Simulated time before which statistics are discarded
    #[arg(short, long)]
    pub warmup: Option<f64>,
    /// Seed for every random draw
    #[arg(short, long)]
    pub seed: Option<u64>,
    /// Scenario JSON file; the flags above override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Print results as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Bank(args) => run_scenarios(&[ScenarioKind::Bank], &args),
        Commands::BankRoad(args) => run_scenarios(&[ScenarioKind::BankRoad], &args),
        Commands::All(args) => run_scenarios(&ScenarioKind::ALL, &args),
    }
}

/// Run the given scenarios and print their results
///
/// # Errors
/// - Scenario file cannot be read or parsed
/// - Horizon or delay configuration is invalid
/// - The engine broke an invariant during a run
pub fn run_scenarios(kinds: &[ScenarioKind], args: &RunArgs) -> anyhow::Result<()> {
    let config = resolve_config(args)?;
    debug!("Resolved scenario configuration: {config:?}");

    let runner = ScenarioRunner::new(config);
    let mut results = ScenarioResults::new();
    for &kind in kinds {
        let result = runner
            .run(kind)
            .with_context(|| format!("Scenario {kind} failed"))?;
        results.add_result(result);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in results.iter() {
            println!("{}", result.summary());
        }
    }

    Ok(())
}

/// Scenario configuration from file (or environment) with flag overrides
///
/// # Errors
/// - Scenario file cannot be read or parsed
pub fn resolve_config(args: &RunArgs) -> anyhow::Result<ScenarioConfig> {
    let mut config = match &args.config {
        Some(path) => ScenarioConfig::from_file(path).map_err(|e| {
            anyhow::anyhow!("{} ({})", e.user_message(), path.display())
        })?,
        None => ScenarioConfig {
            simulation: SimulationConfig::from_env(),
            ..ScenarioConfig::default()
        },
    };

    if let Some(time) = args.time {
        config.simulation.total_time = time;
    }
    if let Some(warmup) = args.warmup {
        config.simulation.warmup = warmup;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.json");
        std::fs::write(
            &path,
            r#"{
                "totalTime": 300.0,
                "warmup": 30.0,
                "seed": 5,
                "arrivals": { "distribution": "uniform", "uniform": { "rangeStart": 0.2, "rangeEnd": 0.6 } }
            }"#,
        )
        .unwrap();

        let args = RunArgs {
            seed: Some(77),
            config: Some(path),
            ..RunArgs::default()
        };
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.simulation.total_time, 300.0);
        assert_eq!(config.simulation.warmup, 30.0);
        assert_eq!(config.seed(), 77);
        assert!(config.arrivals.is_some());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunArgs {
            config: Some(dir.path().join("absent.json")),
            ..RunArgs::default()
        };

        let err = resolve_config(&args).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn test_invalid_horizon_fails_run() {
        let args = RunArgs {
            time: Some(10.0),
            warmup: Some(20.0),
            ..RunArgs::default()
        };

        let err = run_scenarios(&[ScenarioKind::Bank], &args).unwrap_err();
        assert!(err.to_string().contains("Scenario bank failed"));
    }

    #[test]
    fn test_short_run_succeeds() {
        let args = RunArgs {
            time: Some(50.0),
            seed: Some(1),
            json: true,
            ..RunArgs::default()
        };

        assert!(run_scenarios(&ScenarioKind::ALL, &args).is_ok());
    }
}
