//! Delay distributions for service times and inter-arrival times.
//!
//! Operators describe a delay either with the typed [`Distribution`] or with
//! the serializable [`DelayConfig`] record (one distribution name plus a
//! parameter block per distribution). Both are validated into a [`Delay`]
//! before the simulation starts, so sampling during a run cannot fail.

use std::fmt;

use rand_distr::{Distribution as _, Exp, Gamma, Normal};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::random::RandomSource;

/// Supported delay distributions with their parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    /// Uniform over `[range_start, range_end)`
    Uniform { range_start: f64, range_end: f64 },
    /// Exponential with rate `lambda` (mean `1 / lambda`)
    Exponential { lambda: f64 },
    /// Normal with the given mean and standard deviation
    Normal { mean: f64, std: f64 },
    /// Erlang with the given mean and `dof` phases
    Erlang { mean: f64, dof: u32 },
}

impl Distribution {
    /// Fixed delay, expressed as a degenerate uniform range.
    pub fn constant(value: f64) -> Self {
        Distribution::Uniform {
            range_start: value,
            range_end: value,
        }
    }

    /// Exponential delay with the given mean.
    pub fn exponential_mean(mean: f64) -> Self {
        Distribution::Exponential { lambda: 1.0 / mean }
    }

    /// Returns true if at least half of all samples clamp to zero.
    pub fn mostly_zero(&self) -> bool {
        match *self {
            Distribution::Uniform { range_end, .. } => range_end <= 0.0,
            Distribution::Normal { mean, .. } => mean <= 0.0,
            Distribution::Exponential { .. } | Distribution::Erlang { .. } => false,
        }
    }

    /// Returns the distribution name as used in [`DelayConfig`].
    pub fn name(&self) -> &'static str {
        match self {
            Distribution::Uniform { .. } => "uniform",
            Distribution::Exponential { .. } => "exponential",
            Distribution::Normal { .. } => "normal",
            Distribution::Erlang { .. } => "erlang",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Uniform {
                range_start,
                range_end,
            } => write!(f, "uniform({range_start}, {range_end})"),
            Distribution::Exponential { lambda } => write!(f, "exponential(lambda={lambda})"),
            Distribution::Normal { mean, std } => write!(f, "normal(mean={mean}, std={std})"),
            Distribution::Erlang { mean, dof } => write!(f, "erlang(mean={mean}, dof={dof})"),
        }
    }
}

/// Uniform parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniformParams {
    pub range_start: f64,
    pub range_end: f64,
}

/// Exponential parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialParams {
    pub lambda: f64,
}

/// Normal parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalParams {
    pub mean: f64,
    pub std: f64,
}

/// Erlang parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErlangParams {
    pub mean: f64,
    pub dof: u32,
}

/// Operator-facing delay record.
///
/// ```json
/// { "distribution": "exponential", "exponential": { "lambda": 2.0 } }
/// ```
///
/// Only the block named by `distribution` is read; the others may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayConfig {
    pub distribution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniform: Option<UniformParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exponential: Option<ExponentialParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<NormalParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erlang: Option<ErlangParams>,
}

impl TryFrom<DelayConfig> for Distribution {
    type Error = ConfigError;

    fn try_from(config: DelayConfig) -> Result<Self, Self::Error> {
        match config.distribution.as_str() {
            "uniform" => config
                .uniform
                .map(|p| Distribution::Uniform {
                    range_start: p.range_start,
                    range_end: p.range_end,
                })
                .ok_or(ConfigError::MissingParameters {
                    distribution: "uniform",
                }),
            "exponential" => config
                .exponential
                .map(|p| Distribution::Exponential { lambda: p.lambda })
                .ok_or(ConfigError::MissingParameters {
                    distribution: "exponential",
                }),
            "normal" => config
                .normal
                .map(|p| Distribution::Normal {
                    mean: p.mean,
                    std: p.std,
                })
                .ok_or(ConfigError::MissingParameters {
                    distribution: "normal",
                }),
            "erlang" => config
                .erlang
                .map(|p| Distribution::Erlang {
                    mean: p.mean,
                    dof: p.dof,
                })
                .ok_or(ConfigError::MissingParameters {
                    distribution: "erlang",
                }),
            other => Err(ConfigError::UnknownDistribution {
                name: other.to_string(),
            }),
        }
    }
}

impl From<Distribution> for DelayConfig {
    fn from(distribution: Distribution) -> Self {
        let mut config = DelayConfig {
            distribution: distribution.name().to_string(),
            uniform: None,
            exponential: None,
            normal: None,
            erlang: None,
        };
        match distribution {
            Distribution::Uniform {
                range_start,
                range_end,
            } => {
                config.uniform = Some(UniformParams {
                    range_start,
                    range_end,
                });
            }
            Distribution::Exponential { lambda } => {
                config.exponential = Some(ExponentialParams { lambda });
            }
            Distribution::Normal { mean, std } => {
                config.normal = Some(NormalParams { mean, std });
            }
            Distribution::Erlang { mean, dof } => {
                config.erlang = Some(ErlangParams { mean, dof });
            }
        }
        config
    }
}

#[derive(Debug, Clone)]
enum Sampler {
    Uniform { start: f64, span: f64 },
    Exponential(Exp<f64>),
    Normal(Normal<f64>),
    Erlang(Gamma<f64>),
}

/// Validated delay generator.
#[derive(Debug, Clone)]
pub struct Delay {
    distribution: Distribution,
    sampler: Sampler,
}

impl Delay {
    /// Validates distribution parameters.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidParameter` - Parameter out of range or not finite
    pub fn new(distribution: Distribution) -> Result<Self, ConfigError> {
        let sampler = match distribution {
            Distribution::Uniform {
                range_start,
                range_end,
            } => {
                require("uniform", "rangeStart", range_start, |v| v >= 0.0)?;
                require("uniform", "rangeEnd", range_end, |v| v >= range_start)?;
                Sampler::Uniform {
                    start: range_start,
                    span: range_end - range_start,
                }
            }
            Distribution::Exponential { lambda } => {
                require("exponential", "lambda", lambda, |v| v > 0.0)?;
                let exp = Exp::new(lambda).map_err(|_| invalid("exponential", "lambda", lambda))?;
                Sampler::Exponential(exp)
            }
            Distribution::Normal { mean, std } => {
                require("normal", "mean", mean, |_| true)?;
                require("normal", "std", std, |v| v >= 0.0)?;
                let normal = Normal::new(mean, std).map_err(|_| invalid("normal", "std", std))?;
                Sampler::Normal(normal)
            }
            Distribution::Erlang { mean, dof } => {
                require("erlang", "mean", mean, |v| v > 0.0)?;
                if dof == 0 {
                    return Err(invalid("erlang", "dof", 0.0));
                }
                let shape = f64::from(dof);
                let gamma =
                    Gamma::new(shape, mean / shape).map_err(|_| invalid("erlang", "mean", mean))?;
                Sampler::Erlang(gamma)
            }
        };

        Ok(Self {
            distribution,
            sampler,
        })
    }

    /// Returns the distribution this delay was built from.
    pub fn distribution(&self) -> Distribution {
        self.distribution
    }

    /// Draws one delay. Never negative.
    pub fn sample(&self, rng: &mut RandomSource) -> f64 {
        let value = match &self.sampler {
            Sampler::Uniform { start, span } => start + span * rng.random_f64(),
            Sampler::Exponential(exp) => exp.sample(rng.rng_mut()),
            Sampler::Normal(normal) => normal.sample(rng.rng_mut()),
            Sampler::Erlang(gamma) => gamma.sample(rng.rng_mut()),
        };
        value.max(0.0)
    }
}

impl TryFrom<DelayConfig> for Delay {
    type Error = ConfigError;

    fn try_from(config: DelayConfig) -> Result<Self, Self::Error> {
        Delay::new(Distribution::try_from(config)?)
    }
}

fn invalid(distribution: &'static str, parameter: &'static str, value: f64) -> ConfigError {
    ConfigError::InvalidParameter {
        distribution,
        parameter,
        value,
    }
}

fn require(
    distribution: &'static str,
    parameter: &'static str,
    value: f64,
    valid: impl Fn(f64) -> bool,
) -> Result<(), ConfigError> {
    if value.is_finite() && valid(value) {
        Ok(())
    } else {
        Err(invalid(distribution, parameter, value))
    }
}
