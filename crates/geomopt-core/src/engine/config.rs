use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for {parameter}: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },

    #[error(
        "Unrecognized relaxation method '{0}' (expected sd, cg, bfgs, or cg_bfgs)"
    )]
    UnknownMethod(String),
}

/// The relaxation algorithm driving a run. Selected once at configuration
/// time and never changed mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelaxMethod {
    SteepestDescent,
    ConjugateGradient,
    QuasiNewton,
    /// Conjugate gradient until the largest force component drops below the
    /// crossover threshold, then quasi-Newton refinement for the rest of the
    /// run.
    CgThenBfgs,
}

impl FromStr for RelaxMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sd" | "steepest-descent" => Ok(Self::SteepestDescent),
            "cg" | "conjugate-gradient" => Ok(Self::ConjugateGradient),
            "bfgs" | "quasi-newton" => Ok(Self::QuasiNewton),
            "cg_bfgs" | "cg-bfgs" | "cg-then-bfgs" => Ok(Self::CgThenBfgs),
            other => Err(ConfigError::UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for RelaxMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SteepestDescent => "steepest-descent",
            Self::ConjugateGradient => "conjugate-gradient",
            Self::QuasiNewton => "quasi-newton",
            Self::CgThenBfgs => "cg-then-bfgs",
        };
        f.write_str(name)
    }
}

/// Parameters of a relaxation run. All lengths, energies, and forces are in
/// whatever consistent unit system the caller's solver uses.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxConfig {
    pub method: RelaxMethod,
    /// Convergence criterion: largest absolute force component.
    pub force_tolerance: f64,
    /// Hard cap on the largest displacement component per step.
    pub max_displacement: f64,
    /// Initial trial step length; also scales the initial inverse-Hessian
    /// guess of the quasi-Newton method.
    pub trial_step: f64,
    /// The conjugate-gradient direction restarts to steepest descent every
    /// this many steps.
    pub cg_restart_interval: usize,
    /// Largest force component below which the hybrid method hands over from
    /// conjugate gradient to quasi-Newton.
    pub crossover_threshold: f64,
    /// Floor for the quasi-Newton trust radius as it shrinks on uphill steps.
    pub min_trust_radius: f64,
    /// Slack when comparing reported energies across steps; increases smaller
    /// than this are not treated as uphill moves.
    pub energy_tolerance: f64,
}

impl RelaxConfig {
    pub fn builder() -> RelaxConfigBuilder {
        RelaxConfigBuilder::new()
    }
}

const DEFAULT_CG_RESTART_INTERVAL: usize = 30;
const DEFAULT_CROSSOVER_THRESHOLD: f64 = 0.5;
const DEFAULT_MIN_TRUST_RADIUS: f64 = 1e-5;
const DEFAULT_ENERGY_TOLERANCE: f64 = 1e-10;

#[derive(Default)]
pub struct RelaxConfigBuilder {
    method: Option<RelaxMethod>,
    force_tolerance: Option<f64>,
    max_displacement: Option<f64>,
    trial_step: Option<f64>,
    cg_restart_interval: Option<usize>,
    crossover_threshold: Option<f64>,
    min_trust_radius: Option<f64>,
    energy_tolerance: Option<f64>,
}

impl RelaxConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: RelaxMethod) -> Self {
        self.method = Some(method);
        self
    }
    pub fn force_tolerance(mut self, tolerance: f64) -> Self {
        self.force_tolerance = Some(tolerance);
        self
    }
    pub fn max_displacement(mut self, cap: f64) -> Self {
        self.max_displacement = Some(cap);
        self
    }
    pub fn trial_step(mut self, step: f64) -> Self {
        self.trial_step = Some(step);
        self
    }
    pub fn cg_restart_interval(mut self, interval: usize) -> Self {
        self.cg_restart_interval = Some(interval);
        self
    }
    pub fn crossover_threshold(mut self, threshold: f64) -> Self {
        self.crossover_threshold = Some(threshold);
        self
    }
    pub fn min_trust_radius(mut self, radius: f64) -> Self {
        self.min_trust_radius = Some(radius);
        self
    }
    pub fn energy_tolerance(mut self, tolerance: f64) -> Self {
        self.energy_tolerance = Some(tolerance);
        self
    }

    pub fn build(self) -> Result<RelaxConfig, ConfigError> {
        let config = RelaxConfig {
            method: self.method.ok_or(ConfigError::MissingParameter("method"))?,
            force_tolerance: self
                .force_tolerance
                .ok_or(ConfigError::MissingParameter("force_tolerance"))?,
            max_displacement: self
                .max_displacement
                .ok_or(ConfigError::MissingParameter("max_displacement"))?,
            trial_step: self
                .trial_step
                .ok_or(ConfigError::MissingParameter("trial_step"))?,
            cg_restart_interval: self
                .cg_restart_interval
                .unwrap_or(DEFAULT_CG_RESTART_INTERVAL),
            crossover_threshold: self
                .crossover_threshold
                .unwrap_or(DEFAULT_CROSSOVER_THRESHOLD),
            min_trust_radius: self.min_trust_radius.unwrap_or(DEFAULT_MIN_TRUST_RADIUS),
            energy_tolerance: self.energy_tolerance.unwrap_or(DEFAULT_ENERGY_TOLERANCE),
        };
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &RelaxConfig) -> Result<(), ConfigError> {
    let positive: [(&'static str, f64); 4] = [
        ("force_tolerance", config.force_tolerance),
        ("max_displacement", config.max_displacement),
        ("trial_step", config.trial_step),
        ("min_trust_radius", config.min_trust_radius),
    ];
    for (parameter, value) in positive {
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                parameter,
                reason: format!("must be a positive finite number, got {value}"),
            });
        }
    }
    if config.cg_restart_interval == 0 {
        return Err(ConfigError::InvalidParameter {
            parameter: "cg_restart_interval",
            reason: "must be at least 1".to_string(),
        });
    }
    if config.crossover_threshold < config.force_tolerance {
        return Err(ConfigError::InvalidParameter {
            parameter: "crossover_threshold",
            reason: format!(
                "must not be below force_tolerance ({}), got {}",
                config.force_tolerance, config.crossover_threshold
            ),
        });
    }
    if config.min_trust_radius > config.max_displacement {
        return Err(ConfigError::InvalidParameter {
            parameter: "min_trust_radius",
            reason: format!(
                "must not exceed max_displacement ({}), got {}",
                config.max_displacement, config.min_trust_radius
            ),
        });
    }
    if config.energy_tolerance < 0.0 || !config.energy_tolerance.is_finite() {
        return Err(ConfigError::InvalidParameter {
            parameter: "energy_tolerance",
            reason: format!("must be a non-negative finite number, got {}", config.energy_tolerance),
        });
    }
    Ok(())
}
