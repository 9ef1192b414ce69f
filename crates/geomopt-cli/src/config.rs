use crate::cli::RelaxArgs;
use crate::error::{CliError, Result};
use crate::potential::LennardJones;
use geomopt::engine::config::{RelaxConfig, RelaxMethod};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

const DEFAULT_METHOD: RelaxMethod = RelaxMethod::CgThenBfgs;
const DEFAULT_FORCE_TOLERANCE: f64 = 1e-4;
const DEFAULT_MAX_DISPLACEMENT: f64 = 0.2;
const DEFAULT_TRIAL_STEP: f64 = 0.05;
const DEFAULT_MAX_STEPS: usize = 500;

/// On-disk run configuration. Every field is optional; missing values fall
/// back to CLI overrides and then to the defaults above.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub relax: FileRelaxConfig,
    #[serde(default)]
    pub potential: FilePotentialConfig,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileRelaxConfig {
    pub method: Option<String>,
    #[serde(rename = "force-tolerance")]
    pub force_tolerance: Option<f64>,
    #[serde(rename = "max-displacement")]
    pub max_displacement: Option<f64>,
    #[serde(rename = "trial-step")]
    pub trial_step: Option<f64>,
    #[serde(rename = "max-steps")]
    pub max_steps: Option<usize>,
    #[serde(rename = "cg-restart-interval")]
    pub cg_restart_interval: Option<usize>,
    #[serde(rename = "crossover-threshold")]
    pub crossover_threshold: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FilePotentialConfig {
    /// Lennard-Jones well depth, in the run's energy unit.
    pub epsilon: Option<f64>,
    /// Lennard-Jones zero-crossing distance, in the run's length unit.
    pub sigma: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        debug!("Loaded run configuration from '{}'.", path.display());
        Ok(config)
    }
}

/// The fully resolved inputs of a relaxation run.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub relax: RelaxConfig,
    pub max_steps: usize,
    pub potential: LennardJones,
}

/// Merges the configuration file with CLI overrides (flags win) and validates
/// the result through the core builder.
pub fn resolve(file: FileConfig, args: &RelaxArgs) -> Result<ResolvedConfig> {
    let method = match args.method.as_deref().or(file.relax.method.as_deref()) {
        Some(identifier) => identifier
            .parse::<RelaxMethod>()
            .map_err(geomopt::engine::error::EngineError::from)?,
        None => DEFAULT_METHOD,
    };

    let mut builder = RelaxConfig::builder()
        .method(method)
        .force_tolerance(
            args.force_tolerance
                .or(file.relax.force_tolerance)
                .unwrap_or(DEFAULT_FORCE_TOLERANCE),
        )
        .max_displacement(
            file.relax
                .max_displacement
                .unwrap_or(DEFAULT_MAX_DISPLACEMENT),
        )
        .trial_step(file.relax.trial_step.unwrap_or(DEFAULT_TRIAL_STEP));
    if let Some(interval) = file.relax.cg_restart_interval {
        builder = builder.cg_restart_interval(interval);
    }
    if let Some(threshold) = file.relax.crossover_threshold {
        builder = builder.crossover_threshold(threshold);
    }
    let relax = builder
        .build()
        .map_err(geomopt::engine::error::EngineError::from)?;

    let max_steps = args
        .max_steps
        .or(file.relax.max_steps)
        .unwrap_or(DEFAULT_MAX_STEPS);
    if max_steps == 0 {
        return Err(CliError::Argument(
            "max-steps must be at least 1".to_string(),
        ));
    }

    let potential = LennardJones::new(
        file.potential.epsilon.unwrap_or(1.0),
        file.potential.sigma.unwrap_or(1.0),
    )
    .map_err(|reason| CliError::Config(reason.to_string()))?;

    Ok(ResolvedConfig {
        relax,
        max_steps,
        potential,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::RelaxArgs;
    use std::path::PathBuf;

    fn args() -> RelaxArgs {
        RelaxArgs {
            input: PathBuf::from("in.xyz"),
            output: PathBuf::from("out.xyz"),
            config: None,
            method: None,
            force_tolerance: None,
            max_steps: None,
        }
    }

    #[test]
    fn empty_inputs_resolve_to_defaults() {
        let resolved = resolve(FileConfig::default(), &args()).unwrap();
        assert_eq!(resolved.relax.method, DEFAULT_METHOD);
        assert_eq!(resolved.relax.force_tolerance, DEFAULT_FORCE_TOLERANCE);
        assert_eq!(resolved.max_steps, DEFAULT_MAX_STEPS);
    }

    #[test]
    fn cli_flags_override_the_file() {
        let mut file = FileConfig::default();
        file.relax.method = Some("sd".to_string());
        file.relax.max_steps = Some(100);

        let mut overrides = args();
        overrides.method = Some("bfgs".to_string());
        overrides.max_steps = Some(25);

        let resolved = resolve(file, &overrides).unwrap();
        assert_eq!(resolved.relax.method, RelaxMethod::QuasiNewton);
        assert_eq!(resolved.max_steps, 25);
    }

    #[test]
    fn unknown_method_in_the_file_is_rejected() {
        let mut file = FileConfig::default();
        file.relax.method = Some("simplex".to_string());
        assert!(resolve(file, &args()).is_err());
    }

    #[test]
    fn zero_step_budget_is_rejected() {
        let mut overrides = args();
        overrides.max_steps = Some(0);
        let err = resolve(FileConfig::default(), &overrides).unwrap_err();
        assert!(matches!(err, CliError::Argument(_)));
    }

    #[test]
    fn toml_round_trip_parses_kebab_case_keys() {
        let content = r#"
            [relax]
            method = "cg"
            force-tolerance = 1e-5
            max-steps = 250

            [potential]
            epsilon = 0.8
            sigma = 1.2
        "#;
        let file: FileConfig = toml::from_str(content).unwrap();
        assert_eq!(file.relax.method.as_deref(), Some("cg"));
        assert_eq!(file.relax.force_tolerance, Some(1e-5));
        assert_eq!(file.relax.max_steps, Some(250));
        assert_eq!(file.potential.epsilon, Some(0.8));
    }
}
