use nalgebra::DVector;
use tracing::{info, instrument, warn};

use crate::core::models::geometry::Geometry;
use crate::engine::config::RelaxConfig;
use crate::engine::dispatcher::RelaxDispatcher;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};

/// One force/energy evaluation of the current geometry.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub energy: f64,
    pub forces: DVector<f64>,
}

/// The seam to the external electronic-structure solver: given the current
/// geometry, produce the total energy and per-atom forces (flattened in the
/// same atom order as the geometry).
pub trait ForceModel {
    fn evaluate(&mut self, geometry: &Geometry) -> Result<Evaluation, EngineError>;
}

#[derive(Debug, Clone)]
pub struct RelaxationResult {
    pub converged: bool,
    /// Number of force evaluations performed.
    pub steps: usize,
    pub final_energy: f64,
    pub largest_force: f64,
}

/// Relaxes `geometry` in place against `model` until the largest force
/// component drops below the configured tolerance or `max_steps` evaluations
/// have been spent. Running out of steps is a reported outcome, not an
/// error.
#[instrument(skip_all, name = "relaxation_workflow")]
pub fn run(
    geometry: &mut Geometry,
    model: &mut dyn ForceModel,
    config: &RelaxConfig,
    max_steps: usize,
    reporter: &ProgressReporter,
) -> Result<RelaxationResult, EngineError> {
    let mut dispatcher = RelaxDispatcher::new(config.clone());
    dispatcher.allocate(geometry.atom_count())?;

    reporter.report(Progress::RunStart {
        max_steps: max_steps as u64,
    });
    info!(
        method = %config.method,
        atoms = geometry.atom_count(),
        max_steps,
        "starting geometry relaxation"
    );

    let mut final_energy = f64::NAN;
    for step in 0..max_steps {
        let evaluation = model.evaluate(geometry).inspect_err(|e| {
            warn!(step, error = %e, "force evaluation failed; aborting the run");
        })?;
        dispatcher.step(step, step, geometry, &evaluation.forces, evaluation.energy)?;
        final_energy = evaluation.energy;

        let largest_force = dispatcher.largest_force().unwrap_or(f64::INFINITY);
        reporter.report(Progress::StepComplete {
            step,
            energy: evaluation.energy,
            largest_force,
        });

        if dispatcher.is_converged() {
            reporter.report(Progress::Converged { step });
            reporter.report(Progress::RunFinish);
            info!(
                steps = step + 1,
                energy = final_energy,
                largest_force,
                "relaxation converged"
            );
            return Ok(RelaxationResult {
                converged: true,
                steps: step + 1,
                final_energy,
                largest_force,
            });
        }
    }

    let largest_force = dispatcher.largest_force().unwrap_or(f64::INFINITY);
    reporter.report(Progress::RunFinish);
    warn!(
        max_steps,
        largest_force, "relaxation did not converge within the step budget"
    );
    Ok(RelaxationResult {
        converged: false,
        steps: max_steps,
        final_energy,
        largest_force,
    })
}
