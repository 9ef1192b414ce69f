use nalgebra::DVector;
use tracing::{debug, warn};

use crate::core::models::geometry::Geometry;
use crate::core::utils::vectors::clip_to_component_cap;
use crate::engine::config::RelaxConfig;
use crate::engine::error::EngineError;
use crate::engine::state::RelaxState;

const ALPHA_GROWTH: f64 = 1.2;
const ALPHA_SHRINK: f64 = 0.5;
const MAX_RETRIES: usize = 4;
/// Floor on the previous force's squared norm in the β division.
const NORM_FLOOR: f64 = 1e-24;

/// Polak–Ribière⁺ conjugate gradient with a bounded, step-driven line search.
///
/// The engine only learns the energy of a proposed point on the *next* call,
/// so backtracking is implemented as retract-and-retry: when the reported
/// energy rose above the anchor (the energy of the point last stepped from),
/// the step is retracted and re-taken at half length along the same
/// direction, and the rejected point's forces are discarded.
#[derive(Debug, Clone)]
pub(crate) struct ConjugateGradient {
    direction: DVector<f64>,
    prev_force: DVector<f64>,
    prev_displacement: DVector<f64>,
    anchor_energy: f64,
    alpha: f64,
    steps_since_restart: usize,
    retries: usize,
    has_direction: bool,
}

impl ConjugateGradient {
    pub(crate) fn allocate(dim: usize, config: &RelaxConfig) -> Self {
        Self {
            direction: DVector::zeros(dim),
            prev_force: DVector::zeros(dim),
            prev_displacement: DVector::zeros(dim),
            anchor_energy: f64::INFINITY,
            alpha: config.trial_step,
            steps_since_restart: 0,
            retries: 0,
            has_direction: false,
        }
    }

    pub(crate) fn advance(
        &mut self,
        state: &mut RelaxState,
        geometry: &mut Geometry,
        forces: &DVector<f64>,
        total_energy: f64,
        config: &RelaxConfig,
    ) -> Result<(), EngineError> {
        if state.update_convergence(forces, config.force_tolerance) {
            return Ok(());
        }

        // The previous step went uphill: retract to the anchor and re-step at
        // reduced length along the stored direction. The forces reported for
        // the rejected point are discarded.
        if self.has_direction
            && total_energy > self.anchor_energy + config.energy_tolerance
            && self.retries < MAX_RETRIES
        {
            self.retries += 1;
            self.alpha *= ALPHA_SHRINK;
            debug!(
                step = state.step,
                retry = self.retries,
                alpha = self.alpha,
                "energy rose along the search direction; backtracking"
            );
            let retraction = &self.prev_displacement * (ALPHA_SHRINK - 1.0);
            geometry.displace(&retraction)?;
            self.prev_displacement *= ALPHA_SHRINK;
            return Ok(());
        }

        let went_downhill =
            self.has_direction && total_energy < self.anchor_energy - config.energy_tolerance;
        self.retries = 0;

        let prev_norm_sq = self.prev_force.norm_squared();
        let mut direction = if !self.has_direction
            || self.steps_since_restart >= config.cg_restart_interval
        {
            self.steps_since_restart = 0;
            forces.clone()
        } else if prev_norm_sq < NORM_FLOOR {
            // β would divide by a vanishing norm; fall back to the
            // steepest-descent direction instead.
            state.diagnostics.cg_fallbacks += 1;
            warn!(
                step = state.step,
                "previous force norm vanished; restarting from the steepest-descent direction"
            );
            self.steps_since_restart = 0;
            forces.clone()
        } else {
            let beta = (forces.dot(&(forces - &self.prev_force)) / prev_norm_sq).max(0.0);
            forces + &self.direction * beta
        };

        // A conjugate direction that no longer points downhill restarts the
        // cycle.
        if direction.dot(forces) <= 0.0 {
            direction = forces.clone();
            self.steps_since_restart = 0;
        }

        if went_downhill {
            self.alpha *= ALPHA_GROWTH;
        }

        let norm = direction.norm();
        let mut displacement = &direction * (self.alpha / norm);
        let scale = clip_to_component_cap(&mut displacement, config.max_displacement);
        if scale < 1.0 {
            // Track the step length actually taken so the cap, not repeated
            // growth, governs the next trial.
            self.alpha *= scale;
        }
        geometry.displace(&displacement)?;

        self.direction = direction;
        self.prev_force.copy_from(forces);
        self.prev_displacement = displacement;
        self.anchor_energy = total_energy;
        self.has_direction = true;
        self.steps_since_restart += 1;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn direction(&self) -> &DVector<f64> {
        &self.direction
    }
}
