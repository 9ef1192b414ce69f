use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::core::models::geometry::Geometry;
use crate::core::utils::vectors::clip_to_component_cap;
use crate::engine::config::RelaxConfig;
use crate::engine::error::EngineError;
use crate::engine::state::RelaxState;

/// Floor on `s·y` below which the curvature condition counts as failed.
const CURVATURE_FLOOR: f64 = 1e-12;

/// Quasi-Newton relaxation with an inverse-BFGS Hessian approximation.
///
/// Sign conventions: `forces` are the negative energy gradient. With
/// `s = x_k − x_{k−1}` and `y = f_{k−1} − f_k` (equal to
/// `∇E_k − ∇E_{k−1}`), the curvature condition `s·y > 0` keeps the
/// approximation positive definite, and the Newton-like step is `H × f`.
///
/// The proposed step is clipped to the shared trust radius, which shrinks
/// whenever the solver reports an energy increase for the previous step.
#[derive(Debug, Clone)]
pub(crate) struct QuasiNewton {
    h_inv: DMatrix<f64>,
    prev_coords: DVector<f64>,
    prev_force: DVector<f64>,
    prev_energy: f64,
    init_scale: f64,
    has_history: bool,
}

impl QuasiNewton {
    pub(crate) fn allocate(dim: usize, config: &RelaxConfig) -> Self {
        Self {
            h_inv: DMatrix::identity(dim, dim) * config.trial_step,
            prev_coords: DVector::zeros(dim),
            prev_force: DVector::zeros(dim),
            prev_energy: f64::INFINITY,
            init_scale: config.trial_step,
            has_history: false,
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

        if self.has_history {
            if total_energy > self.prev_energy + config.energy_tolerance {
                state.shrink_trust_radius(config.min_trust_radius);
                debug!(
                    step = state.step,
                    trust_radius = state.trust_radius,
                    "energy rose on the previous step; shrinking the trust radius"
                );
            }

            let s = geometry.coords() - &self.prev_coords;
            let y = &self.prev_force - forces;
            let sy = s.dot(&y);
            if sy <= CURVATURE_FLOOR {
                // An update with non-positive curvature could turn the next
                // step uphill; start the approximation over instead.
                self.reset_hessian();
                state.diagnostics.bfgs_resets += 1;
                warn!(
                    step = state.step,
                    resets = state.diagnostics.bfgs_resets,
                    "curvature condition failed; resetting the inverse Hessian"
                );
            } else {
                self.apply_update(&s, &y, sy);
            }
        }

        let mut displacement = &self.h_inv * forces;
        let cap = state.trust_radius.min(config.max_displacement);
        clip_to_component_cap(&mut displacement, cap);

        self.prev_coords.copy_from(geometry.coords());
        self.prev_force.copy_from(forces);
        self.prev_energy = total_energy;
        self.has_history = true;

        geometry.displace(&displacement)?;
        Ok(())
    }

    /// Rank-2 inverse-BFGS update,
    /// `H ← (I − ρ s yᵀ) H (I − ρ y sᵀ) + ρ s sᵀ` with `ρ = 1/(s·y)`,
    /// in expanded form, followed by re-symmetrization against accumulated
    /// round-off.
    fn apply_update(&mut self, s: &DVector<f64>, y: &DVector<f64>, sy: f64) {
        let rho = 1.0 / sy;
        let hy = &self.h_inv * y;
        let yhy = y.dot(&hy);

        self.h_inv += (s * s.transpose()) * (rho * (1.0 + rho * yhy))
            - (s * hy.transpose() + &hy * s.transpose()) * rho;
        self.h_inv = (&self.h_inv + self.h_inv.transpose()) * 0.5;
    }

    fn reset_hessian(&mut self) {
        self.h_inv.fill(0.0);
        self.h_inv.fill_diagonal(self.init_scale);
    }

    #[cfg(test)]
    pub(crate) fn inverse_hessian(&self) -> &DMatrix<f64> {
        &self.h_inv
    }
}
