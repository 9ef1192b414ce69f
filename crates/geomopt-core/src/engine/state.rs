use nalgebra::DVector;

use crate::core::utils::vectors::largest_component;

/// Counters for the recoverable degeneracies of a run. These are
/// observability aids, not errors: every counted event degraded to a
/// steepest-descent-like step and the run continued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Conjugate-gradient steps that fell back to the steepest-descent
    /// direction because the previous force norm vanished.
    pub cg_fallbacks: u32,
    /// Quasi-Newton updates skipped because the curvature condition failed;
    /// each reset the inverse Hessian to its scaled-identity start.
    pub bfgs_resets: u32,
}

/// Shared per-run state, created by `RelaxDispatcher::allocate` and mutated
/// on every step.
///
/// Single-writer discipline: the dispatcher writes the step counters and
/// energies; the algorithms write the convergence fields and the trust
/// radius. No other component mutates this struct.
#[derive(Debug, Clone)]
pub struct RelaxState {
    /// Problem dimensionality, `3 × atom_count`. Fixed for the run.
    pub dim: usize,
    /// Ionic step counter supplied by the driver.
    pub ionic_step: usize,
    /// Force step counter; strictly increasing across `step()` calls.
    pub step: usize,
    /// Total energy reported with the current step.
    pub etot: f64,
    /// Total energy reported with the previous step.
    pub etot_prev: f64,
    /// Largest absolute force component seen on the current step.
    pub largest_force: f64,
    /// Set once the largest force component drops below the tolerance.
    pub converged: bool,
    /// Current quasi-Newton trust radius; starts at the displacement cap and
    /// shrinks on uphill steps.
    pub trust_radius: f64,
    pub(crate) diagnostics: Diagnostics,
    have_energy: bool,
}

impl RelaxState {
    pub(crate) fn new(dim: usize, initial_trust_radius: f64) -> Self {
        Self {
            dim,
            ionic_step: 0,
            step: 0,
            etot: 0.0,
            etot_prev: 0.0,
            largest_force: f64::INFINITY,
            converged: false,
            trust_radius: initial_trust_radius,
            diagnostics: Diagnostics::default(),
            have_energy: false,
        }
    }

    /// Records the step counters and the reported energy, shifting the
    /// previous energy down.
    pub(crate) fn record_step(&mut self, ionic_step: usize, force_step: usize, etot: f64) {
        self.ionic_step = ionic_step;
        self.step = force_step;
        self.etot_prev = if self.have_energy { self.etot } else { etot };
        self.etot = etot;
        self.have_energy = true;
    }

    /// Energy change of the current step relative to the previous one.
    pub fn energy_change(&self) -> f64 {
        self.etot - self.etot_prev
    }

    /// Updates the largest-force record and the convergence flag from fresh
    /// forces. Returns the convergence verdict.
    pub(crate) fn update_convergence(&mut self, forces: &DVector<f64>, tolerance: f64) -> bool {
        self.largest_force = largest_component(forces);
        self.converged = self.largest_force < tolerance;
        self.converged
    }

    pub(crate) fn shrink_trust_radius(&mut self, floor: f64) {
        self.trust_radius = (self.trust_radius * 0.5).max(floor);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
