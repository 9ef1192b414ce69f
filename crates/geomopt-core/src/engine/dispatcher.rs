use nalgebra::DVector;
use tracing::{debug, info};

use crate::core::models::geometry::Geometry;
use crate::core::utils::vectors::largest_component;
use crate::engine::algorithms::conjugate_gradient::ConjugateGradient;
use crate::engine::algorithms::hybrid::{HybridPhase, HybridStrategy};
use crate::engine::algorithms::quasi_newton::QuasiNewton;
use crate::engine::algorithms::steepest_descent::SteepestDescent;
use crate::engine::config::{RelaxConfig, RelaxMethod};
use crate::engine::error::EngineError;
use crate::engine::state::{Diagnostics, RelaxState};

/// Owns one instance of each relaxation algorithm and delegates every step to
/// the configured method.
///
/// Lifecycle: [`allocate`](Self::allocate) once per run to size and reset all
/// state, then [`step`](Self::step) once per ionic step, strictly in order.
/// The dispatcher writes the step counters and energies into the shared
/// state; the selected algorithm mutates the geometry in place and maintains
/// its own history. Normal non-convergence is never an error; the driver
/// decides when to stop by polling [`is_converged`](Self::is_converged)
/// against its own step budget.
#[derive(Debug, Clone)]
pub struct RelaxDispatcher {
    config: RelaxConfig,
    state: Option<RelaxState>,
    sd: Option<SteepestDescent>,
    cg: Option<ConjugateGradient>,
    bfgs: Option<QuasiNewton>,
    hybrid: Option<HybridStrategy>,
}

impl RelaxDispatcher {
    pub fn new(config: RelaxConfig) -> Self {
        Self {
            config,
            state: None,
            sd: None,
            cg: None,
            bfgs: None,
            hybrid: None,
        }
    }

    pub fn config(&self) -> &RelaxConfig {
        &self.config
    }

    /// Sizes the run for `atom_count` atoms and allocates the state of the
    /// configured algorithm (both halves for the hybrid). Re-allocating
    /// resets every counter, history buffer, and the convergence flag.
    pub fn allocate(&mut self, atom_count: usize) -> Result<(), EngineError> {
        if atom_count == 0 {
            return Err(EngineError::Initialization(
                "cannot relax a system with zero atoms".to_string(),
            ));
        }
        let dim = atom_count * 3;
        self.state = Some(RelaxState::new(dim, self.config.max_displacement));
        self.sd = None;
        self.cg = None;
        self.bfgs = None;
        self.hybrid = None;

        match self.config.method {
            RelaxMethod::SteepestDescent => {
                self.sd = Some(SteepestDescent);
            }
            RelaxMethod::ConjugateGradient => {
                self.cg = Some(ConjugateGradient::allocate(dim, &self.config));
            }
            RelaxMethod::QuasiNewton => {
                self.bfgs = Some(QuasiNewton::allocate(dim, &self.config));
            }
            RelaxMethod::CgThenBfgs => {
                self.cg = Some(ConjugateGradient::allocate(dim, &self.config));
                self.bfgs = Some(QuasiNewton::allocate(dim, &self.config));
                self.hybrid = Some(HybridStrategy::new());
            }
        }

        info!(
            method = %self.config.method,
            atoms = atom_count,
            dim,
            "relaxation run allocated"
        );
        Ok(())
    }

    /// Advances the relaxation by one step: records `(istep, force_step)` and
    /// the reported energy into the shared state, then delegates to the
    /// configured algorithm, which mutates `geometry` in place and may set
    /// the convergence flag.
    pub fn step(
        &mut self,
        istep: usize,
        force_step: usize,
        geometry: &mut Geometry,
        forces: &DVector<f64>,
        total_energy: f64,
    ) -> Result<(), EngineError> {
        let state = self.state.as_mut().ok_or(EngineError::NotAllocated)?;
        if geometry.dim() != state.dim {
            return Err(EngineError::DimensionMismatch {
                expected: state.dim,
                actual: geometry.dim(),
            });
        }
        if forces.len() != state.dim {
            return Err(EngineError::DimensionMismatch {
                expected: state.dim,
                actual: forces.len(),
            });
        }

        state.record_step(istep, force_step, total_energy);
        debug!(
            istep,
            force_step,
            energy = total_energy,
            "dispatching relaxation step"
        );

        match self.config.method {
            RelaxMethod::SteepestDescent => self
                .sd
                .as_mut()
                .ok_or(EngineError::NotAllocated)?
                .advance(state, geometry, forces, total_energy, &self.config),
            RelaxMethod::ConjugateGradient => self
                .cg
                .as_mut()
                .ok_or(EngineError::NotAllocated)?
                .advance(state, geometry, forces, total_energy, &self.config),
            RelaxMethod::QuasiNewton => self
                .bfgs
                .as_mut()
                .ok_or(EngineError::NotAllocated)?
                .advance(state, geometry, forces, total_energy, &self.config),
            RelaxMethod::CgThenBfgs => {
                let phase = self
                    .hybrid
                    .as_mut()
                    .ok_or(EngineError::NotAllocated)?
                    .phase(largest_component(forces), self.config.crossover_threshold);
                match phase {
                    HybridPhase::ConjugateGradient => self
                        .cg
                        .as_mut()
                        .ok_or(EngineError::NotAllocated)?
                        .advance(state, geometry, forces, total_energy, &self.config),
                    HybridPhase::QuasiNewton => self
                        .bfgs
                        .as_mut()
                        .ok_or(EngineError::NotAllocated)?
                        .advance(state, geometry, forces, total_energy, &self.config),
                }
            }
        }
    }

    pub fn is_converged(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.converged)
    }

    /// Largest absolute force component seen on the most recent step.
    pub fn largest_force(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.largest_force)
    }

    pub fn state(&self) -> Option<&RelaxState> {
        self.state.as_ref()
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        self.state.as_ref().map(|s| s.diagnostics())
    }

    /// For the hybrid method: the algorithm used on the most recent step.
    /// `None` for every other method.
    pub fn hybrid_phase(&self) -> Option<HybridPhase> {
        self.hybrid.as_ref().map(|h| h.current_phase())
    }
}
