use tracing::info;

/// Which algorithm the hybrid strategy delegated to on the most recent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HybridPhase {
    ConjugateGradient,
    QuasiNewton,
}

/// The CG-then-BFGS switch. Conjugate gradient handles the early steps while
/// forces are large; once the largest force component drops below the
/// crossover threshold the run hands over to quasi-Newton refinement. The
/// switch is one-directional: it happens at most once per run and never
/// reverts, even if forces later rise above the threshold again.
#[derive(Debug, Clone, Default)]
pub(crate) struct HybridStrategy {
    switched: bool,
}

impl HybridStrategy {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn phase(&mut self, largest_force: f64, crossover: f64) -> HybridPhase {
        if !self.switched && largest_force < crossover {
            self.switched = true;
            info!(
                largest_force,
                crossover, "hybrid relaxation handing over from conjugate gradient to quasi-Newton"
            );
        }
        if self.switched {
            HybridPhase::QuasiNewton
        } else {
            HybridPhase::ConjugateGradient
        }
    }

    pub(crate) fn current_phase(&self) -> HybridPhase {
        if self.switched {
            HybridPhase::QuasiNewton
        } else {
            HybridPhase::ConjugateGradient
        }
    }
}
