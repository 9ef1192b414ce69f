use geomopt::core::models::geometry::Geometry;
use geomopt::engine::error::EngineError;
use geomopt::workflows::relax::{Evaluation, ForceModel};
use nalgebra::DVector;
use thiserror::Error;

/// Below this separation two atoms count as overlapping and the evaluation
/// fails rather than producing astronomically large forces.
const MIN_SEPARATION: f64 = 1e-6;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum PotentialError {
    #[error("{parameter} must be a positive finite number, got {value}")]
    NonPositiveParameter { parameter: &'static str, value: f64 },
}

/// Pairwise Lennard-Jones 12-6 potential with analytic forces,
/// `U(r) = 4ε[(σ/r)¹² − (σ/r)⁶]`. The built-in stand-in for an external
/// electronic-structure solver.
#[derive(Debug, Clone)]
pub struct LennardJones {
    epsilon: f64,
    sigma: f64,
}

impl LennardJones {
    pub fn new(epsilon: f64, sigma: f64) -> Result<Self, PotentialError> {
        for (parameter, value) in [("epsilon", epsilon), ("sigma", sigma)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PotentialError::NonPositiveParameter { parameter, value });
            }
        }
        Ok(Self { epsilon, sigma })
    }

    /// Separation at which the pair force vanishes, `2^(1/6)·σ`.
    pub fn equilibrium_distance(&self) -> f64 {
        2.0_f64.powf(1.0 / 6.0) * self.sigma
    }
}

impl ForceModel for LennardJones {
    fn evaluate(&mut self, geometry: &Geometry) -> Result<Evaluation, EngineError> {
        let atoms = geometry.atom_count();
        let mut energy = 0.0;
        let mut forces = DVector::zeros(geometry.dim());

        for i in 0..atoms {
            for j in (i + 1)..atoms {
                let rij = geometry.position(i) - geometry.position(j);
                let r_sq = rij.norm_squared();
                if r_sq < MIN_SEPARATION * MIN_SEPARATION {
                    return Err(EngineError::ForceEvaluation {
                        message: format!("atoms {i} and {j} overlap"),
                    });
                }

                let sr2 = self.sigma * self.sigma / r_sq;
                let sr6 = sr2 * sr2 * sr2;
                let sr12 = sr6 * sr6;
                energy += 4.0 * self.epsilon * (sr12 - sr6);

                // F_i = −∇_i U = (24ε/r²)(2(σ/r)¹² − (σ/r)⁶)·(r_i − r_j)
                let magnitude = 24.0 * self.epsilon * (2.0 * sr12 - sr6) / r_sq;
                for axis in 0..3 {
                    forces[i * 3 + axis] += magnitude * rij[axis];
                    forces[j * 3 + axis] -= magnitude * rij[axis];
                }
            }
        }

        Ok(Evaluation { energy, forces })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn dimer_at(separation: f64) -> Geometry {
        Geometry::from_positions(&[[0.0, 0.0, 0.0], [separation, 0.0, 0.0]]).unwrap()
    }

    #[test]
    fn rejects_non_positive_parameters() {
        assert!(LennardJones::new(0.0, 1.0).is_err());
        assert!(LennardJones::new(1.0, -2.0).is_err());
        assert!(LennardJones::new(1.0, f64::NAN).is_err());
    }

    #[test]
    fn dimer_at_equilibrium_has_zero_force_and_minus_epsilon_energy() {
        let mut lj = LennardJones::new(1.0, 1.0).unwrap();
        let geometry = dimer_at(lj.equilibrium_distance());
        let evaluation = lj.evaluate(&geometry).unwrap();

        assert!((evaluation.energy + 1.0).abs() < TOLERANCE);
        assert!(evaluation.forces.iter().all(|f| f.abs() < 1e-8));
    }

    #[test]
    fn compressed_dimer_is_pushed_apart() {
        let mut lj = LennardJones::new(1.0, 1.0).unwrap();
        let geometry = dimer_at(0.9);
        let evaluation = lj.evaluate(&geometry).unwrap();

        // Atom 0 sits left of atom 1: repulsion pushes it further left.
        assert!(evaluation.forces[0] < 0.0);
        assert!(evaluation.forces[3] > 0.0);
        // Newton's third law on every component.
        assert!((evaluation.forces[0] + evaluation.forces[3]).abs() < TOLERANCE);
    }

    #[test]
    fn stretched_dimer_is_pulled_together() {
        let mut lj = LennardJones::new(1.0, 1.0).unwrap();
        let geometry = dimer_at(2.0);
        let evaluation = lj.evaluate(&geometry).unwrap();

        assert!(evaluation.forces[0] > 0.0);
        assert!(evaluation.forces[3] < 0.0);
    }

    #[test]
    fn overlapping_atoms_fail_the_evaluation() {
        let mut lj = LennardJones::new(1.0, 1.0).unwrap();
        let geometry = dimer_at(1e-9);
        assert!(matches!(
            lj.evaluate(&geometry),
            Err(EngineError::ForceEvaluation { .. })
        ));
    }
}
