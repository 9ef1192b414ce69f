use geomopt::core::models::geometry::Geometry;
use geomopt::engine::config::{RelaxConfig, RelaxMethod};
use geomopt::engine::dispatcher::RelaxDispatcher;
use geomopt::engine::error::EngineError;
use geomopt::engine::progress::ProgressReporter;
use geomopt::workflows::relax::{self, Evaluation, ForceModel};
use nalgebra::DVector;

/// Isotropic harmonic well centered at the origin: `f(x) = -k·x`,
/// `E(x) = ½·k·|x|²`.
struct HarmonicModel {
    k: f64,
}

impl ForceModel for HarmonicModel {
    fn evaluate(&mut self, geometry: &Geometry) -> Result<Evaluation, EngineError> {
        let coords = geometry.coords();
        Ok(Evaluation {
            energy: 0.5 * self.k * coords.norm_squared(),
            forces: coords * -self.k,
        })
    }
}

/// Wraps a model and records the largest single-component move between
/// consecutive evaluations.
struct StepAuditModel<M> {
    inner: M,
    previous: Option<DVector<f64>>,
    largest_move: f64,
}

impl<M> StepAuditModel<M> {
    fn new(inner: M) -> Self {
        Self {
            inner,
            previous: None,
            largest_move: 0.0,
        }
    }
}

impl<M: ForceModel> ForceModel for StepAuditModel<M> {
    fn evaluate(&mut self, geometry: &Geometry) -> Result<Evaluation, EngineError> {
        if let Some(previous) = &self.previous {
            let moved = (geometry.coords() - previous)
                .iter()
                .fold(0.0_f64, |acc, x| acc.max(x.abs()));
            self.largest_move = self.largest_move.max(moved);
        }
        self.previous = Some(geometry.coords().clone());
        self.inner.evaluate(geometry)
    }
}

fn config(method: RelaxMethod, max_displacement: f64) -> RelaxConfig {
    RelaxConfig::builder()
        .method(method)
        .force_tolerance(1e-6)
        .max_displacement(max_displacement)
        .trial_step(0.1)
        .build()
        .unwrap()
}

fn one_atom_at(x: f64) -> Geometry {
    Geometry::from_positions(&[[x, 0.0, 0.0]]).unwrap()
}

#[test]
fn steepest_descent_relaxes_a_harmonic_well_within_200_steps() {
    let mut geometry = one_atom_at(10.0);
    let mut model = HarmonicModel { k: 1.0 };
    let cfg = config(RelaxMethod::SteepestDescent, 2.0);

    let result = relax::run(
        &mut geometry,
        &mut model,
        &cfg,
        200,
        &ProgressReporter::new(),
    )
    .unwrap();

    assert!(result.converged, "SD should converge within 200 steps");
    assert!(geometry.position(0).norm() < 1e-6);
}

#[test]
fn quasi_newton_converges_in_fewer_steps_than_steepest_descent() {
    let run_with = |method: RelaxMethod| {
        let mut geometry = one_atom_at(10.0);
        let mut model = HarmonicModel { k: 1.0 };
        let cfg = config(method, 20.0);
        relax::run(
            &mut geometry,
            &mut model,
            &cfg,
            500,
            &ProgressReporter::new(),
        )
        .unwrap()
    };

    let sd = run_with(RelaxMethod::SteepestDescent);
    let bfgs = run_with(RelaxMethod::QuasiNewton);

    assert!(sd.converged);
    assert!(bfgs.converged);
    assert!(
        bfgs.steps < sd.steps,
        "BFGS took {} steps, SD took {}",
        bfgs.steps,
        sd.steps
    );
}

#[test]
fn every_method_honors_the_displacement_cap() {
    for method in [
        RelaxMethod::SteepestDescent,
        RelaxMethod::ConjugateGradient,
        RelaxMethod::QuasiNewton,
        RelaxMethod::CgThenBfgs,
    ] {
        let mut geometry = one_atom_at(10.0);
        let mut model = StepAuditModel::new(HarmonicModel { k: 1.0 });
        let cfg = config(method, 0.3);

        relax::run(
            &mut geometry,
            &mut model,
            &cfg,
            100,
            &ProgressReporter::new(),
        )
        .unwrap();

        assert!(
            model.largest_move <= cfg.max_displacement + 1e-9,
            "{method}: largest per-step component {} exceeded the cap",
            model.largest_move
        );
    }
}

#[test]
fn hybrid_switches_from_cg_to_bfgs_exactly_once() {
    use geomopt::engine::HybridPhase;

    let cfg = RelaxConfig::builder()
        .method(RelaxMethod::CgThenBfgs)
        .force_tolerance(1e-6)
        .max_displacement(1.0)
        .trial_step(0.1)
        .crossover_threshold(0.5)
        .build()
        .unwrap();

    let mut dispatcher = RelaxDispatcher::new(cfg.clone());
    dispatcher.allocate(1).unwrap();

    let mut geometry = one_atom_at(10.0);
    let mut model = HarmonicModel { k: 1.0 };
    let mut phases = Vec::new();

    for step in 0..500 {
        let evaluation = model.evaluate(&geometry).unwrap();
        let below_crossover =
            evaluation.forces.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
                < cfg.crossover_threshold;
        dispatcher
            .step(step, step, &mut geometry, &evaluation.forces, evaluation.energy)
            .unwrap();
        let phase = dispatcher.hybrid_phase().unwrap();

        // The handover happens at the first step whose incoming forces drop
        // below the crossover, and on no other condition.
        if phases.last() == Some(&HybridPhase::ConjugateGradient) {
            assert_eq!(
                phase == HybridPhase::QuasiNewton,
                below_crossover,
                "unexpected phase at step {step}"
            );
        }
        phases.push(phase);
        if dispatcher.is_converged() {
            break;
        }
    }

    assert!(dispatcher.is_converged());
    let transitions = phases
        .windows(2)
        .filter(|pair| pair[0] != pair[1])
        .count();
    assert_eq!(transitions, 1, "hybrid must switch exactly once");
    assert_eq!(*phases.first().unwrap(), HybridPhase::ConjugateGradient);
    assert_eq!(*phases.last().unwrap(), HybridPhase::QuasiNewton);
}

#[test]
fn identical_runs_produce_identical_trajectories() {
    let run = || {
        let mut geometry =
            Geometry::from_positions(&[[4.0, -1.0, 2.5], [-3.0, 0.5, 1.0]]).unwrap();
        let mut model = HarmonicModel { k: 0.7 };
        let cfg = config(RelaxMethod::ConjugateGradient, 0.4);
        relax::run(
            &mut geometry,
            &mut model,
            &cfg,
            50,
            &ProgressReporter::new(),
        )
        .unwrap();
        geometry.coords().clone()
    };

    assert_eq!(run(), run());
}

#[test]
fn exhausting_the_step_budget_reports_unconverged_without_an_error() {
    let mut geometry = one_atom_at(10.0);
    let mut model = HarmonicModel { k: 1.0 };
    let cfg = config(RelaxMethod::SteepestDescent, 2.0);

    let result = relax::run(
        &mut geometry,
        &mut model,
        &cfg,
        3,
        &ProgressReporter::new(),
    )
    .unwrap();

    assert!(!result.converged);
    assert_eq!(result.steps, 3);
    assert!(result.largest_force > cfg.force_tolerance);
}
