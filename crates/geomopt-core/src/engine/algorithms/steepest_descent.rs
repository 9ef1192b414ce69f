use nalgebra::DVector;

use crate::core::models::geometry::Geometry;
use crate::core::utils::vectors::clip_to_component_cap;
use crate::engine::config::RelaxConfig;
use crate::engine::error::EngineError;
use crate::engine::state::RelaxState;

/// Moves every atom directly along the force acting on it. Keeps no history;
/// each step is `trial_step × forces`, uniformly rescaled so the largest
/// displacement component stays within the configured cap.
#[derive(Debug, Default, Clone)]
pub(crate) struct SteepestDescent;

impl SteepestDescent {
    pub(crate) fn advance(
        &mut self,
        state: &mut RelaxState,
        geometry: &mut Geometry,
        forces: &DVector<f64>,
        _total_energy: f64,
        config: &RelaxConfig,
    ) -> Result<(), EngineError> {
        if state.update_convergence(forces, config.force_tolerance) {
            return Ok(());
        }

        let mut displacement = forces * config.trial_step;
        clip_to_component_cap(&mut displacement, config.max_displacement);
        geometry.displace(&displacement)?;
        Ok(())
    }
}
