use crate::cli::RelaxArgs;
use crate::config::{self, FileConfig};
use crate::error::Result;
use crate::utils::parser;
use crate::utils::progress::CliProgressHandler;
use geomopt::engine::progress::ProgressReporter;
use geomopt::workflows::relax;
use tracing::{info, warn};

pub fn run(args: RelaxArgs) -> Result<()> {
    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let resolved = config::resolve(file_config, &args)?;

    let mut system = parser::read_xyz(&args.input)?;
    info!(
        atoms = system.geometry.atom_count(),
        method = %resolved.relax.method,
        max_steps = resolved.max_steps,
        "Loaded structure from '{}'.",
        args.input.display()
    );

    let mut model = resolved.potential;
    tracing::debug!(
        equilibrium_distance = model.equilibrium_distance(),
        "Using the built-in Lennard-Jones force model."
    );
    let handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(handler.get_callback());

    let result = relax::run(
        &mut system.geometry,
        &mut model,
        &resolved.relax,
        resolved.max_steps,
        &reporter,
    )?;

    parser::write_xyz(&args.output, &system)?;
    info!("Wrote relaxed structure to '{}'.", args.output.display());

    if result.converged {
        println!(
            "✅ Converged in {} steps: E = {:.6}, F_max = {:.2e}",
            result.steps, result.final_energy, result.largest_force
        );
    } else {
        warn!(
            steps = result.steps,
            largest_force = result.largest_force,
            "Run ended without reaching the force tolerance."
        );
        println!(
            "⚠️  Not converged after {} steps: E = {:.6}, F_max = {:.2e}",
            result.steps, result.final_energy, result.largest_force
        );
    }

    Ok(())
}
