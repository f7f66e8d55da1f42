use clap::Parser;
use mbd_engines::scripted::{self, Scenario};
use mbd_engines::{EngineConfig, EngineError, EngineSet};
use mbd_run::{Orchestrator, SolveOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mbd-cli")]
#[command(about = "Mechanism dynamics run orchestrator", long_about = None)]
struct Cli {
    /// Mechanism model file to run the solver on
    #[arg(short = 'f', long)]
    model_file: PathBuf,

    /// Save the updated model file when the solver finished
    #[arg(short = 's', long)]
    save_model: bool,

    /// Reduce unreduced FE parts before solving
    #[arg(short = 'r', long)]
    reduce_fem: bool,

    /// VTFx output file for visualization
    #[arg(short = 'v', long)]
    vtfx_file: Option<PathBuf>,

    /// Max fringe range value for VTFx output (negative = automatic)
    #[arg(short = 'm', long, default_value_t = -1.0, allow_hyphen_values = true)]
    fringe_max: f64,

    /// Scripted engine scenario to run against, instead of the engines
    /// configured through the environment
    #[arg(long)]
    scenario: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("Engine setup failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Simulation run failed with status {status}")]
    RunFailed { status: i32 },
}

fn build_engines(cli: &Cli) -> Result<EngineSet, EngineError> {
    let (engines, _probes) = match &cli.scenario {
        Some(path) => Scenario::load(path)?.build(),
        None => scripted::engines_from_config(&EngineConfig::from_env()?)?,
    };
    Ok(engines)
}

fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let engines = build_engines(&cli)?;
    let mut orchestrator = Orchestrator::new(engines);

    let options = SolveOptions {
        save_model: cli.save_model,
        reduce_fem: cli.reduce_fem,
        vtfx_file: cli.vtfx_file.clone(),
        fringe_max: cli.fringe_max,
    };
    let status = orchestrator.solve_all(Some(&cli.model_file), &options);
    if status != 0 {
        return Err(AppError::RunFailed { status });
    }

    println!("✓ Simulation completed: {}", cli.model_file.display());
    Ok(())
}
