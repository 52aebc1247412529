//! Orchestration Layer
//!
//! This crate wraps the spray kernel for real runs:
//! - JSON configuration loading and validation
//! - A frame driver that steps a simulation and selects frames to keep
//! - Frame sinks (in-memory, or PNG files plus a JSON manifest)
//! - A background runner with progress polling, used by the server

#![warn(missing_docs)]

pub mod config;
pub mod driver;
pub mod error;
pub mod runner;
pub mod sink;

pub use config::{OutputConfig, SprayConfig};
pub use driver::{FrameDriver, MaterializePolicy, MaterializedFrame, PoseSample, RunSummary};
pub use error::{Error, Result};
pub use runner::{Progress, RunnerState, SimulationRunner};
pub use sink::{DirectorySink, FrameSink, Manifest, MemorySink};

use spray_kernel::Simulation;
use std::path::Path;

/// Build a kernel simulation from a validated configuration.
pub fn build_simulation(config: &SprayConfig) -> Result<Simulation> {
    tracing::info!("Building simulation '{}'", config.name);
    let sim = Simulation::configure(config.to_params())?;
    tracing::info!(
        "Simulation '{}' ready: {} steps",
        config.name,
        sim.total_steps()
    );
    Ok(sim)
}

/// Materialization policy for a configuration, optionally overriding the
/// frame budget.
pub fn policy_for(config: &SprayConfig, total_steps: usize, max_frames: Option<usize>) -> MaterializePolicy {
    let budget = max_frames.unwrap_or(config.output.max_saved_frames);
    MaterializePolicy::new(total_steps, config.output.save_every, budget)
}

/// Load a configuration file and run it to completion into `sink`.
///
/// This function performs the full pipeline:
/// 1. Load and validate the configuration
/// 2. Configure the kernel
/// 3. Step every frame, feeding poses and frames to `sink`
pub fn run_config(config_path: impl AsRef<Path>, sink: &mut dyn FrameSink) -> Result<RunSummary> {
    let config_path = config_path.as_ref();
    tracing::info!("Running spray config: {:?}", config_path);

    // 1. Load and validate configuration
    let config = SprayConfig::load(config_path)?;
    tracing::info!("Configuration loaded: {}", config.name);

    // 2. Configure kernel
    let mut sim = build_simulation(&config)?;

    // 3. Drive
    let policy = policy_for(&config, sim.total_steps(), None);
    FrameDriver::new(&mut sim, policy).run(sink)
}

/// Create a background runner for a configuration file.
///
/// Frames and the manifest are written to `frames_dir` when given;
/// otherwise only the runner's in-memory progress is kept. The runner is
/// returned unstarted.
pub fn create_runner(
    config_path: impl AsRef<Path>,
    frames_dir: Option<&Path>,
) -> Result<SimulationRunner> {
    let config = SprayConfig::load(config_path)?;
    let sim = build_simulation(&config)?;
    let policy = policy_for(&config, sim.total_steps(), None);

    let sink: Option<Box<dyn FrameSink + Send>> = match frames_dir {
        Some(dir) => Some(Box::new(DirectorySink::create(dir, config.name.clone())?)),
        None => None,
    };

    tracing::info!("Simulation runner ready to start");
    Ok(SimulationRunner::new(Box::new(sim), policy, sink))
}
