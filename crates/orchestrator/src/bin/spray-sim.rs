//! Command-line spray run: load a config, write PNG frames and a manifest.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spray_orchestrator::{build_simulation, policy_for, DirectorySink, FrameDriver, SprayConfig};

/// Simulate a robot arm spray-painting a wall
#[derive(Debug, Parser)]
#[command(name = "spray-sim", version, about)]
struct Cli {
    /// JSON configuration file
    config: PathBuf,

    /// Output directory (defaults to the config's output.directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum number of frames to write
    #[arg(short, long)]
    frames: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    if cli.frames == Some(0) {
        anyhow::bail!("--frames must be at least 1");
    }

    let config = SprayConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let mut sim = build_simulation(&config)?;

    let out_dir = cli
        .output
        .unwrap_or_else(|| PathBuf::from(&config.output.directory));
    let mut sink = DirectorySink::create(&out_dir, config.name.clone())?;

    let policy = policy_for(&config, sim.total_steps(), cli.frames);
    let summary = FrameDriver::new(&mut sim, policy)
        .run(&mut sink)
        .with_context(|| format!("run '{}' failed", config.name))?;

    println!(
        "{}: {} steps, {} frames, coverage {:.2}%, {:.2}s -> {}",
        config.name,
        summary.steps,
        summary.frames,
        summary.final_coverage_percent,
        summary.elapsed_secs,
        out_dir.display(),
    );
    Ok(())
}
