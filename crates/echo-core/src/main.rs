//! Echo Chamber Simulation
//!
//! Runs the opinion dynamics model from a TOML configuration and writes
//! snapshots, per-tick series and the message log to the output directory.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use echo_core::config::DEFAULT_CONFIG_PATH;
use echo_core::{Config, Dynamics, JsonExporter, SimResult};

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "echo_chamber")]
#[command(about = "Opinion polarization on an evolving social network")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for per-tick draws (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to simulate (overrides the config)
    #[arg(long)]
    ticks: Option<u64>,

    /// Interval between graph snapshots, in ticks (overrides the config)
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for exported data (overrides the config)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Simulation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> SimResult<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(ticks) = args.ticks {
        config.simulation.max_ticks = ticks;
    }
    if let Some(interval) = args.snapshot_interval {
        config.simulation.snapshot_interval = interval;
    }
    if let Some(dir) = args.output_dir {
        config.simulation.output_dir = dir;
    }

    tracing::info!(
        "Config: {} agents, {} links, {} ticks, network seed {}, run seed {} (from {})",
        config.network.num_agents,
        config.network.num_links,
        config.simulation.max_ticks,
        config.network.seed,
        config.simulation.seed,
        args.config
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    );

    let mut dynamics = Dynamics::new(&config)?;
    let mut exporter = JsonExporter::new(&config.simulation.output_dir)?;
    let summary = dynamics.run(&mut exporter)?;

    if let Some(opinions) = summary.opinions {
        tracing::info!(
            "Final opinions: mean {:.3}, std {:.3}, range [{:.3}, {:.3}]",
            opinions.mean,
            opinions.std_dev,
            opinions.min,
            opinions.max
        );
    }
    tracing::info!(
        "Wrote {} snapshots to {}",
        exporter.snapshot_count(),
        config.simulation.output_dir.display()
    );
    Ok(())
}
