//! Traffic Grid - Entry Point
//!
//! Loads a scenario (built-in or TOML), starts the generators, draws the grid
//! to the console for the configured number of frames, then shuts the
//! simulation down and prints the travel-time reports.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use traffic_grid::core::config::ScenarioConfig;
use traffic_grid::core::error::{Result, TrafficError};
use traffic_grid::render::Visualiser;
use traffic_grid::simulation::{Simulation, SimulationReport};
use tracing_subscriber::EnvFilter;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BuiltinScenario {
    /// One default generator every 250ms
    Basic,
    /// Reversed lanes with default, horizontal and vertical generators
    Mixed,
}

/// Traffic Grid - vehicles as concurrent actors on a lane grid
#[derive(Parser, Debug)]
#[command(name = "traffic-grid")]
#[command(about = "Simulate vehicles moving across a grid of one-way lanes")]
struct Args {
    /// Scenario file (TOML); overrides --scenario
    #[arg(long)]
    config: Option<PathBuf>,

    /// Built-in scenario to run when no file is given
    #[arg(long, value_enum, default_value_t = BuiltinScenario::Mixed)]
    scenario: BuiltinScenario,

    /// Number of frames to draw
    #[arg(long)]
    frames: Option<u32>,

    /// Random seed for reproducible lane and speed choices
    #[arg(long)]
    seed: Option<u64>,

    /// Run without drawing; the run lasts as long as the frames would have
    #[arg(long, default_value_t = false)]
    no_render: bool,

    /// Print reports as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("traffic_grid=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut scenario = match &args.config {
        Some(path) => ScenarioConfig::load(path)?,
        None => match args.scenario {
            BuiltinScenario::Basic => ScenarioConfig::basic(),
            BuiltinScenario::Mixed => ScenarioConfig::mixed(),
        },
    };
    if let Some(frames) = args.frames {
        scenario.simulation.visualisation.frames = frames;
    }
    if args.seed.is_some() {
        scenario.simulation.seed = args.seed;
    }

    let mut simulation = Simulation::from_scenario(&scenario)?;
    simulation.start()?;

    let visualisation = scenario.simulation.visualisation.clone();
    if args.no_render {
        let run_for = visualisation.refresh_rate() * visualisation.frames;
        tracing::info!(seconds = run_for.as_secs_f64(), "Running headless");
        tokio::select! {
            _ = tokio::time::sleep(run_for) => {}
            _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
        }
    } else {
        let visualiser = Visualiser::new(simulation.view(), visualisation);
        tokio::select! {
            drawn = visualiser.run(simulation.shutdown_signal()) => {
                tracing::debug!(frames = drawn?, "Visualisation complete");
            }
            _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
        }
    }

    let report = tokio::time::timeout(SHUTDOWN_GRACE, simulation.shutdown())
        .await
        .map_err(|_| TrafficError::ShutdownTimeout(SHUTDOWN_GRACE))??;
    print_report(&report, args.json)
}

fn print_report(report: &SimulationReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.travel)?);
        return Ok(());
    }

    for summary in &report.generators {
        println!(
            "{}: spawned {}, exited {}, still travelling at shutdown {}",
            summary.name, summary.spawned, summary.exited, summary.cancelled
        );
    }
    for travel in &report.travel {
        println!();
        println!("{}", travel);
    }
    Ok(())
}
