//! Topotrack CLI - reconstruct points through plate topologies.
//!
//! Runs JSON scenarios and writes the positions of the points that survive
//! to the end time.

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use topotrack::geometry::unit_to_lat_lon;
use topotrack::reconstruction::SimulationClock;
use topotrack::scenario::{ChainConfig, CollisionConfig, PointSource, Scenario};

/// Reconstruct point samples through dynamically resolved plate topologies.
#[derive(Parser)]
#[command(name = "topotrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and write the surviving points.
    Run {
        /// Scenario JSON file.
        scenario: PathBuf,

        /// Output file (stdout if omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format.
        #[arg(short, long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Display information about a scenario.
    Info {
        /// Scenario JSON file.
        scenario: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// `index,lat,lon` rows with a header.
    Csv,
    /// JSON array of `{index, lat, lon}` objects.
    Json,
}

/// A surviving point at the end time.
#[derive(Serialize)]
struct PointRecord {
    index: usize,
    lat: f64,
    lon: f64,
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            scenario,
            output,
            format,
        } => run_scenario(&scenario, output.as_deref(), format),
        Commands::Info { scenario } => run_info(&scenario),
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run_scenario(path: &Path, output: Option<&Path>, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = Scenario::from_path(path)?;
    let mut engine = scenario.build()?;

    let start = Instant::now();
    engine.reconstruct()?;
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        consumed = engine.consumed_points().len(),
        "scenario complete"
    );

    let records: Vec<PointRecord> = engine
        .all_current_points()
        .into_iter()
        .enumerate()
        .filter_map(|(index, point)| {
            point.map(|p| {
                let (lat, lon) = unit_to_lat_lon(p);
                PointRecord { index, lat, lon }
            })
        })
        .collect();

    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);

    match format {
        OutputFormat::Csv => {
            writeln!(writer, "index,lat,lon")?;
            for record in &records {
                writeln!(writer, "{},{:.6},{:.6}", record.index, record.lat, record.lon)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &records)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;

    if let Some(path) = output {
        info!(path = %path.display(), points = records.len(), "wrote points");
    }
    Ok(())
}

fn run_info(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = Scenario::from_path(path)?;
    let clock = SimulationClock::new(&scenario.time_span)?;

    println!("Topotrack - Scenario Info");
    println!("=========================");
    println!(
        "Time span: {} Ma -> {} Ma (step {} Myr)",
        clock.begin_time(),
        clock.end_time(),
        clock.time_step()
    );
    println!("Sample times: {}", clock.num_times());

    let points = match &scenario.points {
        PointSource::Explicit { .. } => "explicit",
        PointSource::Fibonacci { .. } => "fibonacci",
        PointSource::Random { .. } => "random",
    };
    println!("Points: {} ({points})", scenario.num_points());
    println!("Plates with Euler poles: {}", scenario.plates.len());
    println!("Topology polygons: {}", scenario.topologies.len());

    match &scenario.collision {
        CollisionConfig::None => println!("Collision detection: disabled"),
        CollisionConfig::Kinematic(config) => println!(
            "Collision detection: kinematic (velocity > {} km/Myr, distance {} km/Myr, {} feature overrides)",
            config.parameters.velocity_threshold,
            config.parameters.distance_threshold_per_time,
            config.feature_parameters.len()
        ),
        CollisionConfig::Continental { chain, .. } => println!(
            "Collision detection: continental masks at {}{}",
            scenario.mask_template().unwrap_or_default(),
            match chain {
                ChainConfig::Kinematic(_) => ", then kinematic",
                ChainConfig::None => "",
            }
        ),
    }
    Ok(())
}
