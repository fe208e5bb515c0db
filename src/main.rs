//! Headless balance runner
//!
//! Races every bike archetype against the others many times without a
//! renderer and prints finishing statistics per archetype.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use bike_racer_lib::race::BikeAssignment;
use bike_racer_lib::track::track_ids;
use bike_racer_lib::{run_balance, BalanceConfig, GameConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

/// Batch race simulation for bike archetype balancing
#[derive(Parser)]
#[command(name = "bike-balance")]
#[command(about = "Headless batch races aggregated per bike archetype", long_about = None)]
#[command(version)]
struct Cli {
    /// Number of independent races
    #[arg(long, default_value_t = 50)]
    trials: u32,

    /// Racers per race
    #[arg(long, default_value_t = 8)]
    racers: u32,

    /// Laps per race
    #[arg(long, default_value_t = 3)]
    laps: u32,

    /// Ticks before an unfinished race is abandoned
    #[arg(long, default_value_t = 20_000)]
    frame_cap: u64,

    /// Track id
    #[arg(long, default_value = "stadium")]
    track: String,

    /// Base seed; trial n uses seed + n
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Pick bikes at random instead of cycling through every class
    #[arg(long)]
    random_bikes: bool,

    /// JSON file overriding tuning constants
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// List built-in tracks and exit
    #[arg(long)]
    list_tracks: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.list_tracks {
        for id in track_ids() {
            println!("{id}");
        }
        return Ok(());
    }

    let game = match &cli.config {
        Some(path) => GameConfig::from_json_file(path)
            .with_context(|| format!("loading tuning from {}", path.display()))?,
        None => GameConfig::default(),
    };

    let balance = BalanceConfig {
        trials: cli.trials,
        racers_per_race: cli.racers,
        total_laps: cli.laps,
        frame_cap: cli.frame_cap,
        track_id: cli.track,
        seed: cli.seed,
        bike_assignment: if cli.random_bikes {
            BikeAssignment::Random
        } else {
            BikeAssignment::RoundRobin
        },
    };

    let report = run_balance(&balance, &game).context("balance run failed")?;

    match cli.format {
        OutputFormat::Table => print!("{}", report.render_table()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
