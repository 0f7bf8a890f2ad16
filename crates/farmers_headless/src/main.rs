//! Headless farmers runner.
//!
//! # Usage
//!
//! ```bash
//! # Play one game and print its metrics
//! cargo run -p farmers_headless -- run --scenario duel --seed 7
//!
//! # Run a batch
//! cargo run -p farmers_headless -- batch --scenario free_for_all --count 100 --output results/
//!
//! # Check determinism
//! cargo run -p farmers_headless -- verify --scenario duel --runs 3
//! ```
//!
//! Results go to stdout as JSON; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use farmers_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::HeadlessRunner,
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "farmers_headless")]
#[command(about = "Headless sandbox for the farmers policy")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single game
    Run {
        /// Preset name or scenario file
        #[arg(short, long, default_value = "duel")]
        scenario: String,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick limit override
        #[arg(short, long)]
        ticks: Option<u64>,
    },

    /// Run many seeds of one scenario
    Batch {
        /// Preset name or scenario file
        #[arg(short, long, default_value = "duel")]
        scenario: String,

        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick limit override (0 = scenario's own)
        #[arg(long, default_value = "0")]
        max_ticks: u64,
    },

    /// Replay one seed several times and compare the results
    Verify {
        /// Preset name or scenario file
        #[arg(short, long, default_value = "duel")]
        scenario: String,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Number of runs
        #[arg(short, long, default_value = "3")]
        runs: u32,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout carries JSON results
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let result = match cli.command {
        Commands::Run {
            scenario,
            seed,
            ticks,
        } => cmd_run(&scenario, seed, ticks),
        Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            max_ticks,
        } => cmd_batch(scenario, count, parallel, output, seed, max_ticks),
        Commands::Verify {
            scenario,
            seed,
            runs,
        } => cmd_verify(&scenario, seed, runs),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{message}");
            eprintln!("FATAL: {message}");
            ExitCode::FAILURE
        }
    }
}

/// Play a single game
fn cmd_run(scenario: &str, seed: u64, ticks: Option<u64>) -> Result<(), String> {
    let mut scenario = Scenario::resolve(scenario).map_err(|e| e.to_string())?;
    if let Some(ticks) = ticks {
        scenario.ticks = ticks;
    }
    tracing::info!(scenario = %scenario.name, seed, ticks = scenario.ticks, "Starting game");

    let runner = HeadlessRunner::new(scenario, seed).map_err(|e| e.to_string())?;
    let metrics = runner.run();
    let json = serde_json::to_string_pretty(&metrics).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

/// Run batch of games
fn cmd_batch(
    scenario: String,
    count: u32,
    parallel: u32,
    output: PathBuf,
    seed: u64,
    max_ticks: u64,
) -> Result<(), String> {
    let config = BatchConfig {
        scenario,
        game_count: count,
        parallel_games: parallel,
        output_dir: output.clone(),
        seed_start: seed,
        max_ticks,
    };

    let results = run_batch(config).map_err(|e| e.to_string())?;
    let results_path = output.join("batch.json");
    results
        .save(&results_path)
        .map_err(|e| format!("Failed to save results to {}: {e}", results_path.display()))?;

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Games FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!("\nAverage bases at the end:");
    for (team, bases) in &results.summary.avg_final_bases {
        eprintln!("  {team}: {bases:.2}");
    }
    eprintln!("\nResults saved to: {}", results_path.display());

    let json = serde_json::to_string_pretty(&results.summary).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

/// Check that a seed replays identically
fn cmd_verify(scenario: &str, seed: u64, runs: u32) -> Result<(), String> {
    let scenario = Scenario::resolve(scenario).map_err(|e| e.to_string())?;
    tracing::info!(scenario = %scenario.name, seed, runs, "Verifying determinism");

    if verify_determinism(&scenario, seed, runs).map_err(|e| e.to_string())? {
        eprintln!("Determinism verified over {runs} runs");
        Ok(())
    } else {
        Err(format!("Runs of seed {seed} diverged"))
    }
}
