//! Headless mech battle runner.
//!
//! Runs battles without a front end for balance checks and CI.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in skirmish and print the report as JSON
//! cargo run -p mech_headless -- run --seed 7
//!
//! # Run a scenario file
//! cargo run -p mech_headless -- run --scenario crates/mech_headless/scenarios/ridge_skirmish.ron
//!
//! # Run a batch of seeds in parallel
//! cargo run -p mech_headless -- batch --count 1000 --output results/
//!
//! # Check that a seed replays identically
//! cargo run -p mech_headless -- verify --seed 42 --runs 5
//! ```
//!
//! Reports go to stdout, logs to stderr. `RUST_LOG` overrides the log level.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mech_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::BattleRunner,
    scenario::{Scenario, ScenarioError},
};

#[derive(Parser)]
#[command(name = "mech_headless")]
#[command(about = "Headless mech battle runner for balance testing and CI")]
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
    /// Run a single battle
    Run {
        /// Scenario file to load (built-in skirmish if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Override the scenario's round limit
        #[arg(long)]
        max_rounds: Option<u32>,

        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,
    },

    /// Run a batch of battles for balance testing
    Batch {
        /// Scenario file to load (built-in skirmish if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of battles to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel battles (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Verify that a seed replays identically
    Verify {
        /// Scenario file to load (built-in skirmish if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Number of replays
        #[arg(long, default_value = "3")]
        runs: u32,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries reports
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            seed,
            max_rounds,
            pretty,
        } => cmd_run(scenario.as_deref(), seed, max_rounds, pretty),
        Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
        } => cmd_batch(scenario.as_deref(), count, parallel, &output, seed),
        Commands::Verify {
            scenario,
            seed,
            runs,
        } => cmd_verify(scenario.as_deref(), seed, runs),
    }
}

fn load_scenario(path: Option<&Path>) -> Result<Scenario, ScenarioError> {
    match path {
        Some(path) => {
            let scenario = Scenario::load(path)?;
            tracing::info!("Loaded scenario: {}", scenario.name);
            Ok(scenario)
        }
        None => Ok(Scenario::skirmish_2v2()),
    }
}

/// Run a single battle and print its report
fn cmd_run(scenario: Option<&Path>, seed: u64, max_rounds: Option<u32>, pretty: bool) -> ExitCode {
    let scenario = match load_scenario(scenario) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut runner = BattleRunner::new(&scenario, seed);
    if let Some(limit) = max_rounds {
        runner = runner.with_max_rounds(limit);
    }

    let report = match runner.run() {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Battle failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let json = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    match json {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Failed to encode report: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run a batch of battles and save the results
fn cmd_batch(
    scenario: Option<&Path>,
    count: u32,
    parallel: u32,
    output: &Path,
    seed: u64,
) -> ExitCode {
    let scenario = match load_scenario(scenario) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = BatchConfig::new(count)
        .with_seed(seed)
        .with_parallel(parallel);
    let results = run_batch(&scenario, config);

    println!("\n=== Batch Results: {} ===", results.scenario);
    println!("Battles: {}", results.games.len());
    for (team, wins) in &results.summary.wins {
        println!(
            "Team {}: {} wins ({:.1}%)",
            team,
            wins,
            results.summary.win_rate(*team) * 100.0
        );
    }
    println!("Draws: {}", results.summary.draws);
    println!("Average rounds: {:.1}", results.summary.average_rounds);
    println!("Average damage: {:.1}", results.summary.average_damage);
    if !results.errors.is_empty() {
        println!("Errors: {}", results.errors.len());
    }

    let path = output.join("batch.json");
    if let Err(e) = results.save(&path) {
        tracing::error!("Failed to save results to {:?}: {}", path, e);
        return ExitCode::FAILURE;
    }
    tracing::info!("Results saved to {:?}", path);

    if results.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Replay one seed several times and compare event hashes
fn cmd_verify(scenario: Option<&Path>, seed: u64, runs: u32) -> ExitCode {
    let scenario = match load_scenario(scenario) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let check = verify_determinism(&scenario, seed, runs);
    if check.is_deterministic {
        println!("PASS: {runs} runs of seed {seed} produced identical event streams");
        ExitCode::SUCCESS
    } else {
        println!("FAIL: seed {seed} diverged: {:?}", check.hashes);
        ExitCode::FAILURE
    }
}
