//! Boardroom CLI
//!
//! Runs vote-escrow and fee-distribution scenarios against an in-memory
//! deployment and prints the resulting state.

mod report;
mod scenario;
mod simulation;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::scenario::Scenario;
use crate::simulation::Simulation;

#[derive(Parser)]
#[command(name = "boardroom")]
#[command(version)]
#[command(about = "Vote-escrow fee distribution simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file and print the final state
    Run {
        /// Scenario file (TOML)
        scenario: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print an example scenario
    Example,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { scenario, json } => {
            let scenario = Scenario::load(&scenario)?;
            tracing::info!(steps = scenario.steps.len(), "running scenario");
            let report = Simulation::run(&scenario)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report::print_table(&report);
            }
        }
        Commands::Example => {
            print!("{}", scenario::EXAMPLE);
        }
    }

    Ok(())
}

/// Logs go to stderr so `--json` output stays parseable
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false),
        )
        .init();
}
