//! Stakepool CLI
//!
//! Runs scenario scripts against the pool engine and evaluates the reward formula.

mod script;
mod settings;

use clap::{Parser, Subcommand};
use settings::{init_logging, CliConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stakepool")]
#[command(version)]
#[command(about = "Staking pool engine simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "stakepool.toml")]
    config: PathBuf,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario script and print each outcome as JSON
    Simulate {
        /// Scenario script (TOML)
        script: PathBuf,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Reward a stake would receive from a pool right now
    Estimate {
        #[arg(long)]
        total_staked: u64,

        #[arg(long)]
        user_staked: u64,

        #[arg(long)]
        total_rewards: u64,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load(&cli.config)?;

    init_logging(cli.verbose, &config.logging);

    match cli.command {
        Commands::Simulate { script, pretty } => {
            let parsed = script::Script::from_file(&script)?;
            tracing::info!(
                script = %script.display(),
                accounts = parsed.accounts.len(),
                steps = parsed.steps.len(),
                "running scenario"
            );

            let report = script::run(&parsed, config.engine)?;
            for outcome in &report.outcomes {
                println!("{}", serde_json::to_string(outcome)?);
            }

            let summary = serde_json::json!({
                "pools": report.pools,
                "balances": report.balances,
                "failures": report.failures(),
            });
            if pretty {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{summary}");
            }
        }

        Commands::Estimate {
            total_staked,
            user_staked,
            total_rewards,
        } => {
            let reward =
                stakepool_core::estimate_rewards(total_staked, user_staked, total_rewards)?;
            println!("{reward}");
        }

        Commands::Version => {
            println!("stakepool {}", env!("CARGO_PKG_VERSION"));
            println!("Staking pool engine simulator");
        }
    }

    Ok(())
}
