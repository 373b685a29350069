//! Kolosal OpenML - Main Entry Point
//!
//! Runs OpenML tasks against their predefined cross-validation splits.

use clap::Parser;
use kolosal_openml::cli::{cmd_info, cmd_run, Cli, Commands, RunOptions};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kolosal_openml=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            task,
            dataset,
            splits,
            config,
            registry,
            output,
            repeats,
            full_model,
        } => {
            cmd_run(&RunOptions {
                task,
                dataset,
                splits,
                config,
                registry,
                output,
                repeats,
                full_model,
            })?;
        }
        Commands::Info { splits, task } => {
            cmd_info(&splits, task.as_deref())?;
        }
    }

    Ok(())
}
