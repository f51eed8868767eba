// ABOUTME: Entry point for the slipway CLI application.
// ABOUTME: Parses arguments, sets up logging and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use slipway::config;
use slipway::deploy::{CancelFlag, DeployOptions};
use slipway::error::Result;
use slipway::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins unless --verbose asks for everything
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    if let Err(e) = run(cli, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let output = Output::new(mode);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init {
            repo,
            install_dir,
            force,
        } => {
            let cwd = env::current_dir()?;
            let path = config::init_config(&cwd, repo.as_deref(), install_dir.as_deref(), force)?;
            output.success(&format!("Created {}", path.display()));
            Ok(())
        }
        Commands::Deploy {
            target,
            keep_releases,
            skip_migrations,
            auto_cleanup,
            force,
            yes,
            break_lock,
        } => {
            let config =
                commands::load_config(config_path, target.overrides(keep_releases), true)?;
            let options = DeployOptions {
                force,
                auto_cleanup,
                skip_migrations,
                assume_yes: yes,
                break_lock,
            };

            let cancel = CancelFlag::new();
            let handle = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, stopping at the next stage boundary");
                    handle.cancel();
                }
            });

            commands::deploy(config, options, output, cancel).await
        }
        Commands::Rollback { target, break_lock } => {
            let config = commands::load_config(config_path, target.overrides(None), false)?;
            commands::rollback(config, break_lock, output)
        }
        Commands::Releases { target } => {
            let config = commands::load_config(config_path, target.overrides(None), false)?;
            commands::releases(config, output)
        }
        Commands::Cleanup {
            target,
            keep_releases,
            break_lock,
        } => {
            let config =
                commands::load_config(config_path, target.overrides(keep_releases), false)?;
            commands::cleanup(config, break_lock, output)
        }
        Commands::Status { target } => {
            let config = commands::load_config(config_path, target.overrides(None), false)?;
            commands::status(config, output)
        }
    }
}
