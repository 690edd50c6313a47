//! treecache - Path-addressed file cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use treecache::cli::{Cli, Commands};
use treecache::config::ConfigManager;
use treecache::error::TreeCacheResult;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> TreeCacheResult<ExitCode> {
    let cli = Cli::parse();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("treecache=warn"),
        1 => EnvFilter::new("treecache=info"),
        _ => EnvFilter::new("treecache=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .without_time()
            .init();
    }

    debug!("Using config {}", config_manager.path().display());

    // Dispatch to command
    let outcome = match cli.command {
        Commands::Init => treecache::cli::commands::init(&config).await,
        Commands::Write(args) => treecache::cli::commands::write(args, &config).await,
        Commands::Read(args) => treecache::cli::commands::read(args, &config).await,
        Commands::Exists(args) => {
            let cached = treecache::cli::commands::exists(args, &config).await?;
            return Ok(if cached {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        Commands::Purge => treecache::cli::commands::purge(&config).await,
        Commands::Status(args) => treecache::cli::commands::status(args, &config).await,
        Commands::Config(args) => {
            treecache::cli::commands::config(args, &config, &config_manager).await
        }
    };

    outcome.map(|()| ExitCode::SUCCESS)
}
