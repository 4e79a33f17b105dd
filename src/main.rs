//! Scarlet - cached world minimaps
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use scarlet::cli::args::ConfigAction;
use scarlet::cli::{Cli, Commands};
use scarlet::config::{Config, ConfigManager};
use scarlet::error::ScarletResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ScarletResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // Init must work even when the existing file no longer parses
    let config = match &cli.command {
        Commands::Config(args) if matches!(args.action, Some(ConfigAction::Init { .. })) => {
            Config::default()
        }
        _ => config_manager.load().await?,
    };

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("scarlet=warn"),
        1 => EnvFilter::new("scarlet=info"),
        _ => EnvFilter::new("scarlet=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }

    debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Render(args) => scarlet::cli::commands::render(args, &config).await,
        Commands::Meta(args) => scarlet::cli::commands::meta(args, &config).await,
        Commands::Update(args) => scarlet::cli::commands::update(args, &config).await,
        Commands::Cache(args) => scarlet::cli::commands::cache(args, &config).await,
        Commands::Colors(args) => scarlet::cli::commands::colors(args, &config).await,
        Commands::Config(args) => {
            scarlet::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
