//! tiercache - offline-first tiered content cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tiercache::cli::args::{ConfigAction, ConfigArgs};
use tiercache::cli::{Cli, Commands};
use tiercache::config::{Config, ConfigManager};
use tiercache::error::TierResult;
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

async fn run() -> TierResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // Path and init don't need config loading
    let config = match &cli.command {
        Commands::Config(ConfigArgs {
            action: Some(ConfigAction::Path | ConfigAction::Init { .. }),
        }) => Config::default(),
        _ => config_manager.load().await?,
    };

    init_logging(cli.verbose, &config.general.log_format);
    debug!("Using config {}", config_manager.path().display());

    ConfigManager::ensure_state_dirs().await?;

    match cli.command {
        Commands::Resolve(args) => tiercache::cli::commands::resolve(args, &config).await,
        Commands::Stats(args) => tiercache::cli::commands::stats(args, &config).await,
        Commands::Vocab(args) => tiercache::cli::commands::vocab(args, &config).await,
        Commands::Progress(args) => tiercache::cli::commands::progress(args, &config).await,
        Commands::History(args) => tiercache::cli::commands::history(args, &config).await,
        Commands::Clear(args) => tiercache::cli::commands::clear(args, &config).await,
        Commands::Config(args) => {
            tiercache::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `json` switches to structured lines
fn init_logging(verbose: u8, format: &str) {
    let filter = match verbose {
        0 => EnvFilter::new("tiercache=warn"),
        1 => EnvFilter::new("tiercache=info"),
        _ => EnvFilter::new("tiercache=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
