//! Tollgate - session-backed OAuth2 PKCE gateway for browser frontends
//!
//! Main entry point for the Tollgate CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tollgate_config::LoggingConfig;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

mod commands;

use commands::{config, serve};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Tollgate - session-backed OAuth2 PKCE gateway for browser frontends
#[derive(Parser)]
#[command(name = "tollgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: search the user config dir, then ./tollgate.toml)
    #[arg(short, long, global = true, env = "TOLLGATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the gateway
    Serve(serve::ServeArgs),

    /// Configuration inspection
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = tollgate_config::load_config(cli.config.as_deref());
    let logging = loaded
        .as_ref()
        .map(|l| l.config.logging.clone())
        .unwrap_or_default();
    let _guard = init_tracing(cli.verbose, &logging);

    if let Ok(loaded) = &loaded {
        match &loaded.source {
            Some(path) => info!(path = %path.display(), "Loaded config file"),
            None => info!("No config file found; using defaults and environment"),
        }
        for var in &loaded.overridden {
            info!(var = %var, "Config value overridden from environment");
        }
        for warning in &loaded.warnings {
            warn!("{}", warning);
        }
    }

    let ctx = commands::Context {
        config_path: cli.config,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Serve(args) => serve::run(args, &ctx, loaded?).await,
        Commands::Config(args) => config::run(args, &ctx, loaded),
    }
}

/// Console layer plus, when a log directory is configured, a daily-rotated JSON file layer.
///
/// The returned guard must stay alive for the file writer to flush.
fn init_tracing(verbose: bool, logging: &LoggingConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let default_filter = if verbose {
        "tollgate=debug,tollgate_server=debug,tollgate_oauth=debug,tollgate_config=debug,tower_http=debug,info"
    } else {
        "tollgate=info,tollgate_server=info,tollgate_oauth=info,tollgate_config=info,warn"
    };

    let console_filter = if verbose {
        EnvFilter::new(default_filter)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(logging.filter.as_deref().unwrap_or(default_filter))
        })
    };

    let (file_layer, guard) = match &logging.directory {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "tollgate.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(
                    "tollgate=debug,tollgate_server=debug,tollgate_oauth=debug,tollgate_config=debug,tower_http=debug,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    guard
}
