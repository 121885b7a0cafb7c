//! Config command - configuration inspection.

use anyhow::Result;
use clap::{Args, Subcommand};
use tollgate_config::LoadedConfig;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration with secrets redacted
    Show,

    /// Show which config file is used and where else was searched
    Path,

    /// Validate the configuration and exit
    Check,
}

/// Run the config command.
pub fn run(
    args: ConfigArgs,
    ctx: &Context,
    loaded: tollgate_config::Result<LoadedConfig>,
) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx, loaded?),
        ConfigCommand::Path => cmd_path(ctx, loaded.ok()),
        ConfigCommand::Check => cmd_check(loaded?),
    }
}

fn cmd_show(ctx: &Context, loaded: LoadedConfig) -> Result<()> {
    println!("# Tollgate Configuration");
    match &loaded.source {
        Some(path) => println!("# Source: {}", path.display()),
        None => println!("# Source: defaults and environment only"),
    }
    if ctx.verbose {
        for var in &loaded.overridden {
            println!("# Overridden by {}", var);
        }
    }
    println!();
    print!("{}", loaded.config.redacted().to_toml()?);

    if !loaded.warnings.is_empty() {
        eprintln!();
        for w in &loaded.warnings {
            eprintln!("⚠ {}", w);
        }
    }
    Ok(())
}

fn cmd_path(ctx: &Context, loaded: Option<LoadedConfig>) -> Result<()> {
    if let Some(path) = &ctx.config_path {
        let status = if path.is_file() { "✓ explicit" } else { "✗ missing" };
        println!("  {} {}", status, path.display());
        return Ok(());
    }

    let used = loaded.and_then(|l| l.source);
    println!("Config file search order (first found wins):\n");
    for path in tollgate_config::config_search_paths() {
        let status = if used.as_ref() == Some(&path) {
            "✓ loaded"
        } else if path.is_file() {
            "· found"
        } else {
            "· not found"
        };
        println!("  {} {}", status, path.display());
    }
    Ok(())
}

fn cmd_check(loaded: LoadedConfig) -> Result<()> {
    match &loaded.source {
        Some(path) => println!("✓ {} is valid", path.display()),
        None => println!("✓ configuration from defaults and environment is valid"),
    }
    for w in &loaded.warnings {
        println!("⚠ {}", w);
    }
    Ok(())
}
