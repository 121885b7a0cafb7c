//! CLI command handlers.

pub mod config;
pub mod serve;

use std::path::PathBuf;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Config file given on the command line or via `TOLLGATE_CONFIG`.
    pub config_path: Option<PathBuf>,
    /// Verbose output enabled.
    pub verbose: bool,
}
