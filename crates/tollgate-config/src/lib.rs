//! Configuration system for the Tollgate gateway.
//!
//! Provides TOML-based configuration with:
//! - One immutable [`GatewayConfig`] built at startup and shared by reference
//! - Config file discovery (explicit path, XDG user config, working directory)
//! - `TOLLGATE_<SECTION>_<FIELD>` environment overrides, typically for secrets
//! - Validation of required fields, endpoint URLs and cookie attributes

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    LoadedConfig, apply_env_overrides, config_search_paths, config_search_paths_with_env,
    load_config, load_config_file, load_config_with_env, xdg_config_dir, xdg_config_dir_with_env,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
