//! Config file discovery, environment overrides and validation.
//!
//! Resolution order (later overrides earlier):
//! 1. Built-in defaults
//! 2. The first config file found: explicit path, `$TOLLGATE_CONFIG_DIR/config.toml`,
//!    `~/.config/tollgate/config.toml`, `./tollgate.toml`
//! 3. `TOLLGATE_<SECTION>_<FIELD>` environment variables

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::types::env_var_for;
use crate::{ConfigError, GatewayConfig, Result, SameSitePolicy};

/// Default config filename for the working directory.
const PROJECT_CONFIG_FILE: &str = "tollgate.toml";

/// Default config filename within the XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "tollgate";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "TOLLGATE_CONFIG_DIR";

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The validated configuration.
    pub config: GatewayConfig,
    /// File the config was read from, if any.
    pub source: Option<PathBuf>,
    /// Environment variables that overrode file values.
    pub overridden: Vec<String>,
    /// Warnings generated during loading (e.g., secrets stored in the file).
    pub warnings: Vec<String>,
}

/// Load, override from the process environment, and validate.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_env(explicit, |name| std::env::var(name).ok())
}

/// Same as [`load_config`] with a pluggable environment lookup.
pub fn load_config_with_env<F>(explicit: Option<&Path>, lookup: F) -> Result<LoadedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut warnings = Vec::new();

    let source = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config_file(&lookup),
    };

    let mut config = match &source {
        Some(path) => {
            let config = load_config_file(path)?;
            check_plaintext_secrets(&config, &mut warnings);
            config
        }
        None => GatewayConfig::default(),
    };

    let overridden = apply_env_overrides(&mut config, &lookup)?;
    config.validate()?;

    Ok(LoadedConfig {
        config,
        source,
        overridden,
        warnings,
    })
}

/// Load config from a specific file path (no discovery, no validation).
pub fn load_config_file(path: &Path) -> Result<GatewayConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    GatewayConfig::from_toml(&contents)
}

/// Default config file locations, in the order they are tried.
pub fn config_search_paths() -> Vec<PathBuf> {
    config_search_paths_with_env(|name| std::env::var(name).ok())
}

/// Same as [`config_search_paths`] with a pluggable environment lookup.
pub fn config_search_paths_with_env<F>(lookup: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    xdg_config_dir_with_env(lookup)
        .map(|d| d.join(USER_CONFIG_FILE))
        .into_iter()
        .chain(std::iter::once(PathBuf::from(PROJECT_CONFIG_FILE)))
        .collect()
}

/// First existing config file among the default locations.
fn discover_config_file<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    config_search_paths_with_env(lookup)
        .into_iter()
        .find(|p| p.is_file())
}

/// Get the XDG config file path for tollgate.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Get the XDG config directory for tollgate.
///
/// Checks `TOLLGATE_CONFIG_DIR` env var first, then falls back to platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    xdg_config_dir_with_env(|name| std::env::var(name).ok())
}

/// Same as [`xdg_config_dir`] with a pluggable environment lookup.
pub fn xdg_config_dir_with_env<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Apply `TOLLGATE_*` overrides, returning the names of the variables that were set.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<Vec<String>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = Vec::new();

    let strings: [(&str, &mut String); 14] = [
        ("server.base_path", &mut config.server.base_path),
        ("oauth.client_id", &mut config.oauth.client_id),
        ("oauth.client_secret", &mut config.oauth.client_secret),
        ("oauth.scope", &mut config.oauth.scope),
        ("oauth.authorization_endpoint", &mut config.oauth.authorization_endpoint),
        ("oauth.token_endpoint", &mut config.oauth.token_endpoint),
        ("oauth.userinfo_endpoint", &mut config.oauth.userinfo_endpoint),
        ("oauth.logout_endpoint", &mut config.oauth.logout_endpoint),
        ("oauth.redirect_uri", &mut config.oauth.redirect_uri),
        ("oauth.frontend_redirect", &mut config.oauth.frontend_redirect),
        ("backend.endpoint", &mut config.backend.endpoint),
        ("session.cookie_name", &mut config.session.cookie_name),
        ("session.path", &mut config.session.path),
        ("session.secret", &mut config.session.secret),
    ];
    for (field, slot) in strings {
        let var = env_var_for(field);
        if let Some(value) = lookup(&var) {
            *slot = value;
            applied.push(var);
        }
    }

    let var = env_var_for("server.bind_address");
    if let Some(value) = lookup(&var) {
        config.server.bind_address = value
            .parse::<SocketAddr>()
            .map_err(|e| invalid_env(&var, e.to_string()))?;
        applied.push(var);
    }

    let var = env_var_for("server.cors_origins");
    if let Some(value) = lookup(&var) {
        config.server.cors_origins = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        applied.push(var);
    }

    let var = env_var_for("server.max_body_size");
    if let Some(value) = lookup(&var) {
        config.server.max_body_size = value
            .parse()
            .map_err(|e: std::num::ParseIntError| invalid_env(&var, e.to_string()))?;
        applied.push(var);
    }

    for (field, slot) in [
        ("session.http_only", &mut config.session.http_only),
        ("session.secure", &mut config.session.secure),
    ] {
        let var = env_var_for(field);
        if let Some(value) = lookup(&var) {
            *slot = parse_bool(&value).ok_or_else(|| invalid_env(&var, "expected true or false"))?;
            applied.push(var);
        }
    }

    let var = env_var_for("session.same_site");
    if let Some(value) = lookup(&var) {
        config.session.same_site = value
            .parse::<SameSitePolicy>()
            .map_err(|e| invalid_env(&var, e))?;
        applied.push(var);
    }

    let var = env_var_for("logging.directory");
    if let Some(value) = lookup(&var) {
        config.logging.directory = Some(PathBuf::from(value));
        applied.push(var);
    }

    let var = env_var_for("logging.filter");
    if let Some(value) = lookup(&var) {
        config.logging.filter = Some(value);
        applied.push(var);
    }

    Ok(applied)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid_env(var: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidEnv {
        var: var.to_string(),
        reason: reason.into(),
    }
}

/// Warn about secrets stored in the config file itself.
fn check_plaintext_secrets(config: &GatewayConfig, warnings: &mut Vec<String>) {
    for (field, value) in [
        ("oauth.client_secret", &config.oauth.client_secret),
        ("session.secret", &config.session.secret),
    ] {
        if !value.is_empty() {
            warnings.push(format!(
                "[{}] is stored in plaintext in the config file. \
                 Consider setting {} in the environment instead.",
                field,
                env_var_for(field)
            ));
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
