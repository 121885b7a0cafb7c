//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [server]     # listener, base path, CORS
//! [oauth]      # client credentials and provider endpoints
//! [backend]    # protected resource server
//! [session]    # cookie attributes and encryption secret
//! [logging]    # optional JSON log file
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{ConfigError, Result};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "TOLLGATE";

/// Minimum length of the session secret, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Default max body size for proxied requests (10 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

const REDACTED: &str = "<redacted>";

/// Environment variable name for a dotted config field (`oauth.client_id`).
pub fn env_var_for(field: &str) -> String {
    format!("{}_{}", ENV_PREFIX, field.replace('.', "_").to_uppercase())
}

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// Built once at startup and shared read-only by every request handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// OAuth client registration and provider endpoints.
    pub oauth: OAuthConfig,
    /// Protected backend the proxy forwards to.
    pub backend: BackendConfig,
    /// Session cookie settings.
    pub session: SessionConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Copy of this config with every secret replaced by a placeholder.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for secret in [&mut copy.oauth.client_secret, &mut copy.session.secret] {
            if !secret.is_empty() {
                *secret = REDACTED.to_string();
            }
        }
        copy
    }

    /// Check that the config can drive a running gateway.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("oauth.client_id", &self.oauth.client_id),
            ("oauth.client_secret", &self.oauth.client_secret),
            ("oauth.scope", &self.oauth.scope),
            ("oauth.authorization_endpoint", &self.oauth.authorization_endpoint),
            ("oauth.token_endpoint", &self.oauth.token_endpoint),
            ("oauth.userinfo_endpoint", &self.oauth.userinfo_endpoint),
            ("oauth.logout_endpoint", &self.oauth.logout_endpoint),
            ("oauth.redirect_uri", &self.oauth.redirect_uri),
            ("oauth.frontend_redirect", &self.oauth.frontend_redirect),
            ("backend.endpoint", &self.backend.endpoint),
            ("session.cookie_name", &self.session.cookie_name),
            ("session.secret", &self.session.secret),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                    env_var: env_var_for(field),
                });
            }
        }

        let urls = [
            ("oauth.authorization_endpoint", &self.oauth.authorization_endpoint),
            ("oauth.token_endpoint", &self.oauth.token_endpoint),
            ("oauth.userinfo_endpoint", &self.oauth.userinfo_endpoint),
            ("oauth.logout_endpoint", &self.oauth.logout_endpoint),
            ("oauth.redirect_uri", &self.oauth.redirect_uri),
            ("oauth.frontend_redirect", &self.oauth.frontend_redirect),
            ("backend.endpoint", &self.backend.endpoint),
        ];
        for (field, value) in urls {
            Url::parse(value).map_err(|e| invalid(field, e.to_string()))?;
        }

        self.server.validate()?;
        self.session.validate()
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidField {
        field: field.to_string(),
        reason: reason.into(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// Server configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the listener to.
    pub bind_address: SocketAddr,
    /// Prefix for the auth and proxy routes. Empty mounts them at the root.
    pub base_path: String,
    /// Origins allowed to call the gateway with credentials (empty = no CORS layer).
    pub cors_origins: Vec<String>,
    /// Maximum inbound request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 5000)),
            base_path: "/proxy/api".to_string(),
            cors_origins: Vec::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ServerConfig {
    /// Base path normalized to either `""` or `/segment[/segment..]` without a trailing slash.
    pub fn normalized_base_path(&self) -> String {
        let trimmed = self.base_path.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }

    fn validate(&self) -> Result<()> {
        if self.base_path.contains(['{', '}', '*', '?', '#']) {
            return Err(invalid(
                "server.base_path",
                "must be a literal path without wildcards or query",
            ));
        }
        for origin in &self.cors_origins {
            let parsed = Url::parse(origin).map_err(|e| invalid("server.cors_origins", e.to_string()))?;
            if parsed.path() != "/" || origin.ends_with('/') {
                return Err(invalid(
                    "server.cors_origins",
                    format!("'{}' must be a bare origin (scheme://host[:port])", origin),
                ));
            }
        }
        if self.max_body_size == 0 {
            return Err(invalid("server.max_body_size", "must be greater than zero"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OAuth
// ─────────────────────────────────────────────────────────────────────────────

/// OAuth client configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Space-separated scopes requested at login.
    pub scope: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    /// End-session endpoint, receives `id_token_hint` on logout.
    pub logout_endpoint: String,
    /// This gateway's callback URL as registered with the provider.
    pub redirect_uri: String,
    /// Where the browser lands after the callback.
    pub frontend_redirect: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            scope: "openid profile email".to_string(),
            authorization_endpoint: String::new(),
            token_endpoint: String::new(),
            userinfo_endpoint: String::new(),
            logout_endpoint: String::new(),
            redirect_uri: String::new(),
            frontend_redirect: String::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────────────────

/// Backend configuration section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL every proxied subpath is appended to.
    pub endpoint: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// `SameSite` attribute of the session cookie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    #[default]
    Strict,
    Lax,
    None,
}

impl std::str::FromStr for SameSitePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "none" => Ok(Self::None),
            other => Err(format!("expected strict, lax or none, got '{}'", other)),
        }
    }
}

/// Session cookie configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub path: String,
    pub http_only: bool,
    /// Only send the cookie over HTTPS. Disable for local development only.
    pub secure: bool,
    pub same_site: SameSitePolicy,
    /// Secret the cookie encryption key is derived from.
    pub secret: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "__Host-tollgate".to_string(),
            path: "/".to_string(),
            http_only: true,
            secure: true,
            same_site: SameSitePolicy::Strict,
            secret: String::new(),
        }
    }
}

impl SessionConfig {
    fn validate(&self) -> Result<()> {
        if self.secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(invalid(
                "session.secret",
                format!("must be at least {} bytes long", MIN_SESSION_SECRET_LEN),
            ));
        }
        if !self.path.starts_with('/') {
            return Err(invalid("session.path", "must start with '/'"));
        }
        if self.same_site == SameSitePolicy::None && !self.secure {
            return Err(invalid(
                "session.same_site",
                "'none' requires session.secure = true",
            ));
        }
        if self.cookie_name.starts_with("__Host-") && (!self.secure || self.path != "/") {
            return Err(invalid(
                "session.cookie_name",
                "the __Host- prefix requires secure = true and path = \"/\"",
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily-rotated JSON log files. `None` logs to the console only.
    pub directory: Option<PathBuf>,
    /// Filter directive for the console layer, used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
