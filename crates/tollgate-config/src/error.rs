//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize config.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Missing required field.
    #[error("missing required field '{field}' (set it in the config file or via {env_var})")]
    MissingField { field: String, env_var: String },

    /// A field is present but unusable.
    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// An environment override could not be parsed.
    #[error("invalid value in environment variable {var}: {reason}")]
    InvalidEnv { var: String, reason: String },
}
