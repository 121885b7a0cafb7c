//! Error types for the OAuth client.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur while talking to the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// The provider could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with a non-success status.
    #[error("Provider rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The provider answered 2xx with a body we could not use.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// Client-side configuration problem.
    #[error("Config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        OAuthError::Network(e.to_string())
    }
}
