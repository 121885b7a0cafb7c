//! The token set issued by the identity provider.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Access/refresh/id token bundle for one authenticated browser session.
///
/// Fields the gateway does not interpret (`expires_in`, `token_type`, `scope`,
/// `session_state`, ...) are kept verbatim in `extra`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenSet {
    /// Token set carrying only an access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            id_token: None,
            extra: Map::new(),
        }
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn with_id_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = Some(token.into());
        self
    }

    /// Refresh token, if present and non-empty.
    pub fn usable_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Build the successor of `previous` from a refresh response.
    ///
    /// Providers may omit `refresh_token` (no rotation) and `id_token` on refresh;
    /// the previous values carry over so logout and the next refresh keep working.
    pub fn succeeding(mut self, previous: &TokenSet) -> Self {
        if self.usable_refresh_token().is_none() {
            self.refresh_token = previous.refresh_token.clone();
        }
        if self.id_token.as_deref().is_none_or(str::is_empty) {
            self.id_token = previous.id_token.clone();
        }
        self
    }

    /// Bearer header value for the access token.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |t: &Option<String>| t.as_ref().map(|_| "<redacted>");
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &mask(&self.refresh_token))
            .field("id_token", &mask(&self.id_token))
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_unknown_fields() {
        let tokens: TokenSet = serde_json::from_str(
            r#"{"access_token":"at","refresh_token":"rt","id_token":"it",
                "expires_in":300,"token_type":"Bearer","session_state":"abc"}"#,
        )
        .unwrap();

        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
        assert_eq!(tokens.extra["expires_in"], 300);
        assert_eq!(tokens.extra["session_state"], "abc");

        let back = serde_json::to_value(&tokens).unwrap();
        assert_eq!(back["token_type"], "Bearer");
        assert_eq!(back["id_token"], "it");
    }

    #[test]
    fn test_minimal_token_set() {
        let tokens: TokenSet = serde_json::from_str(r#"{"access_token":"tok","id_token":"id"}"#).unwrap();
        assert!(tokens.refresh_token.is_none());
        assert!(tokens.usable_refresh_token().is_none());
        assert_eq!(tokens.bearer(), "Bearer tok");
    }

    #[test]
    fn test_missing_access_token_is_rejected() {
        assert!(serde_json::from_str::<TokenSet>(r#"{"refresh_token":"rt"}"#).is_err());
    }

    #[test]
    fn test_empty_refresh_token_is_unusable() {
        let tokens = TokenSet::new("at").with_refresh_token("");
        assert!(tokens.usable_refresh_token().is_none());
    }

    #[test]
    fn test_succeeding_carries_missing_tokens() {
        let previous = TokenSet::new("old").with_refresh_token("rt-1").with_id_token("id-1");
        let next = TokenSet::new("new").succeeding(&previous);
        assert_eq!(next.access_token, "new");
        assert_eq!(next.refresh_token.as_deref(), Some("rt-1"));
        assert_eq!(next.id_token.as_deref(), Some("id-1"));

        let rotated = TokenSet::new("new")
            .with_refresh_token("rt-2")
            .succeeding(&previous);
        assert_eq!(rotated.refresh_token.as_deref(), Some("rt-2"));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let tokens = TokenSet::new("secret-access").with_refresh_token("secret-refresh");
        let debug = format!("{:?}", tokens);
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
    }
}
