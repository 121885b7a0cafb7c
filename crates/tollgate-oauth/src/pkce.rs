//! PKCE verifier/challenge generation and the authorization URL.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{OAuthError, Result};
use tollgate_config::OAuthConfig;

/// Random bytes behind a code verifier (86 base64url chars, inside RFC 7636's 43..=128).
const VERIFIER_BYTES: usize = 64;

/// Random bytes behind a CSRF state value.
const STATE_BYTES: usize = 32;

/// The only challenge method this client emits.
pub const CHALLENGE_METHOD: &str = "S256";

/// PKCE code verifier and challenge pair.
#[derive(Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge pair.
    pub fn generate() -> Self {
        let mut verifier_bytes = [0u8; VERIFIER_BYTES];
        rand::rng().fill_bytes(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);
        let challenge = challenge_for(&verifier);

        Self {
            verifier,
            challenge,
        }
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// S256 challenge for a verifier: `BASE64URL(SHA256(verifier))`.
pub fn challenge_for(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Generate a random state string for CSRF protection.
pub fn generate_state() -> String {
    let mut state_bytes = [0u8; STATE_BYTES];
    rand::rng().fill_bytes(&mut state_bytes);
    URL_SAFE_NO_PAD.encode(state_bytes)
}

/// Build the authorization URL for the OAuth flow.
///
/// Parameters are appended to whatever query the configured endpoint already carries.
pub fn build_authorization_url(config: &OAuthConfig, challenge: &str, state: &str) -> Result<String> {
    let mut url = Url::parse(&config.authorization_endpoint).map_err(|e| {
        OAuthError::Config(format!("Invalid authorization endpoint: {}", e))
    })?;

    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", &config.scope)
        .append_pair("state", state)
        .append_pair("code_challenge", challenge)
        .append_pair("code_challenge_method", CHALLENGE_METHOD);

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config() -> OAuthConfig {
        OAuthConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            scope: "openid profile".to_string(),
            authorization_endpoint: "http://auth.test/authorize".to_string(),
            token_endpoint: "http://auth.test/token".to_string(),
            userinfo_endpoint: "http://auth.test/userinfo".to_string(),
            logout_endpoint: "http://auth.test/logout".to_string(),
            redirect_uri: "http://app.test/proxy/api/auth/callback".to_string(),
            frontend_redirect: "http://frontend.test".to_string(),
        }
    }

    #[test]
    fn test_pkce_generation() {
        let pkce = PkceChallenge::generate();
        assert_eq!(pkce.verifier.len(), 86);
        assert!(pkce
            .verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(pkce.challenge, challenge_for(&pkce.verifier));
        assert_ne!(pkce.verifier, pkce.challenge);
    }

    #[test]
    fn test_challenge_matches_rfc7636_vector() {
        // Appendix B of RFC 7636.
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            challenge_for(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_state_generation() {
        let state1 = generate_state();
        let state2 = generate_state();
        assert_eq!(state1.len(), 43);
        assert_ne!(state1, state2);
    }

    #[test]
    fn test_debug_hides_verifier() {
        let pkce = PkceChallenge::generate();
        let debug = format!("{:?}", pkce);
        assert!(!debug.contains(&pkce.verifier));
    }

    #[test]
    fn test_authorization_url() {
        let url = build_authorization_url(&config(), "test_challenge", "test_state").unwrap();
        assert!(url.starts_with("http://auth.test/authorize?"));

        let parsed = Url::parse(&url).unwrap();
        let params: HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "client-id");
        assert_eq!(params["redirect_uri"], "http://app.test/proxy/api/auth/callback");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], "openid profile");
        assert_eq!(params["state"], "test_state");
        assert_eq!(params["code_challenge"], "test_challenge");
        assert_eq!(params["code_challenge_method"], "S256");
    }

    #[test]
    fn test_authorization_url_keeps_existing_query() {
        let mut config = config();
        config.authorization_endpoint = "http://auth.test/authorize?kc_idp_hint=corp".to_string();
        let url = build_authorization_url(&config, "c", "s").unwrap();
        assert!(url.starts_with("http://auth.test/authorize?kc_idp_hint=corp&client_id="));
    }

    #[test]
    fn test_authorization_url_rejects_bad_endpoint() {
        let mut config = config();
        config.authorization_endpoint = "::nope::".to_string();
        assert!(matches!(
            build_authorization_url(&config, "c", "s"),
            Err(OAuthError::Config(_))
        ));
    }
}
