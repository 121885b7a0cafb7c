//! HTTP client for the identity provider's token, userinfo and end-session endpoints.

use std::sync::Arc;

use reqwest::{Client, StatusCode, header};
use tollgate_config::OAuthConfig;
use tracing::{debug, warn};

use crate::error::{OAuthError, Result};
use crate::pkce::{PkceChallenge, build_authorization_url, generate_state};
use crate::tokens::TokenSet;

/// A freshly started login: where to send the browser and what to remember.
#[derive(Debug, Clone)]
pub struct LoginStart {
    pub authorization_url: String,
    pub state: String,
    pub pkce: PkceChallenge,
}

/// Raw userinfo answer, relayed to the browser as-is.
#[derive(Debug, Clone)]
pub struct UserInfoResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl UserInfoResponse {
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK
    }
}

/// Confidential OAuth client bound to one provider registration.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: Client,
    config: Arc<OAuthConfig>,
}

impl OAuthClient {
    pub fn new(config: Arc<OAuthConfig>) -> Self {
        Self::with_http_client(config, Client::new())
    }

    pub fn with_http_client(config: Arc<OAuthConfig>, http: Client) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Generate state + PKCE pair and the matching authorization URL.
    pub fn start_login(&self) -> Result<LoginStart> {
        let pkce = PkceChallenge::generate();
        let state = generate_state();
        let authorization_url = build_authorization_url(&self.config, &pkce.challenge, &state)?;
        Ok(LoginStart {
            authorization_url,
            state,
            pkce,
        })
    }

    /// Exchange an authorization code for a token set.
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenSet> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code_verifier", code_verifier),
        ];
        self.token_request(&form, "Token exchange").await
    }

    /// Redeem a refresh token for a new token set.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        self.token_request(&form, "Token refresh").await
    }

    async fn token_request(&self, form: &[(&str, &str)], what: &str) -> Result<TokenSet> {
        let response = self
            .http
            .post(&self.config.token_endpoint)
            .header(header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(|e| OAuthError::Network(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(status = status.as_u16(), "{} rejected by provider", what);
            return Err(OAuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let tokens: TokenSet = response.json().await.map_err(|e| {
            OAuthError::InvalidResponse(format!("Failed to parse {} response: {}", what, e))
        })?;
        debug!(
            has_refresh_token = tokens.refresh_token.is_some(),
            has_id_token = tokens.id_token.is_some(),
            "{} succeeded",
            what
        );
        Ok(tokens)
    }

    /// Call the userinfo endpoint with a bearer token.
    pub async fn userinfo(&self, access_token: &str) -> Result<UserInfoResponse> {
        let response = self
            .http
            .get(&self.config.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::Network(format!("Userinfo request failed: {}", e)))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| OAuthError::Network(format!("Failed to read userinfo response: {}", e)))?;

        Ok(UserInfoResponse {
            status,
            content_type,
            body: body.to_vec(),
        })
    }

    /// End the provider-side session. Returns the provider's status code.
    pub async fn end_session(&self, id_token: &str) -> Result<StatusCode> {
        let response = self
            .http
            .post(&self.config.logout_endpoint)
            .form(&[("id_token_hint", id_token)])
            .send()
            .await
            .map_err(|e| OAuthError::Network(format!("Logout request failed: {}", e)))?;
        Ok(response.status())
    }
}
