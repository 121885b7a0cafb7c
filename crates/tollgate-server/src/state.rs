//! Application state shared across handlers.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use tollgate_config::GatewayConfig;
use tollgate_oauth::OAuthClient;

use crate::error::Result;
use crate::proxy::Forwarder;
use crate::session::{SessionStore, derive_key};

/// Application state shared across all handlers. Everything in it is immutable.
#[derive(Clone)]
pub struct AppState {
    /// Validated gateway configuration.
    pub config: Arc<GatewayConfig>,

    /// Provider client (token, userinfo, end-session).
    pub oauth: OAuthClient,

    /// Backend client for the authenticated proxy.
    pub forwarder: Forwarder,

    /// Cookie attributes for the session cookie.
    pub sessions: SessionStore,

    /// Key encrypting the session cookie.
    key: Key,
}

impl AppState {
    /// Build state from an already validated config.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let key = derive_key(&config.session.secret)?;
        let oauth = OAuthClient::new(Arc::new(config.oauth.clone()));
        let forwarder = Forwarder::new(&config.backend.endpoint)?;
        let sessions = SessionStore::new(&config.session);

        Ok(Self {
            config: Arc::new(config),
            oauth,
            forwarder,
            sessions,
            key,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}
