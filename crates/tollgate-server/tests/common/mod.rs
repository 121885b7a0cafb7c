//! Common test utilities for integration tests.

#![allow(dead_code)]

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    extract::FromRef,
    http::{HeaderMap, HeaderValue, Request, Response, header},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Key, PrivateCookieJar};
use tollgate_config::{GatewayConfig, SameSitePolicy, SessionConfig};
use tollgate_server::{AppState, Server, Session};
use tower::ServiceExt;
use wiremock::MockServer;

pub const COOKIE_NAME: &str = "test-session";
pub const FRONTEND: &str = "http://frontend.test";
pub const BASE: &str = "/proxy/api";

/// A gateway router wired to mock provider and backend servers.
pub struct TestGateway {
    /// Stands in for the identity provider (token, userinfo, logout endpoints).
    pub provider: MockServer,
    /// Stands in for the protected backend, mounted at `/api`.
    pub backend: MockServer,
    pub state: AppState,
    router: Router,
}

impl TestGateway {
    /// Start a gateway with the default test configuration.
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start a gateway, letting the caller adjust the config first.
    pub async fn start_with(adjust: impl FnOnce(&mut GatewayConfig)) -> Self {
        let provider = MockServer::start().await;
        let backend = MockServer::start().await;

        let mut config = test_config(&provider.uri(), &backend.uri());
        adjust(&mut config);
        config.validate().expect("test config should validate");

        let state = AppState::new(config).expect("failed to build state");
        let router = Server::from_state(state.clone()).router();

        Self {
            provider,
            backend,
            state,
            router,
        }
    }

    /// Drive one request through the router.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Body>> {
        Ok(self.router.clone().oneshot(request).await?)
    }

    /// GET `{base}{path}`, optionally carrying a session cookie.
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Result<Response<Body>> {
        let mut builder = Request::builder().uri(format!("{}{}", BASE, path));
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty())?).await
    }

    /// Request `Cookie` header value carrying `session`, every chunk included.
    pub fn cookie_for(&self, session: &Session) -> String {
        let jar = self
            .state
            .sessions
            .save(PrivateCookieJar::new(self.key()), session)
            .expect("session fits in cookies");
        let response = (jar, ()).into_response();
        session_pairs(&response).join("; ")
    }

    /// Decode the session a response wrote, if it wrote one.
    pub fn session_from(&self, response: &Response<Body>) -> Option<Session> {
        session_set_cookie(response).filter(|c| !c.contains("Max-Age=0"))?;
        let cookie = session_pairs(response).join("; ");
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(&cookie).ok()?);
        let jar = PrivateCookieJar::from_headers(&headers, self.key());
        Some(self.state.sessions.load(&jar))
    }

    fn key(&self) -> Key {
        Key::from_ref(&self.state)
    }
}

/// Gateway config pointing at the given provider and backend base URLs.
pub fn test_config(provider: &str, backend: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.server.cors_origins = vec![FRONTEND.to_string()];

    config.oauth.client_id = "client-id".to_string();
    config.oauth.client_secret = "client-secret".to_string();
    config.oauth.authorization_endpoint = format!("{}/authorize", provider);
    config.oauth.token_endpoint = format!("{}/token", provider);
    config.oauth.userinfo_endpoint = format!("{}/userinfo", provider);
    config.oauth.logout_endpoint = format!("{}/logout", provider);
    config.oauth.redirect_uri = "http://gateway.test/proxy/api/auth/callback".to_string();
    config.oauth.frontend_redirect = FRONTEND.to_string();

    config.backend.endpoint = format!("{}/api", backend);

    config.session = SessionConfig {
        cookie_name: COOKIE_NAME.to_string(),
        secure: false,
        same_site: SameSitePolicy::Lax,
        secret: "0123456789abcdef0123456789abcdef".to_string(),
        ..SessionConfig::default()
    };
    config
}

/// The session cookie's `Set-Cookie` header, if the response carries one.
pub fn session_set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{}=", COOKIE_NAME)))
        .map(str::to_string)
}

/// Whether the response deletes the session cookie.
pub fn clears_session(response: &Response<Body>) -> bool {
    session_set_cookie(response)
        .map(|c| c.starts_with(&format!("{}=;", COOKIE_NAME)) && c.contains("Max-Age=0"))
        .unwrap_or(false)
}

/// Base URL of a local port nothing listens on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}

/// Read a response body as JSON.
pub async fn json_body(response: Response<Body>) -> Result<serde_json::Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// `name=value` pairs of every session chunk the response sets, removals excluded.
fn session_pairs(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|c| c.starts_with(COOKIE_NAME) && !c.contains("Max-Age=0"))
        .map(cookie_pair)
        .collect()
}

fn cookie_pair(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .unwrap_or_default()
        .to_string()
}
