//! HTTP gateway for Tollgate.
//!
//! Performs the browser-facing OAuth 2.0 Authorization Code + PKCE handshake, keeps the
//! resulting tokens in an encrypted httponly cookie, and proxies API calls to the backend
//! with the session's bearer token attached.
//!
//! # Example
//!
//! ```ignore
//! use tollgate_config::load_config;
//! use tollgate_server::Server;
//!
//! let loaded = load_config(None)?;
//! let server = Server::new(loaded.config)?;
//! server.run().await?;
//! ```

pub mod callback;
pub mod error;
pub mod proxy;
pub mod refresh;
pub mod routes;
pub mod session;
pub mod state;
pub mod validity;

pub use error::{Result, ServerError};
pub use proxy::{ForwardRequest, Forwarder, MAX_REFRESH_RETRIES};
pub use session::{Session, SessionStore};
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{any, get},
};
use tokio::net::TcpListener;
use tollgate_config::GatewayConfig;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// The Tollgate HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a new server from a validated configuration.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        Ok(Self {
            state: AppState::new(config)?,
        })
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let server = &self.state.config.server;
        let base = server.normalized_base_path();

        let router = Router::new().merge(routes::health_routes());
        let router = if base.is_empty() {
            router.merge(self.gateway_routes())
        } else {
            router.nest(&base, self.gateway_routes())
        };

        let router = router
            .layer(DefaultBodyLimit::max(server.max_body_size))
            .layer(TraceLayer::new_for_http());

        let router = match self.cors_layer() {
            Some(cors) => router.layer(cors),
            None => router,
        };

        router.with_state(self.state.clone())
    }

    /// Login handshake, session endpoints and the proxy, mounted under the base path.
    fn gateway_routes(&self) -> Router<AppState> {
        Router::new()
            .route("/auth/login", get(routes::login_handler))
            .route("/auth/callback", get(routes::callback_handler))
            .route("/auth/logout", get(routes::logout_handler))
            .route("/auth/userinfo", get(routes::userinfo_handler))
            .route("/auth/session", get(routes::session_handler))
            .route("/request/{*path}", any(routes::proxy_handler))
    }

    /// Credentialed CORS for the configured origins. `None` when no origin is configured.
    fn cors_layer(&self) -> Option<CorsLayer> {
        let origins: Vec<HeaderValue> = self
            .state
            .config
            .server
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        if origins.is_empty() {
            return None;
        }

        Some(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true),
        )
    }

    /// Run the server until the process is killed.
    pub async fn run(self) -> Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Run the server until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.bind_address();
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;

        info!(
            addr = %addr,
            base_path = %self.state.config.server.normalized_base_path(),
            "Starting gateway"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Gateway stopped");
        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.server.bind_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tollgate_config::{SameSitePolicy, SessionConfig};
    use tower::ServiceExt;

    fn test_config(base_path: &str) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.server.base_path = base_path.to_string();
        config.server.cors_origins = vec!["http://frontend.test".to_string()];
        config.backend.endpoint = "http://backend.test/api".to_string();
        config.session = SessionConfig {
            cookie_name: "test-session".to_string(),
            secure: false,
            same_site: SameSitePolicy::Lax,
            secret: "0123456789abcdef0123456789abcdef".to_string(),
            ..SessionConfig::default()
        };
        config
    }

    #[tokio::test]
    async fn test_ping_outside_base_path() {
        let server = Server::new(test_config("/proxy/api")).unwrap();

        let response = server
            .router()
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_routes_honor_base_path() {
        let server = Server::new(test_config("/gateway")).unwrap();

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/gateway/auth/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/proxy/api/auth/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_base_path_mounts_at_root() {
        let server = Server::new(test_config("")).unwrap();

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/auth/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_credentials() {
        let server = Server::new(test_config("/proxy/api")).unwrap();

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/proxy/api/request/widgets")
                    .header(header::ORIGIN, "http://frontend.test")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://frontend.test"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }
}
