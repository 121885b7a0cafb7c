//! Authenticated reverse proxy to the protected backend.
//!
//! Attaches the session's bearer token, relays the backend response, and on a
//! `401 invalid_token` refreshes once and re-issues the identical request.

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::Response,
};
use reqwest::Client;
use tollgate_oauth::OAuthClient;
use tracing::{debug, info, warn};

use crate::error::{Result, ServerError};
use crate::refresh::refresh_tokens;
use crate::session::Session;

/// Upper bound on refresh-and-retry rounds per proxied request.
pub const MAX_REFRESH_RETRIES: u32 = 1;

/// One inbound request, captured so it can be replayed verbatim after a refresh.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    /// Path below the proxy mount point, still percent-encoded.
    pub subpath: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// HTTP client bound to the backend base URL. Redirects are relayed, not followed.
#[derive(Debug, Clone)]
pub struct Forwarder {
    http: Client,
    base: String,
}

impl Forwarder {
    pub fn new(backend_endpoint: &str) -> Result<Self> {
        let http = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ServerError::Config(format!("Failed to build backend client: {}", e)))?;
        Ok(Self {
            http,
            base: backend_endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Backend URL for a subpath: exactly one joining slash, raw query appended.
    pub fn target_url(&self, subpath: &str, query: Option<&str>) -> String {
        let mut url = format!("{}/{}", self.base, subpath.trim_start_matches('/'));
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    /// Forward `request`, refreshing the session's tokens at most [`MAX_REFRESH_RETRIES`] times.
    pub async fn forward(
        &self,
        oauth: &OAuthClient,
        session: &mut Session,
        request: &ForwardRequest,
    ) -> Result<Response> {
        let mut refreshes = 0;
        loop {
            let response = self.send(request, session).await?;

            if refreshes < MAX_REFRESH_RETRIES
                && is_invalid_token(response.status(), response.headers())
            {
                refreshes += 1;
                info!(path = %request.subpath, "Backend rejected access token, refreshing");
                if refresh_tokens(oauth, session).await {
                    continue;
                }
            }

            return relay(response).await;
        }
    }

    async fn send(&self, request: &ForwardRequest, session: &Session) -> Result<reqwest::Response> {
        let mut headers = request.headers.clone();
        headers.remove(header::HOST);

        match session.token_set() {
            Some(tokens) => match HeaderValue::from_str(&tokens.bearer()) {
                Ok(value) => {
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(_) => warn!("Access token is not a valid header value; forwarding without it"),
            },
            None => debug!("No access token in session; forwarding without Authorization"),
        }

        let url = self.target_url(&request.subpath, request.query.as_deref());
        debug!(method = %request.method, url = %url, "Forwarding to backend");

        self.http
            .request(request.method.clone(), &url)
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Backend unreachable");
                ServerError::UpstreamUnavailable(format!("Upstream connection error: {}", e))
            })
    }
}

/// `401` with a `WWW-Authenticate` challenge naming `invalid_token`.
pub fn is_invalid_token(status: StatusCode, headers: &HeaderMap) -> bool {
    status == StatusCode::UNAUTHORIZED
        && headers
            .get_all(header::WWW_AUTHENTICATE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("invalid_token"))
}

/// Remove headers the browser-facing response must not carry.
///
/// The gateway's own CORS layer governs cross-origin access, never the backend's.
pub fn strip_response_headers(headers: &mut HeaderMap) {
    for name in [
        header::TRANSFER_ENCODING,
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
    ] {
        headers.remove(name);
    }
}

async fn relay(response: reqwest::Response) -> Result<Response> {
    let status = response.status();
    let mut headers = response.headers().clone();
    strip_response_headers(&mut headers);

    let body = response.bytes().await.map_err(|e| {
        ServerError::UpstreamUnavailable(format!("Failed to read backend response: {}", e))
    })?;

    let mut relayed = Response::new(Body::from(body));
    *relayed.status_mut() = status;
    *relayed.headers_mut() = headers;
    Ok(relayed)
}
