//! Authenticated proxy endpoint.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;

use crate::proxy::ForwardRequest;
use crate::state::AppState;

/// Mount point of the proxy below the base path.
const PROXY_PREFIX: &str = "/request/";

/// ANY {base}/request/{*path} - Forward to the backend with the session's bearer token.
pub async fn proxy_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Path(path): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }

    // Prefer the raw path so percent-encoding reaches the backend untouched.
    let subpath = uri
        .path()
        .strip_prefix(PROXY_PREFIX)
        .map(str::to_string)
        .unwrap_or(path);

    let request = ForwardRequest {
        method,
        subpath,
        query: uri.query().map(str::to_string),
        headers,
        body,
    };

    let mut session = state.sessions.load(&jar);
    let before = session.clone();

    let result = state
        .forwarder
        .forward(&state.oauth, &mut session, &request)
        .await;

    if session != before {
        state.sessions.respond(jar, &session, result)
    } else {
        result.into_response()
    }
}
