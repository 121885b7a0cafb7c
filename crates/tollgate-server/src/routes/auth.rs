//! Login handshake and session endpoints.
//!
//! Every handler that mutates the session re-encodes it alongside its result, so session
//! changes persist even when the response is an error.

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::callback::{CallbackOutcome, CallbackQuery, validate_callback};
use crate::error::{Result, ServerError};
use crate::state::AppState;
use crate::validity::check_session;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Response for login: where the frontend should send the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub redirect: String,
}

/// Response for the session check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session: bool,
}

/// Plain acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET {base}/auth/login - Start a login and return the authorization URL.
pub async fn login_handler(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    let login = match state.oauth.start_login() {
        Ok(login) => login,
        Err(e) => return ServerError::from(e).into_response(),
    };

    let mut session = state.sessions.load(&jar);
    session.begin_login(login.state, login.pkce.verifier);

    info!("Login started");
    let body = Json(LoginResponse {
        redirect: login.authorization_url,
    });
    state.sessions.respond(jar, &session, body)
}

/// GET {base}/auth/callback - Complete the login and redirect to the frontend.
pub async fn callback_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let mut session = state.sessions.load(&jar);
    let frontend = state.config.oauth.frontend_redirect.clone();

    match validate_callback(&session, &query) {
        CallbackOutcome::Proceed { code } => {
            let Some(pending) = session.take_pending() else {
                return ServerError::SessionIntegrity("pending login vanished".to_string())
                    .into_response();
            };
            // The consumed login is persisted whatever the exchange outcome.
            match state.oauth.exchange_code(&code, &pending.code_verifier).await {
                Ok(tokens) => {
                    session.set_token_set(tokens);
                    info!("Login completed");
                    state.sessions.respond(jar, &session, redirect_to(frontend))
                }
                Err(e) => state.sessions.respond(jar, &session, ServerError::from(e)),
            }
        }
        CallbackOutcome::CsrfMismatch => {
            warn!("Callback state mismatch; redirecting without a session");
            redirect_to(frontend).into_response()
        }
        CallbackOutcome::IntegrityError(reason) => {
            ServerError::SessionIntegrity(reason.to_string()).into_response()
        }
        CallbackOutcome::MalformedRequest(reason) => {
            ServerError::BadRequest(reason.to_string()).into_response()
        }
        CallbackOutcome::ProviderDenied { error, description } => {
            session.take_pending();
            let message = match description {
                Some(description) => format!("{}: {}", error, description),
                None => error,
            };
            state
                .sessions
                .respond(jar, &session, ServerError::Provider(message))
        }
    }
}

/// GET {base}/auth/logout - End the provider session and clear the local one.
pub async fn logout_handler(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    let mut session = state.sessions.load(&jar);
    let Some(id_token) = session.token_set().and_then(|t| t.id_token.clone()) else {
        return ServerError::SessionIntegrity("id_token not found in session".to_string())
            .into_response();
    };

    match state.oauth.end_session(&id_token).await {
        Ok(status) if status.is_success() => info!("Provider session ended"),
        Ok(status) => warn!(status = %status, "Provider logout returned an error status"),
        Err(e) => warn!(error = %e, "Provider logout failed"),
    }

    session.clear();
    let body = Json(MessageResponse {
        message: "logout successful".to_string(),
    });
    state.sessions.respond(jar, &session, body)
}

/// GET {base}/auth/userinfo - Relay the provider's userinfo answer.
pub async fn userinfo_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<Response> {
    let session = state.sessions.load(&jar);
    let tokens = session
        .token_set()
        .ok_or_else(|| ServerError::Unauthorized("No active session".to_string()))?;

    let userinfo = state.oauth.userinfo(&tokens.access_token).await?;

    let mut response = (userinfo.status, userinfo.body).into_response();
    let headers = response.headers_mut();
    headers.remove(header::CONTENT_TYPE);
    if let Some(content_type) = userinfo
        .content_type
        .and_then(|ct| HeaderValue::from_str(&ct).ok())
    {
        headers.insert(header::CONTENT_TYPE, content_type);
    }
    Ok(response)
}

/// GET {base}/auth/session - Report whether the session is live, healing it if possible.
pub async fn session_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Response {
    let mut session = state.sessions.load(&jar);
    let before = session.clone();

    let live = check_session(&state.oauth, &mut session).await;
    let body = Json(SessionResponse { session: live });

    if session != before {
        state.sessions.respond(jar, &session, body)
    } else {
        body.into_response()
    }
}

fn redirect_to(location: String) -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, location)])
}
