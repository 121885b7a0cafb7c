//! Ordered validation of the provider's redirect back to the gateway.

use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::session::Session;

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Outcome of [`validate_callback`]. Each variant has its own response policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// State matched and a code is present: exchange it.
    Proceed { code: String },
    /// Possible CSRF or replay: redirect to the frontend without a session.
    CsrfMismatch,
    /// The session has no pending login (cookie lost or callback forged).
    IntegrityError(&'static str),
    /// The request itself is unusable.
    MalformedRequest(&'static str),
    /// The provider reported an authorization error for this login.
    ProviderDenied { error: String, description: Option<String> },
}

/// Validate the callback against the session, in order:
/// session state present, request state present, states equal, no provider error, code present.
pub fn validate_callback(session: &Session, query: &CallbackQuery) -> CallbackOutcome {
    let Some(pending) = session.pending() else {
        return CallbackOutcome::IntegrityError(
            "state not found in session, cookie might be missing",
        );
    };
    let Some(state) = query.state.as_deref() else {
        return CallbackOutcome::MalformedRequest("state not found in request arguments");
    };
    if !constant_time_eq(state, &pending.state) {
        return CallbackOutcome::CsrfMismatch;
    }
    if let Some(error) = &query.error {
        return CallbackOutcome::ProviderDenied {
            error: error.clone(),
            description: query.error_description.clone(),
        };
    }
    match query.code.as_deref() {
        Some(code) if !code.is_empty() => CallbackOutcome::Proceed {
            code: code.to_string(),
        },
        _ => CallbackOutcome::MalformedRequest("authorization code not found in request arguments"),
    }
}

/// Compare two strings in constant time.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();
    if a_bytes.len() != b_bytes.len() {
        let _ = a_bytes.ct_eq(a_bytes);
        return false;
    }
    a_bytes.ct_eq(b_bytes).into()
}
