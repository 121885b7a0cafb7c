//! Token refresh coordinator.
//!
//! Shared by the proxy and the session check. Mutates the session only on success and
//! never renders a response.

use tollgate_oauth::OAuthClient;
use tracing::{info, warn};

use crate::session::Session;

/// Redeem the session's refresh token. Returns `true` when the token set was replaced.
///
/// Missing refresh tokens, provider rejections and transport failures all return `false`
/// with the session untouched.
pub async fn refresh_tokens(oauth: &OAuthClient, session: &mut Session) -> bool {
    let Some(current) = session.token_set() else {
        warn!("Refresh requested without a token set");
        return false;
    };
    let Some(refresh_token) = current.usable_refresh_token() else {
        warn!("Refresh token is missing");
        return false;
    };

    match oauth.refresh(refresh_token).await {
        Ok(tokens) => {
            let next = tokens.succeeding(current);
            session.set_token_set(next);
            info!("Access token refreshed");
            true
        }
        Err(e) => {
            warn!(error = %e, "Token refresh failed");
            false
        }
    }
}
