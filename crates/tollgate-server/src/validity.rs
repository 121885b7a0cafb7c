//! Session validity check against the provider's userinfo endpoint.

use tollgate_oauth::OAuthClient;
use tracing::debug;

use crate::refresh::refresh_tokens;
use crate::session::Session;

/// Decide whether the session's tokens are live, refreshing once if the probe fails.
///
/// Any non-200 probe (or transport failure) triggers a single refresh and re-probe.
/// Whenever the answer is `false` the session is cleared entirely.
pub async fn check_session(oauth: &OAuthClient, session: &mut Session) -> bool {
    let live = probe_and_heal(oauth, session).await;
    if !live {
        session.clear();
    }
    live
}

async fn probe_and_heal(oauth: &OAuthClient, session: &mut Session) -> bool {
    if session.token_set().is_none() {
        return false;
    }
    if probe(oauth, session).await {
        return true;
    }
    if !refresh_tokens(oauth, session).await {
        return false;
    }
    probe(oauth, session).await
}

async fn probe(oauth: &OAuthClient, session: &Session) -> bool {
    let Some(tokens) = session.token_set() else {
        return false;
    };
    match oauth.userinfo(&tokens.access_token).await {
        Ok(response) => {
            debug!(status = %response.status, "Userinfo probe");
            response.is_success()
        }
        Err(e) => {
            debug!(error = %e, "Userinfo probe failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tollgate_config::OAuthConfig;
    use tollgate_oauth::TokenSet;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oauth_for(server: &MockServer) -> OAuthClient {
        OAuthClient::new(Arc::new(OAuthConfig {
            token_endpoint: format!("{}/token", server.uri()),
            userinfo_endpoint: format!("{}/userinfo", server.uri()),
            ..OAuthConfig::default()
        }))
    }

    #[tokio::test]
    async fn test_empty_session_is_invalid_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut session = Session::default();
        session.begin_login("s".into(), "v".into());
        assert!(!check_session(&oauth_for(&server), &mut session).await);
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_live_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer at"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"sub": "u"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = Session::with_tokens(TokenSet::new("at"));
        assert!(check_session(&oauth_for(&server), &mut session).await);
        assert_eq!(session.token_set().unwrap().access_token, "at");
    }

    #[tokio::test]
    async fn test_forbidden_probe_also_refreshes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer old"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer new"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = Session::with_tokens(TokenSet::new("old").with_refresh_token("rt"));
        assert!(check_session(&oauth_for(&server), &mut session).await);
        assert_eq!(session.token_set().unwrap().access_token, "new");
    }

    #[tokio::test]
    async fn test_unreachable_provider_clears_session() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let oauth = OAuthClient::new(Arc::new(OAuthConfig {
            token_endpoint: format!("http://{}/token", addr),
            userinfo_endpoint: format!("http://{}/userinfo", addr),
            ..OAuthConfig::default()
        }));

        let mut session = Session::with_tokens(TokenSet::new("at").with_refresh_token("rt"));
        assert!(!check_session(&oauth, &mut session).await);
        assert!(session.is_empty());
    }
}
