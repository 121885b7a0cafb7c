//! Cookie-backed browser sessions.
//!
//! The session is never stored server-side: it is serialized to JSON, encrypted and
//! authenticated with the process key, and round-tripped through httponly cookies.
//! A payload too large for one cookie is split across numbered chunks (`name`, `name.1`,
//! `name.2`, ...), each sealed on its own. A cookie that fails authentication reads as an
//! empty session.

use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use tollgate_config::{SameSitePolicy, SessionConfig};
use tollgate_oauth::TokenSet;
use tracing::debug;

use crate::error::{Result, ServerError};

/// Browsers cap one cookie's name plus value at this many bytes.
pub const MAX_COOKIE_BYTES: usize = 4096;

/// Sessions needing more chunks than this are refused.
pub const MAX_COOKIE_CHUNKS: usize = 8;

/// Nonce and tag the private jar adds before base64-encoding a sealed value.
const SEAL_OVERHEAD: usize = 12 + 16;

/// Login started but not yet completed: the CSRF state and PKCE verifier travel together.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    pub state: String,
    pub code_verifier: String,
}

impl std::fmt::Debug for PendingLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingLogin")
            .field("state", &self.state)
            .field("code_verifier", &"<redacted>")
            .finish()
    }
}

/// Per-browser session content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending: Option<PendingLogin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_set: Option<TokenSet>,
}

impl Session {
    /// Session holding only a token set.
    pub fn with_tokens(tokens: TokenSet) -> Self {
        Self {
            pending: None,
            token_set: Some(tokens),
        }
    }

    /// Record a new pending login, replacing any earlier one. Tokens are left alone.
    pub fn begin_login(&mut self, state: String, code_verifier: String) {
        self.pending = Some(PendingLogin {
            state,
            code_verifier,
        });
    }

    pub fn pending(&self) -> Option<&PendingLogin> {
        self.pending.as_ref()
    }

    /// Consume the pending login. A second call returns `None`.
    pub fn take_pending(&mut self) -> Option<PendingLogin> {
        self.pending.take()
    }

    pub fn token_set(&self) -> Option<&TokenSet> {
        self.token_set.as_ref()
    }

    /// Replace the token set as a whole.
    pub fn set_token_set(&mut self, tokens: TokenSet) {
        self.token_set = Some(tokens);
    }

    /// Drop everything: pending login and tokens.
    pub fn clear(&mut self) {
        *self = Session::default();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none() && self.token_set.is_none()
    }
}

/// Derive the 64-byte cookie key from the configured secret.
pub fn derive_key(secret: &str) -> Result<Key> {
    let digest = Sha512::digest(secret.as_bytes());
    Key::try_from(digest.as_slice())
        .map_err(|e| ServerError::Config(format!("Failed to derive cookie key: {}", e)))
}

/// Reads and writes [`Session`] values through an encrypted cookie jar.
#[derive(Debug, Clone)]
pub struct SessionStore {
    cookie_name: String,
    path: String,
    http_only: bool,
    secure: bool,
    same_site: SameSite,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        let same_site = match config.same_site {
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::Lax => SameSite::Lax,
            SameSitePolicy::None => SameSite::None,
        };
        Self {
            cookie_name: config.cookie_name.clone(),
            path: config.path.clone(),
            http_only: config.http_only,
            secure: config.secure,
            same_site,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Name of the `index`-th chunk cookie. Chunk 0 carries the bare cookie name.
    pub fn chunk_name(&self, index: usize) -> String {
        if index == 0 {
            self.cookie_name.clone()
        } else {
            format!("{}.{}", self.cookie_name, index)
        }
    }

    /// Plaintext bytes one chunk can hold so its sealed `name=value` fits a browser cookie.
    fn chunk_capacity(&self) -> usize {
        let longest_name = self.chunk_name(MAX_COOKIE_CHUNKS - 1).len();
        let sealed = MAX_COOKIE_BYTES.saturating_sub(longest_name + 1);
        (sealed / 4 * 3).saturating_sub(SEAL_OVERHEAD)
    }

    /// A session cookie carrying the configured attributes.
    fn cookie(&self, name: String, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .path(self.path.clone())
            .http_only(self.http_only)
            .secure(self.secure)
            .same_site(self.same_site)
            .build()
    }

    /// Decode the session carried by the request. Missing or undecodable cookies yield an empty session.
    pub fn load(&self, jar: &PrivateCookieJar) -> Session {
        let Some(first) = jar.get(&self.cookie_name) else {
            return Session::default();
        };

        let mut value = first.value().to_string();
        for index in 1..MAX_COOKIE_CHUNKS {
            match jar.get(&self.chunk_name(index)) {
                Some(chunk) => value.push_str(chunk.value()),
                None => break,
            }
        }

        match serde_json::from_str(&value) {
            Ok(session) => session,
            Err(e) => {
                debug!(error = %e, "Discarding unreadable session cookie");
                Session::default()
            }
        }
    }

    /// Encode `session` into the jar. An empty session removes every session cookie.
    ///
    /// Fails without touching the jar when the session cannot fit in
    /// [`MAX_COOKIE_CHUNKS`] cookies.
    pub fn save(&self, mut jar: PrivateCookieJar, session: &Session) -> Result<PrivateCookieJar> {
        let value = if session.is_empty() {
            String::new()
        } else {
            serde_json::to_string(session)
                .map_err(|e| ServerError::Internal(format!("Failed to serialize session: {}", e)))?
        };
        let chunks = split_chunks(&value, self.chunk_capacity())?;

        if chunks.len() > MAX_COOKIE_CHUNKS {
            return Err(ServerError::Internal(format!(
                "Session needs {} cookies, more than the {} allowed",
                chunks.len(),
                MAX_COOKIE_CHUNKS
            )));
        }
        if chunks.len() > 1 {
            debug!(chunks = chunks.len(), "Session split across cookies");
        }

        for index in 0..MAX_COOKIE_CHUNKS {
            let name = self.chunk_name(index);
            jar = match chunks.get(index) {
                Some(chunk) => jar.add(self.cookie(name, chunk.to_string())),
                // Only cookies the request carried produce a removal.
                None => jar.remove(self.cookie(name, String::new())),
            };
        }
        Ok(jar)
    }

    /// Persist `session` and attach it to `body`. A session that cannot be stored fails the request.
    pub fn respond(
        &self,
        jar: PrivateCookieJar,
        session: &Session,
        body: impl IntoResponse,
    ) -> Response {
        match self.save(jar, session) {
            Ok(jar) => (jar, body).into_response(),
            Err(e) => e.into_response(),
        }
    }
}

/// Split `value` into pieces of at most `capacity` bytes on char boundaries.
fn split_chunks(value: &str, capacity: usize) -> Result<Vec<&str>> {
    if capacity < 4 {
        return Err(ServerError::Config(
            "Session cookie name is too long to hold any data".to_string(),
        ));
    }

    let mut chunks = Vec::new();
    let mut rest = value;
    while !rest.is_empty() {
        let mut end = capacity.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }
    Ok(chunks)
}
