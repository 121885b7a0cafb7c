//! OAuth 2.0 Authorization Code + PKCE client for the Tollgate gateway.
//!
//! # Components
//!
//! - [`pkce`]: verifier/challenge generation, CSRF state, authorization URL
//! - [`tokens`]: the provider's token set, preserved verbatim
//! - [`client`]: token exchange/refresh, userinfo probe, end-session

pub mod client;
pub mod error;
pub mod pkce;
pub mod tokens;

pub use client::{LoginStart, OAuthClient, UserInfoResponse};
pub use error::{OAuthError, Result};
pub use pkce::{PkceChallenge, challenge_for};
pub use tokens::TokenSet;
