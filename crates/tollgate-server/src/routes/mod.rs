//! HTTP routes.

pub mod auth;
pub mod health;
pub mod proxy;

pub use auth::{
    LoginResponse, MessageResponse, SessionResponse, callback_handler, login_handler,
    logout_handler, session_handler, userinfo_handler,
};
pub use health::health_routes;
pub use proxy::proxy_handler;
