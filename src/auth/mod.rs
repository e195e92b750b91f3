//! Resident authentication: credentials, signup/login rules and session extractors.

pub mod handlers;
pub mod middleware;
pub mod password;
pub mod service;

pub use handlers::*;
pub use middleware::{AuthContext, OptionalAuth, SESSION_COOKIE_NAME};
