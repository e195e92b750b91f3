//! Session extractors and the session cookie.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::AppConfig;
use crate::db::{self, LogOnError};
use crate::domain::Account;
use crate::error::{AppError, LOGIN_REQUIRED, LOGIN_REQUIRED_DASHBOARD};
use crate::handlers::NavContext;
use crate::state::AppState;

pub const SESSION_COOKIE_NAME: &str = "society_session";

/// Authenticated request context.
/// Add this as a handler parameter to require authentication.
/// Redirects to /login/ if not authenticated.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account: Account,
    pub session_token: String,
}

impl AuthContext {
    pub fn nav(&self) -> NavContext {
        NavContext::from(&self.account)
    }
}

/// Session token from the request cookies, if any
pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Login notice for a rejected request path
pub fn login_required_notice(path: &str) -> &'static str {
    if path == "/dashboard/" {
        LOGIN_REQUIRED_DASHBOARD
    } else {
        LOGIN_REQUIRED
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let not_authenticated = AppError::NotAuthenticated(login_required_notice(parts.uri.path()));
        let Some(token) = session_token(&jar) else {
            return Err(not_authenticated);
        };

        let account_id = state
            .sessions
            .resolve(&token)?
            .ok_or(not_authenticated)?;

        let account = {
            let conn = db::try_lock(&state.db)?;
            db::get_account(&conn, account_id)?
        };

        match account {
            Some(account) => Ok(AuthContext {
                account,
                session_token: token,
            }),
            None => {
                tracing::warn!("Session refers to missing account {}", account_id);
                state
                    .sessions
                    .revoke(&token)
                    .log_warn("Failed to revoke orphaned session");
                Err(AppError::AccountMissing)
            }
        }
    }
}

/// Optional authentication extractor.
/// Returns Some(AuthContext) if authenticated, None otherwise.
/// Use for pages that work both with and without authentication.
pub struct OptionalAuth(pub Option<AuthContext>);

impl OptionalAuth {
    pub fn nav(&self) -> Option<NavContext> {
        self.0.as_ref().map(AuthContext::nav)
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match AuthContext::from_request_parts(parts, state).await {
            Ok(auth) => Ok(OptionalAuth(Some(auth))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

/// Cookie carrying a new session token
pub fn session_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.session.secure_cookies)
        .max_age(time::Duration::hours(config.session.ttl_hours))
        .build()
}

/// Remove the session cookie from the browser
pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE_NAME).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_notice_depends_on_path() {
        assert_eq!(login_required_notice("/dashboard/"), LOGIN_REQUIRED_DASHBOARD);
        assert_eq!(login_required_notice("/dashboard/parking/"), LOGIN_REQUIRED);
    }

    #[test]
    fn test_session_cookie_flags() {
        let mut config = AppConfig::default();
        let cookie = session_cookie("abc".to_string(), &config);
        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.path(), Some("/"));

        config.session.secure_cookies = true;
        assert_eq!(session_cookie("abc".to_string(), &config).secure(), Some(true));
    }

    #[test]
    fn test_empty_token_ignored() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE_NAME, ""));
        assert!(session_token(&jar).is_none());
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE_NAME, "tok"));
        assert_eq!(session_token(&jar).as_deref(), Some("tok"));
    }
}
