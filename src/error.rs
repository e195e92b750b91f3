//! Request-level errors and how they turn into responses.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use thiserror::Error;

use crate::auth::middleware::SESSION_COOKIE_NAME;
use crate::auth::password::PasswordError;
use crate::auth::service::{LoginError, SignupError};
use crate::db::DbLockError;
use crate::filters;
use crate::flash::{self, FlashMessage};
use crate::handlers::NavContext;
use crate::media::UploadError;
use crate::session::SessionError;
use crate::vault::VaultError;

pub const LOGIN_REQUIRED: &str = "Please log in to access this page.";
pub const LOGIN_REQUIRED_DASHBOARD: &str = "Please log in to access the dashboard.";
pub const ACCOUNT_MISSING: &str = "User not found. Please log in again.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Page not found")]
    NotFound,

    /// Carries the notice shown on the login page
    #[error("Not authenticated")]
    NotAuthenticated(&'static str),

    /// Session resolved to an account that no longer exists
    #[error("Account for session not found")]
    AccountMissing,

    #[error(transparent)]
    DbLock(#[from] DbLockError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Signup(#[from] SignupError),

    #[error(transparent)]
    Login(#[from] LoginError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Template)]
#[template(path = "errors/not_found.html")]
pub struct NotFoundTemplate {
    pub nav: Option<NavContext>,
    pub messages: Vec<FlashMessage>,
}

#[derive(Template)]
#[template(path = "errors/internal.html")]
pub struct InternalErrorTemplate {
    pub nav: Option<NavContext>,
    pub messages: Vec<FlashMessage>,
}

fn login_redirect(message: FlashMessage, clear_session: bool) -> Response {
    let mut jar = flash::push(CookieJar::new(), message);
    if clear_session {
        // A fresh jar has no original cookie to remove, so send the expiry explicitly
        let mut removal = Cookie::build((SESSION_COOKIE_NAME, "")).path("/").build();
        removal.make_removal();
        jar = jar.add(removal);
    }
    (jar, Redirect::to("/login/")).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => {
                let template = NotFoundTemplate {
                    nav: None,
                    messages: Vec::new(),
                };
                (StatusCode::NOT_FOUND, Html(template.render().unwrap_or_default())).into_response()
            }
            AppError::NotAuthenticated(notice) => login_redirect(FlashMessage::info(notice), false),
            AppError::AccountMissing => login_redirect(FlashMessage::error(ACCOUNT_MISSING), true),
            other => {
                tracing::error!("Request failed: {}", other);
                let template = InternalErrorTemplate {
                    nav: None,
                    messages: Vec::new(),
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(template.render().unwrap_or_default()),
                )
                    .into_response()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
