//! Authentication handlers for signup, login, and logout.

use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;

use super::middleware::{clear_session_cookie, session_cookie, session_token, OptionalAuth};
use super::service::{self, LoginError, LoginForm, SignupError, INVALID_CREDENTIALS};
use crate::db::LogOnError;
use crate::domain::{Role, SignupForm};
use crate::error::AppResult;
use crate::filters;
use crate::flash::{self, FlashMessage};
use crate::handlers::{FormErrors, NavContext};
use crate::state::AppState;

/// Option in the role dropdown
pub struct RoleOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn role_options(selected: &str) -> Vec<RoleOption> {
    Role::ALL
        .iter()
        .map(|role| RoleOption {
            value: role.as_str(),
            label: role.label(),
            selected: role.as_str() == selected,
        })
        .collect()
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub nav: Option<NavContext>,
    pub messages: Vec<FlashMessage>,
    pub roles: Vec<RoleOption>,
    pub full_name: String,
    pub contact_number: String,
    pub aadhar_number: String,
    pub dob: String,
    pub errors: FormErrors,
}

impl SignupTemplate {
    /// Refill a rejected form; the password is never echoed back
    fn refill(nav: Option<NavContext>, messages: Vec<FlashMessage>, form: &SignupForm, errors: FormErrors) -> Self {
        Self {
            nav,
            messages,
            roles: role_options(&form.role),
            full_name: form.full_name.clone(),
            contact_number: form.contact_number.clone(),
            aadhar_number: form.aadhar_number.clone(),
            dob: form.dob.clone(),
            errors,
        }
    }
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: Option<NavContext>,
    pub messages: Vec<FlashMessage>,
    pub contact_number: String,
    pub errors: FormErrors,
}

/// GET /signup/ - Show signup page
pub async fn signup_page(auth: OptionalAuth, jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, messages) = flash::take(jar);
    let template = SignupTemplate::refill(auth.nav(), messages, &SignupForm::default(), FormErrors::default());
    (jar, Html(template.render().unwrap_or_default()))
}

/// POST /signup/ - Create an account
pub async fn signup_submit(
    State(state): State<AppState>,
    auth: OptionalAuth,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> AppResult<Response> {
    match service::register(&state.db, &state.vault, &state.config.accounts, &form) {
        Ok(_) => {
            let jar = flash::push(jar, FlashMessage::success("Signup successful."));
            Ok((jar, Redirect::to("/signup/")).into_response())
        }
        Err(SignupError::Invalid(errors)) => {
            tracing::debug!("Signup rejected: {}", errors);
            let (jar, messages) = flash::take(jar);
            let template = SignupTemplate::refill(auth.nav(), messages, &form, FormErrors::from(&errors));
            Ok((jar, Html(template.render().unwrap_or_default())).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /login/ - Show login page
pub async fn login_page(auth: OptionalAuth, jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, messages) = flash::take(jar);
    let template = LoginTemplate {
        nav: auth.nav(),
        messages,
        contact_number: String::new(),
        errors: FormErrors::default(),
    };
    (jar, Html(template.render().unwrap_or_default()))
}

/// POST /login/ - Check credentials and start a session
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let rejected = |jar: CookieJar, extra: Option<FlashMessage>, errors: FormErrors| -> AppResult<Response> {
        let (jar, mut messages) = flash::take(jar);
        messages.extend(extra);
        let template = LoginTemplate {
            nav: None,
            messages,
            contact_number: form.contact_number.clone(),
            errors,
        };
        Ok((jar, Html(template.render().unwrap_or_default())).into_response())
    };

    let outcome = match service::authenticate(&state.db, &form) {
        Ok(outcome) => outcome,
        Err(LoginError::Invalid(errors)) => return rejected(jar, None, FormErrors::from(&errors)),
        Err(LoginError::InvalidCredentials) => {
            return rejected(jar, Some(FlashMessage::error(INVALID_CREDENTIALS)), FormErrors::default())
        }
        Err(e) => return Err(e.into()),
    };

    // Never carry a previous session over to the new account
    if let Some(old_token) = session_token(&jar) {
        state
            .sessions
            .revoke(&old_token)
            .log_warn("Failed to revoke previous session");
    }

    let session = state.sessions.create(outcome.account.id)?;
    let mut jar = jar.add(session_cookie(session.token, &state.config));
    jar = flash::push(jar, FlashMessage::success("Login successful."));
    if let Some(advisory) = outcome.advisory {
        jar = flash::push(jar, FlashMessage::warning(advisory));
    }

    Ok((jar, Redirect::to("/dashboard/")).into_response())
}

/// POST /logout/ - End the session
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(token) = session_token(&jar) {
        state.sessions.revoke(&token).log_warn("Failed to revoke session");
    }

    let jar = clear_session_cookie(jar);
    let jar = flash::push(jar, FlashMessage::info("You have been logged out."));
    (jar, Redirect::to("/login/"))
}
