//! Signup and login rules, independent of HTTP.

use chrono::Utc;
use serde::Deserialize;

use super::password::{self, PasswordError, PlainPassword};
use crate::config::AccountsConfig;
use crate::db::{self, AccountRow, DbLockError, DbPool};
use crate::domain::{Account, ContactNumber, Field, NewAccount, SignupForm, ValidationErrors};
use crate::vault::{AadharVault, VaultError};

pub const DUPLICATE_CONTACT_ADVISORY: &str = "Multiple accounts found with this contact number; using the most recent. Please contact admin to consolidate accounts.";
pub const INVALID_CREDENTIALS: &str = "Invalid contact number or password.";
pub const CONTACT_TAKEN: &str = "An account with this contact number already exists.";

#[derive(Debug, thiserror::Error)]
pub enum SignupError {
    #[error("invalid signup: {0}")]
    Invalid(ValidationErrors),
    #[error(transparent)]
    Lock(#[from] DbLockError),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Vault(#[from] VaultError),
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("invalid login form: {0}")]
    Invalid(ValidationErrors),
    #[error("invalid contact number or password")]
    InvalidCredentials,
    #[error(transparent)]
    Lock(#[from] DbLockError),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub password: String,
}

/// A successful login
#[derive(Debug)]
pub struct LoginOutcome {
    pub account: Account,
    /// Set when several accounts share the contact number
    pub advisory: Option<&'static str>,
}

/// Validate, hash, seal and store a new account. Returns the account ID.
pub fn register(
    pool: &DbPool,
    vault: &AadharVault,
    accounts: &AccountsConfig,
    form: &SignupForm,
) -> Result<i64, SignupError> {
    let now = Utc::now();
    let new_account = NewAccount::validate(form, now.date_naive()).map_err(SignupError::Invalid)?;

    // Hash and seal outside the lock
    let credential = password::hash_password(&new_account.password)?;
    let sealed = vault.seal(&new_account.aadhar_number)?;

    let conn = db::try_lock(pool)?;
    if accounts.unique_contact_numbers && db::contact_exists(&conn, &new_account.contact_number)? {
        return Err(SignupError::Invalid(ValidationErrors::single(
            Field::ContactNumber,
            CONTACT_TAKEN,
        )));
    }

    let id = db::insert_account(
        &conn,
        &AccountRow {
            role: new_account.role,
            full_name: &new_account.full_name,
            contact_number: &new_account.contact_number,
            aadhar: &sealed,
            date_of_birth: new_account.date_of_birth,
            password_hash: &credential,
            created_at: now,
        },
    )?;

    tracing::info!("Registered account {} ({})", id, new_account.role);
    Ok(id)
}

fn validate_login(form: &LoginForm) -> Result<(ContactNumber, PlainPassword), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let contact = ContactNumber::parse(form.contact_number.trim());
    if contact.is_none() {
        errors.push(Field::ContactNumber, "Enter a valid 10-digit contact number.");
    }
    if form.password.is_empty() {
        errors.push(Field::Password, "This field is required.");
    }
    match contact {
        Some(contact) if errors.is_empty() => Ok((contact, PlainPassword::new(form.password.clone()))),
        _ => Err(errors),
    }
}

/// Check a contact number and password, picking the newest account on duplicates.
///
/// Unknown contact numbers and wrong passwords both yield `InvalidCredentials`,
/// and both pay for one Argon2 verification.
pub fn authenticate(pool: &DbPool, form: &LoginForm) -> Result<LoginOutcome, LoginError> {
    let (contact, password) = validate_login(form).map_err(LoginError::Invalid)?;

    let mut candidates = {
        let conn = db::try_lock(pool)?;
        db::find_by_contact(&conn, &contact)?
    };

    let advisory = (candidates.len() > 1).then_some(DUPLICATE_CONTACT_ADVISORY);
    if candidates.is_empty() {
        password::verify_against_dummy(&password);
        tracing::warn!("Login rejected: no account for contact number");
        return Err(LoginError::InvalidCredentials);
    }

    let account = candidates.swap_remove(0);
    if !password::verify_password(&password, &account.password_hash) {
        tracing::warn!("Login rejected: wrong password for account {}", account.id);
        return Err(LoginError::InvalidCredentials);
    }

    if advisory.is_some() {
        tracing::warn!(
            "Contact number of account {} is shared by {} accounts",
            account.id,
            candidates.len() + 1
        );
    }
    tracing::info!("Account {} logged in", account.id);
    Ok(LoginOutcome { account, advisory })
}
