//! Password hashing and verification (Argon2id).
//!
//! Plaintext and stored credentials are separate types. A [`PlainPassword`]
//! only turns into a [`StoredCredential`] through [`hash_password`], and the
//! account store only accepts a `StoredCredential`, so an already hashed
//! value can never be hashed a second time.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::sync::LazyLock;

/// Minimum accepted password length, in characters
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),
    #[error("stored value is not a recognised password hash")]
    NotAHash,
}

/// A password as submitted by a user. Never persisted.
#[derive(Clone)]
pub struct PlainPassword(String);

impl PlainPassword {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_long_enough(&self) -> bool {
        self.char_len() >= MIN_PASSWORD_LEN
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for PlainPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PlainPassword(***)")
    }
}

/// A PHC-format password hash as kept in the account table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential(String);

impl StoredCredential {
    /// Accept a value read back from storage, checking it is a PHC hash string.
    pub fn from_stored(value: String) -> Result<Self, PasswordError> {
        PasswordHash::new(&value).map_err(|_| PasswordError::NotAHash)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ToSql for StoredCredential {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for StoredCredential {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        StoredCredential::from_stored(value.as_str()?.to_string())
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &PlainPassword) -> Result<StoredCredential, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(StoredCredential(hash.to_string()))
}

/// Verify a password against a stored credential.
pub fn verify_password(password: &PlainPassword, credential: &StoredCredential) -> bool {
    match PasswordHash::new(credential.as_str()) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Hash used to burn comparable time when no account matches a login attempt
static DUMMY_CREDENTIAL: LazyLock<Option<StoredCredential>> =
    LazyLock::new(|| hash_password(&PlainPassword::new("society-portal-dummy")).ok());

/// Build the dummy hash now so the first unknown-contact login costs no more than later ones.
/// Returns false if hashing failed.
pub fn prepare_dummy_credential() -> bool {
    LazyLock::force(&DUMMY_CREDENTIAL).is_some()
}

/// Run a verification that always fails, costing about as much as a real one.
pub fn verify_against_dummy(password: &PlainPassword) {
    if let Some(dummy) = DUMMY_CREDENTIAL.as_ref() {
        let _ = verify_password(password, dummy);
    }
}
