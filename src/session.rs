//! Server-side login sessions.
//!
//! A session maps an opaque random token (sent as a cookie) to an account ID
//! and expires after a fixed lifetime. Handlers reach the store through
//! `AppState::sessions`, so the backend is chosen at startup.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::config;
use crate::db::{self, format_timestamp, DbLockError, DbPool};

/// Length of generated session tokens
pub const SESSION_TOKEN_LEN: usize = 48;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Lock(#[from] DbLockError),
    #[error("session storage failed: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// A freshly created session
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub account_id: i64,
    pub expires_at: DateTime<Utc>,
}

pub trait SessionStore: Send + Sync {
    /// Start a session for an account
    fn create(&self, account_id: i64) -> Result<Session, SessionError>;

    /// Account bound to a live (unexpired) token
    fn resolve(&self, token: &str) -> Result<Option<i64>, SessionError>;

    /// End a session; unknown tokens are ignored
    fn revoke(&self, token: &str) -> Result<(), SessionError>;

    /// Drop expired sessions, returns how many were removed
    fn purge_expired(&self) -> Result<usize, SessionError>;
}

/// Generate a new session token
pub fn generate_session_id() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..SESSION_TOKEN_LEN)
        .map(|_| {
            let idx = rng.random_range(0..36);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect()
}

/// Roughly one lookup in ten also sweeps expired sessions
fn should_sweep() -> bool {
    rand::random::<u8>() < config::SESSION_CLEANUP_THRESHOLD
}

// ==================== SQLite backend ====================

/// Sessions kept in the `sessions` table, surviving restarts
pub struct SqliteSessionStore {
    pool: DbPool,
    ttl: Duration,
}

impl SqliteSessionStore {
    pub fn new(pool: DbPool, ttl_hours: i64) -> Self {
        Self {
            pool,
            ttl: Duration::hours(ttl_hours),
        }
    }
}

impl SessionStore for SqliteSessionStore {
    fn create(&self, account_id: i64) -> Result<Session, SessionError> {
        let conn = db::try_lock(&self.pool)?;
        let now = Utc::now();
        let session = Session {
            token: generate_session_id(),
            account_id,
            expires_at: now + self.ttl,
        };
        conn.execute(
            "INSERT INTO sessions (id, account_id, created_at, expires_at, last_access_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.token,
                account_id,
                format_timestamp(now),
                format_timestamp(session.expires_at),
                format_timestamp(now)
            ],
        )?;
        Ok(session)
    }

    fn resolve(&self, token: &str) -> Result<Option<i64>, SessionError> {
        let conn = db::try_lock(&self.pool)?;
        let now = format_timestamp(Utc::now());

        if should_sweep() {
            conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?;
        }

        let account_id: Option<i64> = conn
            .query_row(
                "SELECT account_id FROM sessions WHERE id = ?1 AND expires_at > ?2",
                params![token, now],
                |row| row.get(0),
            )
            .optional()?;

        if account_id.is_some() {
            conn.execute(
                "UPDATE sessions SET last_access_at = ?1 WHERE id = ?2",
                params![now, token],
            )?;
        }
        Ok(account_id)
    }

    fn revoke(&self, token: &str) -> Result<(), SessionError> {
        let conn = db::try_lock(&self.pool)?;
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![token])?;
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize, SessionError> {
        let conn = db::try_lock(&self.pool)?;
        let now = format_timestamp(Utc::now());
        Ok(conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?)
    }
}

// ==================== In-memory backend ====================

struct SessionEntry {
    account_id: i64,
    expires_at: DateTime<Utc>,
}

/// Sessions held in process memory; all are lost on restart
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, SessionEntry>>, SessionError> {
        self.sessions.lock().map_err(|_| {
            tracing::error!("Session store mutex poisoned");
            SessionError::Lock(DbLockError)
        })
    }
}

/// Clean up expired sessions
fn cleanup_expired(sessions: &mut HashMap<String, SessionEntry>, now: DateTime<Utc>) -> usize {
    let before = sessions.len();
    sessions.retain(|_, entry| entry.expires_at > now);
    before - sessions.len()
}

impl SessionStore for MemorySessionStore {
    fn create(&self, account_id: i64) -> Result<Session, SessionError> {
        let mut sessions = self.entries()?;
        let now = Utc::now();
        let session = Session {
            token: generate_session_id(),
            account_id,
            expires_at: now + self.ttl,
        };
        sessions.insert(
            session.token.clone(),
            SessionEntry {
                account_id,
                expires_at: session.expires_at,
            },
        );
        Ok(session)
    }

    fn resolve(&self, token: &str) -> Result<Option<i64>, SessionError> {
        let mut sessions = self.entries()?;
        let now = Utc::now();

        if should_sweep() {
            cleanup_expired(&mut sessions, now);
        }

        Ok(sessions
            .get(token)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.account_id))
    }

    fn revoke(&self, token: &str) -> Result<(), SessionError> {
        self.entries()?.remove(token);
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize, SessionError> {
        let mut sessions = self.entries()?;
        Ok(cleanup_expired(&mut sessions, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::{hash_password, PlainPassword};
    use crate::db::{insert_account, AccountRow};
    use crate::domain::{ContactNumber, Role, SealedAadhar};
    use chrono::NaiveDate;

    fn pool_with_account() -> (DbPool, i64) {
        let pool = db::init_memory_db().unwrap();
        let id = {
            let conn = pool.lock().unwrap();
            let contact = ContactNumber::parse("9876543210").unwrap();
            let credential = hash_password(&PlainPassword::new("secret1")).unwrap();
            insert_account(
                &conn,
                &AccountRow {
                    role: Role::Security,
                    full_name: "Guard",
                    contact_number: &contact,
                    aadhar: &SealedAadhar("00".to_string()),
                    date_of_birth: NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
                    password_hash: &credential,
                    created_at: Utc::now(),
                },
            )
            .unwrap()
        };
        (pool, id)
    }

    fn exercise_store(store: &dyn SessionStore, account_id: i64) {
        let session = store.create(account_id).unwrap();
        assert_eq!(session.token.len(), SESSION_TOKEN_LEN);
        assert_eq!(store.resolve(&session.token).unwrap(), Some(account_id));
        assert_eq!(store.resolve("not-a-token").unwrap(), None);

        let other = store.create(account_id).unwrap();
        assert_ne!(other.token, session.token);

        store.revoke(&session.token).unwrap();
        assert_eq!(store.resolve(&session.token).unwrap(), None);
        assert_eq!(store.resolve(&other.token).unwrap(), Some(account_id));

        // Revoking twice is harmless
        store.revoke(&session.token).unwrap();
    }

    #[test]
    fn test_sqlite_store_lifecycle() {
        let (pool, id) = pool_with_account();
        let store = SqliteSessionStore::new(pool, 1);
        exercise_store(&store, id);
    }

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemorySessionStore::new(1);
        exercise_store(&store, 7);
    }

    #[test]
    fn test_sqlite_expired_session_does_not_resolve() {
        let (pool, id) = pool_with_account();
        let store = SqliteSessionStore::new(pool.clone(), -1);
        let session = store.create(id).unwrap();
        assert!(session.expires_at < Utc::now());
        assert_eq!(store.resolve(&session.token).unwrap(), None);

        // resolve() may already have swept it
        assert!(store.purge_expired().unwrap() <= 1);
        let remaining: i64 = pool
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_memory_expired_session_does_not_resolve() {
        let store = MemorySessionStore::new(-1);
        let session = store.create(3).unwrap();
        assert_eq!(store.resolve(&session.token).unwrap(), None);
        assert!(store.purge_expired().unwrap() <= 1);
        assert_eq!(store.purge_expired().unwrap(), 0);
    }

    #[test]
    fn test_session_id_alphabet() {
        let id = generate_session_id();
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }
}
