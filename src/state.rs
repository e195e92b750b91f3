//! Application state shared by all handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::auth::password;
use crate::config::{AppConfig, SessionBackend};
use crate::content::{CatalogError, PageCatalog};
use crate::db::{self, DbPool};
use crate::paths;
use crate::session::{MemorySessionStore, SessionStore, SqliteSessionStore};
use crate::vault::{AadharVault, VaultError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to open database: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("failed to load Aadhar vault key: {0}")]
    Vault(#[from] VaultError),
    #[error("failed to load content: {0}")]
    Catalog(#[from] CatalogError),
    #[error("failed to prepare media directory: {0}")]
    Media(#[from] std::io::Error),
}

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// Accounts (and sessions, for the sqlite backend)
    pub db: DbPool,

    pub sessions: Arc<dyn SessionStore>,

    /// Dashboard pages and facilities, immutable after startup
    pub catalog: Arc<PageCatalog>,

    pub vault: Arc<AadharVault>,

    pub config: Arc<AppConfig>,

    /// Root for uploaded files, served at /media
    pub media_dir: PathBuf,
}

impl AppState {
    pub fn new(
        db: DbPool,
        sessions: Arc<dyn SessionStore>,
        catalog: PageCatalog,
        vault: AadharVault,
        config: AppConfig,
        media_dir: PathBuf,
    ) -> Self {
        Self {
            db,
            sessions,
            catalog: Arc::new(catalog),
            vault: Arc::new(vault),
            config: Arc::new(config),
            media_dir,
        }
    }

    /// Open everything the server needs, creating files on first run
    pub fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        let db = db::init_db(&config.database_path())?;
        let sessions = session_store(&config, db.clone());
        let catalog = PageCatalog::load(Path::new(&paths::content_dir()))?;
        let vault = AadharVault::load_or_create(Path::new(&paths::vault_key_path()))?;
        if !password::prepare_dummy_credential() {
            tracing::warn!("Could not prepare dummy credential; unknown-contact logins skip the timing guard");
        }

        let media_dir = PathBuf::from(paths::media_dir());
        std::fs::create_dir_all(paths::profiles_dir(&media_dir))?;

        Ok(Self::new(db, sessions, catalog, vault, config, media_dir))
    }
}

/// Session store for the configured backend
pub fn session_store(config: &AppConfig, db: DbPool) -> Arc<dyn SessionStore> {
    let ttl_hours = config.session.ttl_hours;
    match config.session.backend {
        SessionBackend::Sqlite => Arc::new(SqliteSessionStore::new(db, ttl_hours)),
        SessionBackend::Memory => {
            tracing::info!("Using in-memory sessions; logins will not survive a restart");
            Arc::new(MemorySessionStore::new(ttl_hours))
        }
    }
}
