//! Test utilities for application setup.
//!
//! Builds a complete `AppState` over a temporary directory using the same
//! initialization paths as production, so tests exercise the real schema,
//! catalog and router.

use axum_test::TestServer;
use std::path::Path;
use tempfile::TempDir;

use crate::app::build_router;
use crate::config::AppConfig;
use crate::content::PageCatalog;
use crate::db;
use crate::state::{self, AppState};
use crate::vault::AadharVault;

/// Fixed vault key so sealed values are reproducible within a test
pub const TEST_VAULT_KEY: [u8; 32] = [42; 32];

/// Test environment with a database file, media root and built-in content.
///
/// Everything lives in one temporary directory, removed when dropped.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    pub state: AppState,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let pool = db::init_db(&temp.path().join("society.db")).expect("init database");
        let sessions = state::session_store(&config, pool.clone());
        let catalog = PageCatalog::builtin().expect("built-in catalog");
        let media_dir = temp.path().join("media");

        let state = AppState::new(
            pool,
            sessions,
            catalog,
            AadharVault::from_key(TEST_VAULT_KEY),
            config,
            media_dir,
        );
        Self { temp, state }
    }

    /// Test server over the full router, keeping cookies between requests
    pub fn server(&self) -> TestServer {
        TestServer::builder()
            .save_cookies()
            .build(build_router(self.state.clone()))
            .expect("build test server")
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn account_count(&self) -> i64 {
        let conn = self.state.db.lock().expect("db lock");
        db::count_accounts(&conn).expect("count accounts")
    }
}
