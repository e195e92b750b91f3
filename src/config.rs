//! Application configuration.
//!
//! Values come from `config.toml` (or the file named by `CONFIG_PATH`),
//! then environment variables (a `.env` file is honoured), then defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::paths;

// ==================== Defaults ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Server port
pub const SERVER_PORT: u16 = 8000;

/// Session lifetime in hours (two weeks)
pub const SESSION_TTL_HOURS: i64 = 24 * 14;

/// Probability threshold for session cleanup (0-255, lower = more frequent)
/// Value of 25 means ~10% chance (25/256) on each session lookup
pub const SESSION_CLEANUP_THRESHOLD: u8 = 25;

/// Maximum accepted profile image size
pub const UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;

// ==================== Configuration file structure ====================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub accounts: AccountsConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SERVER_ADDR.to_string(),
            port: SERVER_PORT,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<String>,
}

/// Where session tokens live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    pub ttl_hours: i64,
    /// Mark the session cookie `Secure` (enable behind HTTPS)
    pub secure_cookies: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Sqlite,
            ttl_hours: SESSION_TTL_HOURS,
            secure_cookies: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Reject signups whose contact number is already registered
    pub unique_contact_numbers: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: UPLOAD_MAX_BYTES,
        }
    }
}

impl AppConfig {
    /// Load configuration with priority: config.toml > environment > defaults
    pub fn load() -> Self {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut config = Self::from_file(Path::new(&config_path)).unwrap_or_default();

        if config.database.path.is_none() {
            if let Ok(path) = std::env::var("DATABASE_PATH") {
                tracing::info!("Using database from DATABASE_PATH env: {}", path);
                config.database.path = Some(path);
            }
        }
        if let Ok(addr) = std::env::var("SERVER_ADDR") {
            config.server.addr = addr;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.server.port = port;
        }

        config
    }

    /// Parse a TOML config file; None if missing or malformed (malformed is logged)
    pub fn from_file(path: &Path) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        match Self::from_toml(&contents) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {}", path.display());
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Ignoring malformed {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Resolved database path
    pub fn database_path(&self) -> PathBuf {
        match &self.database.path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(paths::db_path()),
        }
    }

    /// Full server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.addr, self.server.port)
    }
}
