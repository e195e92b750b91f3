//! Project path functions - single source of truth for all file paths.
//!
//! ## Environment Variables
//!
//! - `DATA_DIR`: Override the base data directory (default: "data")
//! - `PORT`: Override the server port (see config.rs)
//!
//! This allows running multiple isolated server instances side by side:
//! ```bash
//! DATA_DIR=data/demo PORT=8001 cargo run
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Lazily initialized data directory from DATA_DIR env var
static DATA_DIR_VALUE: OnceLock<String> = OnceLock::new();

/// Get the base data directory (from DATA_DIR env var or default "data")
pub fn data_dir() -> &'static str {
    DATA_DIR_VALUE.get_or_init(|| env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()))
}

/// Default SQLite database path
pub fn db_path() -> String {
    format!("{}/society.db", data_dir())
}

/// Uploaded media root, served at /media
pub fn media_dir() -> String {
    format!("{}/media", data_dir())
}

/// Content override directory (pages.json, facilities.json)
pub fn content_dir() -> String {
    format!("{}/content", data_dir())
}

/// Aadhar vault key file
pub fn vault_key_path() -> String {
    format!("{}/secrets/aadhar.key", data_dir())
}

/// Static assets shipped with the binary's working directory
pub const STATIC_DIR: &str = "static";

/// Subdirectory of the media root holding profile images
pub const PROFILES_SUBDIR: &str = "profiles";

/// Profile image directory under a given media root
pub fn profiles_dir(media_root: &Path) -> PathBuf {
    media_root.join(PROFILES_SUBDIR)
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_default() {
        // OnceLock makes the env override untestable here; just verify a value exists
        let dir = data_dir();
        assert!(!dir.is_empty());
    }

    #[test]
    fn test_db_path_format() {
        assert!(db_path().ends_with("/society.db"));
    }

    #[test]
    fn test_media_and_content_dirs() {
        assert!(media_dir().ends_with("/media"));
        assert!(content_dir().ends_with("/content"));
        assert!(vault_key_path().ends_with("/secrets/aadhar.key"));
    }

    #[test]
    fn test_profiles_dir() {
        let dir = profiles_dir(Path::new("/tmp/media"));
        assert_eq!(dir, PathBuf::from("/tmp/media/profiles"));
    }
}
