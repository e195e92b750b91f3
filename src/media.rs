//! Uploaded profile images.
//!
//! Images are identified by their leading bytes, never by the client's
//! filename or content type, and stored content-addressed as
//! `profiles/{sha256}.{ext}` under the media root.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::paths;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No image was uploaded.")]
    Empty,
    #[error("Upload a valid image (PNG, JPEG, GIF or WebP).")]
    UnsupportedFormat,
    #[error("Image is too large (limit {limit} bytes).")]
    TooLarge { limit: usize },
    #[error("The upload could not be read.")]
    Malformed,
    #[error("failed to store image: {0}")]
    Storage(#[from] std::io::Error),
}

impl UploadError {
    /// Whether the client is at fault (shown inline rather than as a 500)
    pub fn is_user_error(&self) -> bool {
        !matches!(self, UploadError::Storage(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }

    /// Sniff the format from magic bytes
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageFormat::Webp)
        } else {
            None
        }
    }
}

/// Validate and write a profile image, returning its path relative to the media root
pub fn store_profile_image(media_root: &Path, bytes: &[u8], max_bytes: usize) -> Result<String, UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::Empty);
    }
    if bytes.len() > max_bytes {
        return Err(UploadError::TooLarge { limit: max_bytes });
    }
    let format = ImageFormat::detect(bytes).ok_or(UploadError::UnsupportedFormat)?;

    let digest = hex::encode(Sha256::digest(bytes));
    let file_name = format!("{}.{}", digest, format.extension());

    let dir = paths::profiles_dir(media_root);
    fs::create_dir_all(&dir)?;
    let target = dir.join(&file_name);
    if !target.exists() {
        fs::write(&target, bytes)?;
        tracing::info!("Stored profile image {}", target.display());
    }

    Ok(format!("{}/{}", paths::PROFILES_SUBDIR, file_name))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Smallest byte string that sniffs as PNG
    pub(crate) fn png_bytes() -> Vec<u8> {
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 13, b'I', b'H', b'D', b'R']);
        bytes
    }

    #[test]
    fn test_detect_formats() {
        assert_eq!(ImageFormat::detect(&png_bytes()), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::detect(b"GIF89a....."), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::detect(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageFormat::Webp));
        assert_eq!(ImageFormat::detect(b"<svg xmlns=...>"), None);
        assert_eq!(ImageFormat::detect(b"RIFF\0\0\0\0WAVE"), None);
    }

    #[test]
    fn test_store_is_content_addressed() {
        let temp = TempDir::new().unwrap();
        let first = store_profile_image(temp.path(), &png_bytes(), 1024).unwrap();
        let second = store_profile_image(temp.path(), &png_bytes(), 1024).unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("profiles/"));
        assert!(first.ends_with(".png"));
        assert_eq!(fs::read(temp.path().join(&first)).unwrap(), png_bytes());
    }

    #[test]
    fn test_rejections() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            store_profile_image(temp.path(), &[], 1024),
            Err(UploadError::Empty)
        ));
        assert!(matches!(
            store_profile_image(temp.path(), b"plain text", 1024),
            Err(UploadError::UnsupportedFormat)
        ));
        assert!(matches!(
            store_profile_image(temp.path(), &png_bytes(), 4),
            Err(UploadError::TooLarge { limit: 4 })
        ));
        assert!(!paths::profiles_dir(temp.path()).exists());
    }
}
