//! At-rest encryption for Aadhar numbers (AES-256-GCM).
//!
//! Sealed values are hex of `nonce (12 bytes) || ciphertext`. The key comes
//! from `AADHAR_KEY` (64 hex chars) or a key file generated on first start.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use std::fs;
use std::path::Path;

use crate::domain::{AadharNumber, SealedAadhar};

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("vault key must be 32 bytes of hex")]
    InvalidKey,
    #[error("failed to read or write vault key: {0}")]
    KeyFile(#[from] std::io::Error),
    #[error("encryption failed")]
    Seal,
    #[error("sealed value is corrupt or was sealed with another key")]
    Open,
}

pub struct AadharVault {
    cipher: Aes256Gcm,
}

impl AadharVault {
    pub fn from_key(key: [u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(&key.into()),
        }
    }

    pub fn from_hex(key_hex: &str) -> Result<Self, VaultError> {
        let bytes = hex::decode(key_hex.trim()).map_err(|_| VaultError::InvalidKey)?;
        let key: [u8; 32] = bytes.try_into().map_err(|_| VaultError::InvalidKey)?;
        Ok(Self::from_key(key))
    }

    /// Use `AADHAR_KEY` if set, otherwise load the key file, creating it if missing.
    pub fn load_or_create(key_path: &Path) -> Result<Self, VaultError> {
        if let Ok(key_hex) = std::env::var("AADHAR_KEY") {
            tracing::info!("Using Aadhar vault key from AADHAR_KEY env");
            return Self::from_hex(&key_hex);
        }

        if key_path.exists() {
            let key_hex = fs::read_to_string(key_path)?;
            return Self::from_hex(&key_hex);
        }

        if let Some(parent) = key_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let key: [u8; 32] = rand::random();
        fs::write(key_path, hex::encode(key))?;
        tracing::warn!(
            "Generated new Aadhar vault key at {}; back it up, sealed values cannot be read without it",
            key_path.display()
        );
        Ok(Self::from_key(key))
    }

    pub fn seal(&self, aadhar: &AadharNumber) -> Result<SealedAadhar, VaultError> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), aadhar.as_str().as_bytes())
            .map_err(|_| VaultError::Seal)?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(SealedAadhar(hex::encode(sealed)))
    }

    pub fn open(&self, sealed: &SealedAadhar) -> Result<AadharNumber, VaultError> {
        let bytes = hex::decode(&sealed.0).map_err(|_| VaultError::Open)?;
        if bytes.len() <= NONCE_LEN {
            return Err(VaultError::Open);
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| VaultError::Open)?;
        let text = String::from_utf8(plain).map_err(|_| VaultError::Open)?;
        AadharNumber::parse(&text).ok_or(VaultError::Open)
    }
}
