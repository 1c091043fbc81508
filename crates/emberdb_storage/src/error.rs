//! Error types for persistence operations.

use std::io;
use thiserror::Error;

/// Result type for persistence operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while loading, saving or deleting a database blob.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The encrypted payload is malformed or failed authentication.
    #[error("invalid encrypted payload: {0}")]
    InvalidEncryptedPayload(String),

    /// Encryption failed.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Key derivation from the passphrase failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// The compressed payload could not be decoded.
    #[error("compression error: {0}")]
    Compression(String),

    /// The database name cannot be mapped to a storage location.
    #[error("invalid database name: {0:?}")]
    InvalidName(String),
}

impl StorageError {
    /// Creates an invalid encrypted payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidEncryptedPayload(message.into())
    }

    /// Creates a compression error.
    pub fn compression(message: impl Into<String>) -> Self {
        Self::Compression(message.into())
    }

    /// Returns true if this error is an I/O "not found" error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}
