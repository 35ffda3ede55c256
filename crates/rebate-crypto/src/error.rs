//! Error types for cryptographic operations.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Application secret missing, too short, or malformed.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Key derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed - wrong key, tampered or truncated data.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Invalid keyfile format or size.
    #[error("Invalid keyfile: {0}")]
    InvalidKeyfile(String),

    /// Invalid encoding.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
