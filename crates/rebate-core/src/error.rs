//! Error types for the rebate token lifecycle.
//!
//! Lookups that miss (unknown client, consumed code, expired or revoked token)
//! are not errors: they surface as `Ok(None)` / `Ok(false)` so the protocol
//! layer can answer with a generic `invalid_client` / `invalid_grant`.

use thiserror::Error;

/// Result type alias using rebate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for rebate operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Token signature did not verify against the derived client key.
    ///
    /// Never a normal denial: either the token was tampered with or the
    /// signing key derivation is broken.
    #[error("Token signature invalid: {0}")]
    SignatureInvalid(String),

    /// The grant's lineage was revoked while it was being exercised.
    ///
    /// Raised when a rotated pair would be stored after the user's tokens
    /// were revoked; the protocol layer answers `invalid_grant`.
    #[error("Grant revoked: {0}")]
    Revoked(String),

    /// Encryption, decryption, or key derivation failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Token could not be encoded or decoded
    #[error("Token error: {0}")]
    Token(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Authentication/authorization failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// True for failures that indicate tampering or a key defect.
    pub fn is_security_alert(&self) -> bool {
        matches!(self, Error::SignatureInvalid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("client".to_string());
        assert_eq!(err.to_string(), "Not found: client");
    }

    #[test]
    fn test_error_display_signature_invalid() {
        let err = Error::SignatureInvalid("jti abc".to_string());
        assert_eq!(err.to_string(), "Token signature invalid: jti abc");
    }

    #[test]
    fn test_error_display_crypto() {
        let err = Error::Crypto("bad key".to_string());
        assert_eq!(err.to_string(), "Crypto error: bad key");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("OAUTH_SECRET missing".to_string());
        assert_eq!(err.to_string(), "Configuration error: OAUTH_SECRET missing");
    }

    #[test]
    fn test_only_signature_failures_are_security_alerts() {
        assert!(Error::SignatureInvalid("x".into()).is_security_alert());
        assert!(!Error::NotFound("x".into()).is_security_alert());
        assert!(!Error::Token("x".into()).is_security_alert());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
