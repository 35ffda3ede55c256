//! # rebate-crypto
//!
//! Cryptographic primitives for the rebate token lifecycle.
//!
//! ## Cryptographic Primitives
//!
//! - **Key derivation**: HKDF-SHA256 over a single application secret
//!   (per-client access token signing keys, one refresh sealing key)
//! - **Symmetric cipher**: AES-256-GCM (AEAD) for refresh token blobs
//! - **Hashing**: SHA-256 for client secrets and PKCE S256
//! - **Comparison**: constant-time equality for secrets
//! - **Random generation**: thread-local CSPRNG
//!
//! ## Example
//!
//! ```rust
//! use rebate_crypto::{AppSecret, RefreshTokenSealer};
//!
//! let secret = AppSecret::generate();
//! let sealer = RefreshTokenSealer::new(&secret).unwrap();
//!
//! let blob = sealer.seal("internal-refresh-id").unwrap();
//! assert_eq!(sealer.open(&blob).unwrap(), "internal-refresh-id");
//! ```

pub mod cipher;
pub mod error;
pub mod format;
pub mod kdf;
pub mod sealed;

// Re-export commonly used types
pub use error::{CryptoError, CryptoResult};
pub use format::{
    base64url_decode, base64url_encode, constant_time_eq, random_token, sha256_base64url,
    sha256_hex,
};
pub use kdf::{AppSecret, DerivedKey, MIN_SECRET_LENGTH};
pub use sealed::RefreshTokenSealer;
