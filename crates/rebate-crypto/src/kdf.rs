//! Key derivation from the global application secret using HKDF-SHA256.
//!
//! No per-client key material is stored. Each client's access token signing
//! key is derived on demand from (application secret, client id), and the
//! refresh token sealing key from (application secret, fixed label).
//! Replacing the application secret therefore invalidates every outstanding
//! access token and refresh blob at once.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};
use crate::format::base64_decode_any;

/// Minimum application secret length in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Domain separation prefix for access token signing keys. The client id is appended.
const HKDF_INFO_ACCESS_TOKEN: &[u8] = b"rebate-access-token-v1:";

/// Domain separation context for the refresh token sealing key.
const HKDF_INFO_REFRESH_TOKEN: &[u8] = b"rebate-refresh-token-v1";

/// Key wrapper with automatic zeroization on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; 32],
}

impl DerivedKey {
    /// Create a new derived key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { key: bytes }
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// The global application secret all token keys are derived from.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AppSecret {
    bytes: Vec<u8>,
}

impl std::fmt::Debug for AppSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppSecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl AppSecret {
    /// Wrap raw secret bytes. At least [`MIN_SECRET_LENGTH`] bytes are required.
    pub fn from_bytes(bytes: Vec<u8>) -> CryptoResult<Self> {
        if bytes.len() < MIN_SECRET_LENGTH {
            let len = bytes.len();
            let mut bytes = bytes;
            bytes.zeroize();
            return Err(CryptoError::InvalidKey(format!(
                "expected at least {} bytes, got {}",
                MIN_SECRET_LENGTH, len
            )));
        }
        Ok(Self { bytes })
    }

    /// Decode a base64 (standard or url-safe) encoded secret.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let decoded = base64_decode_any(encoded.trim())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Self::from_bytes(decoded)
    }

    /// Load a secret from a keyfile (raw bytes or base64 text).
    pub fn load_keyfile(path: &std::path::Path) -> CryptoResult<Self> {
        let contents = std::fs::read(path)?;

        let cleaned: String = String::from_utf8_lossy(&contents)
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        match base64_decode_any(&cleaned) {
            Ok(decoded) if decoded.len() >= MIN_SECRET_LENGTH => Self::from_bytes(decoded),
            _ if contents.len() >= MIN_SECRET_LENGTH => Self::from_bytes(contents),
            _ => Err(CryptoError::InvalidKeyfile(format!(
                "Expected at least {} bytes of key material",
                MIN_SECRET_LENGTH
            ))),
        }
    }

    /// Generate a random 32-byte secret.
    pub fn generate() -> Self {
        Self {
            bytes: crate::cipher::generate_random::<32>().to_vec(),
        }
    }

    /// Derive a 256-bit key with HKDF-SHA256 under the given context.
    pub fn derive(&self, info: &[u8]) -> CryptoResult<DerivedKey> {
        let hkdf = Hkdf::<Sha256>::new(None, &self.bytes);
        let mut key = [0u8; 32];
        hkdf.expand(info, &mut key)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(DerivedKey { key })
    }

    /// Signing key for access tokens issued to `client_id`.
    pub fn client_signing_key(&self, client_id: &str) -> CryptoResult<DerivedKey> {
        let mut info = Vec::with_capacity(HKDF_INFO_ACCESS_TOKEN.len() + client_id.len());
        info.extend_from_slice(HKDF_INFO_ACCESS_TOKEN);
        info.extend_from_slice(client_id.as_bytes());
        self.derive(&info)
    }

    /// Key used to seal refresh token ids.
    pub fn refresh_sealing_key(&self) -> CryptoResult<DerivedKey> {
        self.derive(HKDF_INFO_REFRESH_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use tempfile::tempdir;

    fn secret() -> AppSecret {
        AppSecret::from_bytes(vec![7u8; 32]).unwrap()
    }

    #[test]
    fn test_from_bytes_rejects_short_secret() {
        let result = AppSecret::from_bytes(vec![1u8; 31]);
        assert!(matches!(result, Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_from_base64() {
        let encoded = base64::engine::general_purpose::STANDARD.encode([9u8; 48]);
        assert!(AppSecret::from_base64(&encoded).is_ok());
        assert!(AppSecret::from_base64("c2hvcnQ=").is_err());
        assert!(AppSecret::from_base64("not base64 at all!").is_err());
    }

    #[test]
    fn test_client_keys_are_deterministic() {
        let a = secret().client_signing_key("client-1").unwrap();
        let b = secret().client_signing_key("client-1").unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_client_keys_differ_per_client() {
        let s = secret();
        let a = s.client_signing_key("client-1").unwrap();
        let b = s.client_signing_key("client-2").unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_rotating_secret_changes_every_key() {
        let old = secret();
        let new = AppSecret::from_bytes(vec![8u8; 32]).unwrap();
        assert_ne!(
            old.client_signing_key("c").unwrap().as_bytes(),
            new.client_signing_key("c").unwrap().as_bytes()
        );
        assert_ne!(
            old.refresh_sealing_key().unwrap().as_bytes(),
            new.refresh_sealing_key().unwrap().as_bytes()
        );
    }

    #[test]
    fn test_sealing_key_separated_from_signing_keys() {
        let s = secret();
        // A client named like the refresh label must not collide with it.
        let spoof = s.client_signing_key("").unwrap();
        assert_ne!(spoof.as_bytes(), s.refresh_sealing_key().unwrap().as_bytes());
    }

    #[test]
    fn test_debug_redacted() {
        let debug_str = format!("{:?} {:?}", secret(), DerivedKey::from_bytes([0u8; 32]));
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("7, 7"));
    }

    #[test]
    fn test_load_keyfile_base64() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("oauth.key");
        let encoded = base64::engine::general_purpose::STANDARD.encode([3u8; 32]);
        std::fs::write(&path, format!("{}\n", encoded)).unwrap();

        let loaded = AppSecret::load_keyfile(&path).unwrap();
        let expected = AppSecret::from_bytes(vec![3u8; 32]).unwrap();
        assert_eq!(
            loaded.client_signing_key("c").unwrap().as_bytes(),
            expected.client_signing_key("c").unwrap().as_bytes()
        );
    }

    #[test]
    fn test_load_keyfile_raw() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw.key");
        std::fs::write(&path, [0xffu8; 32]).unwrap();

        assert!(AppSecret::load_keyfile(&path).is_ok());
    }

    #[test]
    fn test_load_keyfile_too_short() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.key");
        std::fs::write(&path, [0u8; 16]).unwrap();

        let result = AppSecret::load_keyfile(&path);
        assert!(matches!(result, Err(CryptoError::InvalidKeyfile(_))));
    }
}
