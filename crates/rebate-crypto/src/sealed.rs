//! Sealed refresh token blobs.
//!
//! The value handed to a client as its refresh token is never the database
//! id. It is `base64url(nonce || AES-256-GCM(id) || tag)` under a key derived
//! from the application secret, so a leaked id alone cannot be presented and
//! any modification of the blob fails authentication outright.
//!
//! ```text
//! ┌──────────────┬──────────────────────────┬──────────────┐
//! │ nonce (12 B) │ ciphertext (len(id) B)   │ tag (16 B)   │
//! └──────────────┴──────────────────────────┴──────────────┘
//! ```

use crate::cipher::{aes_gcm_decrypt, aes_gcm_encrypt, generate_nonce, NONCE_LEN, TAG_LEN};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64url_decode, base64url_encode};
use crate::kdf::{AppSecret, DerivedKey};

/// Associated data bound into every blob.
const SEALED_AAD: &[u8] = b"rebate-refresh-token";

/// Seals and opens refresh token ids.
#[derive(Debug)]
pub struct RefreshTokenSealer {
    key: DerivedKey,
}

impl RefreshTokenSealer {
    pub fn new(secret: &AppSecret) -> CryptoResult<Self> {
        Ok(Self {
            key: secret.refresh_sealing_key()?,
        })
    }

    /// Encrypt an internal id into an opaque blob. A fresh nonce is used each call.
    pub fn seal(&self, id: &str) -> CryptoResult<String> {
        let nonce = generate_nonce();
        let ciphertext = aes_gcm_encrypt(self.key.as_bytes(), &nonce, id.as_bytes(), SEALED_AAD)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(base64url_encode(&blob))
    }

    /// Recover the internal id from a blob.
    ///
    /// Any decoding, length, authentication, or UTF-8 failure is an error.
    pub fn open(&self, blob: &str) -> CryptoResult<String> {
        let raw = base64url_decode(blob)?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Decryption("sealed blob too short".into()));
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);

        let plaintext = aes_gcm_decrypt(self.key.as_bytes(), &nonce, ciphertext, SEALED_AAD)?;
        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::Decryption("sealed id is not UTF-8".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::random_token;

    fn sealer() -> RefreshTokenSealer {
        RefreshTokenSealer::new(&AppSecret::from_bytes(vec![5u8; 32]).unwrap()).unwrap()
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let s = sealer();
        for _ in 0..16 {
            let id = random_token();
            assert_eq!(s.open(&s.seal(&id).unwrap()).unwrap(), id);
        }
    }

    #[test]
    fn test_seal_is_randomized() {
        let s = sealer();
        let a = s.seal("same-id").unwrap();
        let b = s.seal("same-id").unwrap();
        assert_ne!(a, b);
        assert_eq!(s.open(&a).unwrap(), s.open(&b).unwrap());
    }

    #[test]
    fn test_blob_does_not_contain_id() {
        let s = sealer();
        let id = random_token();
        let blob = s.seal(&id).unwrap();
        assert!(!blob.contains(&id));
    }

    #[test]
    fn test_every_single_bit_flip_is_rejected() {
        let s = sealer();
        let blob = s.seal(&random_token()).unwrap();
        let raw = base64url_decode(&blob).unwrap();

        for byte in 0..raw.len() {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;
                let result = s.open(&base64url_encode(&tampered));
                assert!(
                    matches!(result, Err(CryptoError::Decryption(_))),
                    "bit {} of byte {} accepted",
                    bit,
                    byte
                );
            }
        }
    }

    #[test]
    fn test_truncated_and_garbage_blobs_rejected() {
        let s = sealer();
        let blob = s.seal("abc").unwrap();
        assert!(s.open(&blob[..blob.len() - 4]).is_err());
        assert!(s.open("").is_err());
        assert!(s.open("!!!not-base64!!!").is_err());
        assert!(s.open(&base64url_encode(&[0u8; 20])).is_err());
    }

    #[test]
    fn test_other_secret_cannot_open() {
        let blob = sealer().seal("abc").unwrap();
        let other =
            RefreshTokenSealer::new(&AppSecret::from_bytes(vec![6u8; 32]).unwrap()).unwrap();
        assert!(other.open(&blob).is_err());
    }
}
