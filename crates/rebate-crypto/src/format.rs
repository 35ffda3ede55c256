//! Encoding helpers and random token generation.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::cipher::generate_random;
use crate::error::{CryptoError, CryptoResult};

/// Encode bytes as unpadded base64url.
pub fn base64url_encode(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode unpadded base64url.
pub fn base64url_decode(data: &str) -> CryptoResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(data)
        .map_err(|e| CryptoError::InvalidFormat(format!("Invalid base64url: {}", e)))
}

/// Decode standard base64 (padded), falling back to base64url.
pub fn base64_decode_any(data: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')))
        .map_err(|e| CryptoError::InvalidFormat(format!("Invalid base64: {}", e)))
}

/// 32 bytes of CSPRNG output as unpadded base64url (43 characters).
pub fn random_token() -> String {
    base64url_encode(&generate_random::<32>())
}

/// SHA-256 of `input`, lowercase hex.
pub fn sha256_hex(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}

/// SHA-256 of `input`, unpadded base64url. This is the PKCE S256 transform.
pub fn sha256_base64url(input: &[u8]) -> String {
    base64url_encode(&Sha256::digest(input))
}

/// Constant-time string comparison.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64url_roundtrip() {
        let original = [0xfbu8, 0xff, 0x00, 0x3e];
        let encoded = base64url_encode(&original);
        assert!(!encoded.contains('+') && !encoded.contains('/') && !encoded.contains('='));
        assert_eq!(base64url_decode(&encoded).unwrap(), original);
    }

    #[test]
    fn test_base64url_decode_invalid() {
        let result = base64url_decode("not valid!!!");
        assert!(matches!(result, Err(CryptoError::InvalidFormat(_))));
    }

    #[test]
    fn test_base64_decode_any_accepts_both_alphabets() {
        let bytes = [0xfbu8; 33];
        assert_eq!(base64_decode_any(&STANDARD.encode(bytes)).unwrap(), bytes);
        assert_eq!(base64_decode_any(&URL_SAFE_NO_PAD.encode(bytes)).unwrap(), bytes);
    }

    #[test]
    fn test_random_token_shape() {
        let a = random_token();
        let b = random_token();
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
    }

    #[test]
    fn test_sha256_base64url_rfc7636_vector() {
        // RFC 7636 Appendix B
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            sha256_base64url(verifier.as_bytes()),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("secret", "secret"));
        assert!(!constant_time_eq("secret", "secreT"));
        assert!(!constant_time_eq("secret", "secret2"));
    }
}
