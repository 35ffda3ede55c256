//! HS256 access token encoding and decoding.
//!
//! Claims are `{jti, scope, nbf, iss, sub, exp}`. Time-based claims are
//! checked by the caller against its [`Clock`](rebate_core::Clock), never
//! against the system time inside `jsonwebtoken`.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use rebate_core::{Error, Result};

/// Access token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub jti: String,
    /// Space-delimited scope.
    pub scope: String,
    pub nbf: i64,
    pub iss: String,
    /// User id.
    pub sub: String,
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

/// Why a verified decode rejected a token.
#[derive(Debug)]
pub enum VerifyFailure {
    /// Signature, algorithm, or encoding mismatch: tampering or a key defect.
    Signature(String),
    /// Well-signed but unacceptable claims (issuer, shape).
    Claims(String),
}

/// Sign `claims` with an HS256 key.
pub fn encode_token(claims: &Claims, key: &[u8; 32]) -> Result<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(key),
    )
    .map_err(|e| Error::Token(e.to_string()))
}

/// Read the claims without checking the signature. `None` for anything malformed.
///
/// Only used to find the `jti` before the persisted row is consulted.
pub fn decode_unverified(token: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims)
}

/// Verify the HS256 signature and issuer, returning the claims.
pub fn decode_verified(
    token: &str,
    key: &[u8; 32],
    issuer: &str,
) -> std::result::Result<Claims, VerifyFailure> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);

    decode::<Claims>(token, &DecodingKey::from_secret(key), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidIssuer | ErrorKind::MissingRequiredClaim(_) => {
                VerifyFailure::Claims(e.to_string())
            }
            _ => VerifyFailure::Signature(e.to_string()),
        })
}
