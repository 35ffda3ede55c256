//! Bearer access token verification.
//!
//! Order matters: the persisted row is consulted before the signature, and
//! the signing key is derived from the client id stored on that row, never
//! from anything the caller supplies.

use std::sync::Arc;

use tracing::{debug, error};

use rebate_core::{AccessTokenRecord, Clock, Error, OAuthStore, Result};
use rebate_crypto::AppSecret;

use crate::issuer::signing_key;
use crate::jwt::{decode_unverified, decode_verified, VerifyFailure};

#[derive(Clone)]
pub struct TokenVerifier {
    store: Arc<dyn OAuthStore>,
    clock: Arc<dyn Clock>,
    secret: AppSecret,
    issuer: String,
}

impl TokenVerifier {
    pub fn new(
        store: Arc<dyn OAuthStore>,
        clock: Arc<dyn Clock>,
        secret: AppSecret,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            secret,
            issuer: issuer.into(),
        }
    }

    /// Resolve a bearer token to its live record.
    ///
    /// `Ok(None)` for malformed, unknown, revoked, or expired tokens.
    /// `Err(Error::SignatureInvalid)` when the row is live but the signature
    /// does not verify under the row's client key.
    pub async fn verify(&self, token: &str) -> Result<Option<AccessTokenRecord>> {
        let Some(unverified) = decode_unverified(token) else {
            debug!(
                subsystem = "oauth",
                component = "verifier",
                op = "verify",
                reason = "malformed",
                "Access token rejected"
            );
            return Ok(None);
        };

        let now = self.clock.now();
        let Some(record) = self.store.find_access_token(&unverified.jti, now).await? else {
            debug!(
                subsystem = "oauth",
                component = "verifier",
                op = "verify",
                jti = %unverified.jti,
                reason = "not_live",
                "Access token rejected"
            );
            return Ok(None);
        };

        let key = signing_key(&self.secret, &record.access_token.client_id)?;
        let claims = match decode_verified(token, key.as_bytes(), &self.issuer) {
            Ok(claims) => claims,
            Err(VerifyFailure::Signature(detail)) => {
                error!(
                    subsystem = "oauth",
                    component = "verifier",
                    op = "verify",
                    jti = %record.access_token.id,
                    client_id = %record.access_token.client_id,
                    user_id = %record.access_token.user_id,
                    error = %detail,
                    "Access token signature invalid for a live token id"
                );
                return Err(Error::SignatureInvalid(format!(
                    "jti {}",
                    record.access_token.id
                )));
            }
            Err(VerifyFailure::Claims(detail)) => {
                debug!(
                    subsystem = "oauth",
                    component = "verifier",
                    op = "verify",
                    jti = %record.access_token.id,
                    reason = "claims",
                    error = %detail,
                    "Access token rejected"
                );
                return Ok(None);
            }
        };

        let ts = now.timestamp();
        if claims.exp <= ts || claims.nbf > ts || claims.sub != record.user.id.to_string() {
            debug!(
                subsystem = "oauth",
                component = "verifier",
                op = "verify",
                jti = %record.access_token.id,
                reason = "time_or_subject",
                "Access token rejected"
            );
            return Ok(None);
        }

        Ok(Some(record))
    }
}
