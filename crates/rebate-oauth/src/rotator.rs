//! Refresh token rotation with reuse detection.
//!
//! A refresh token is good for exactly one exchange. The exchange revokes the
//! old pair with a single conditional update; whoever loses that update and
//! finds the row already revoked is replaying a rotated token, and every
//! credential of the user is revoked in response.

use std::sync::Arc;

use tracing::{debug, warn};

use rebate_core::{Clock, OAuthStore, RefreshTokenRecord, Result, RotationOutcome};
use rebate_crypto::RefreshTokenSealer;

use crate::revocation::RevocationEngine;

#[derive(Clone)]
pub struct RefreshRotator {
    store: Arc<dyn OAuthStore>,
    clock: Arc<dyn Clock>,
    sealer: Arc<RefreshTokenSealer>,
    revocation: RevocationEngine,
}

impl RefreshRotator {
    pub fn new(
        store: Arc<dyn OAuthStore>,
        clock: Arc<dyn Clock>,
        sealer: Arc<RefreshTokenSealer>,
    ) -> Self {
        let revocation = RevocationEngine::new(store.clone(), clock.clone());
        Self {
            store,
            clock,
            sealer,
            revocation,
        }
    }

    /// Unseal a presented blob and load its record.
    ///
    /// `None` for blobs that fail to unseal and for missing or expired rows.
    /// Revoked rows are returned as-is; [`rotate`](Self::rotate) decides what
    /// presenting one means.
    pub async fn get_refresh_token(&self, blob: &str) -> Result<Option<RefreshTokenRecord>> {
        let id = match self.sealer.open(blob) {
            Ok(id) => id,
            Err(e) => {
                debug!(
                    subsystem = "oauth",
                    component = "rotator",
                    op = "unseal",
                    error = %e,
                    "Refresh token rejected"
                );
                return Ok(None);
            }
        };
        self.store.find_refresh_token(&id, self.clock.now()).await
    }

    /// Revoke the presented pair, or detect reuse.
    pub async fn rotate(&self, record: &RefreshTokenRecord) -> Result<RotationOutcome> {
        let id = &record.refresh_token.id;
        if self.store.rotate_refresh_token(id).await? {
            debug!(
                subsystem = "oauth",
                component = "rotator",
                op = "rotate",
                jti = %record.access_token.id,
                client_id = %record.client.id,
                "Refresh token rotated"
            );
            return Ok(RotationOutcome::Rotated);
        }

        match self.store.find_refresh_token_row(id).await? {
            Some(row) if row.revoked => {
                let user_id = record.access_token.user_id;
                let counts = self.revocation.revoke_all_for_user(user_id).await?;
                warn!(
                    subsystem = "oauth",
                    component = "rotator",
                    op = "rotate",
                    client_id = %record.client.id,
                    user_id = %user_id,
                    jti = %record.access_token.id,
                    access_revoked = counts.access_tokens,
                    refresh_revoked = counts.refresh_tokens,
                    "Refresh token reuse detected; revoked all credentials for user"
                );
                Ok(RotationOutcome::ReuseDetected {
                    access_revoked: counts.access_tokens,
                    refresh_revoked: counts.refresh_tokens,
                })
            }
            _ => Ok(RotationOutcome::NotFound),
        }
    }

    /// Hook form of [`rotate`](Self::rotate): only whether this caller rotated.
    pub async fn revoke_token(&self, record: &RefreshTokenRecord) -> Result<bool> {
        Ok(self.rotate(record).await?.is_rotated())
    }
}
