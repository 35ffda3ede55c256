//! Shared revoke and cascade-revoke primitives.
//!
//! Used by the refresh rotator on reuse, by the authorization code store, and
//! by account-security flows outside the token endpoint (password change,
//! suspected compromise).

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use rebate_core::{Clock, OAuthStore, Result, RevocationCounts};

#[derive(Clone)]
pub struct RevocationEngine {
    store: Arc<dyn OAuthStore>,
    clock: Arc<dyn Clock>,
}

impl RevocationEngine {
    pub fn new(store: Arc<dyn OAuthStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Mark an authorization code consumed.
    ///
    /// Idempotent; `true` only for the call that consumed it, and never for
    /// a code that has expired in the meantime.
    pub async fn revoke_authorization_code(&self, code: &str) -> Result<bool> {
        let consumed = self.store.consume_code(code, self.clock.now()).await?;
        debug!(
            subsystem = "oauth",
            component = "revocation",
            op = "revoke_authorization_code",
            consumed,
            "Authorization code consume attempt"
        );
        Ok(consumed)
    }

    /// Revoke the pair anchored by a refresh token id, without reuse handling.
    ///
    /// `true` if this call revoked it.
    pub async fn revoke_pair(&self, refresh_token_id: &str) -> Result<bool> {
        self.store.rotate_refresh_token(refresh_token_id).await
    }

    /// Revoke every access and refresh token of a user in one statement.
    ///
    /// Pairs still being rotated from tokens issued before now are refused
    /// when they try to land.
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<RevocationCounts> {
        let counts = self
            .store
            .revoke_all_for_user(user_id, self.clock.now())
            .await?;
        info!(
            subsystem = "oauth",
            component = "revocation",
            op = "revoke_all",
            user_id = %user_id,
            access_revoked = counts.access_tokens,
            refresh_revoked = counts.refresh_tokens,
            "Revoked all credentials for user"
        );
        Ok(counts)
    }
}
