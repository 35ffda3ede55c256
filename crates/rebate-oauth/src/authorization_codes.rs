//! Single-use authorization codes bound to a client, user, redirect URI,
//! and PKCE challenge.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info};

use rebate_core::defaults::AUTHORIZATION_CODE_LIFETIME_SECS;
use rebate_core::{
    AuthorizationCode, AuthorizationCodeRecord, Client, Clock, Error, NewAuthorizationCode,
    OAuthStore, Result, User,
};
use rebate_crypto::random_token;

use crate::pkce::is_valid_challenge;
use crate::revocation::RevocationEngine;

#[derive(Clone)]
pub struct AuthorizationCodeStore {
    store: Arc<dyn OAuthStore>,
    clock: Arc<dyn Clock>,
    revocation: RevocationEngine,
}

impl AuthorizationCodeStore {
    pub fn new(store: Arc<dyn OAuthStore>, clock: Arc<dyn Clock>) -> Self {
        let revocation = RevocationEngine::new(store.clone(), clock.clone());
        Self {
            store,
            clock,
            revocation,
        }
    }

    /// Persist a fresh code with a ten-minute lifetime.
    pub async fn issue(
        &self,
        new: NewAuthorizationCode,
        client: &Client,
        user: &User,
    ) -> Result<AuthorizationCode> {
        if !client.has_redirect_uri(&new.redirect_uri) {
            return Err(Error::InvalidInput(
                "redirect_uri is not registered for this client".into(),
            ));
        }
        if !is_valid_challenge(&new.code_challenge, new.code_challenge_method) {
            return Err(Error::InvalidInput("malformed code_challenge".into()));
        }

        let now = self.clock.now();
        let code = AuthorizationCode {
            id: random_token(),
            client_id: client.id.clone(),
            user_id: user.id,
            redirect_uri: new.redirect_uri,
            scope: new.scope,
            code_challenge: new.code_challenge,
            code_challenge_method: new.code_challenge_method,
            expires_at: now + Duration::seconds(AUTHORIZATION_CODE_LIFETIME_SECS),
            revoked: false,
            created_at: now,
        };
        self.store.insert_code(&code).await?;

        info!(
            subsystem = "oauth",
            component = "authorization_codes",
            op = "issue",
            client_id = %client.id,
            user_id = %user.id,
            method = %code.code_challenge_method,
            "Authorization code issued"
        );
        Ok(code)
    }

    /// A live code with its client and user. Missing, expired, and consumed
    /// codes all come back as `None`.
    pub async fn retrieve(&self, code: &str) -> Result<Option<AuthorizationCodeRecord>> {
        let Some(row) = self.store.find_code(code, self.clock.now()).await? else {
            debug!(
                subsystem = "oauth",
                component = "authorization_codes",
                op = "retrieve",
                "Authorization code not usable"
            );
            return Ok(None);
        };

        let Some(stored) = self.store.find_client(&row.client_id).await? else {
            return Ok(None);
        };
        let Some(user) = self.store.find_user(row.user_id).await? else {
            return Ok(None);
        };

        Ok(Some(AuthorizationCodeRecord {
            code: row,
            client: stored.client,
            user,
        }))
    }

    /// Consume the code. `true` only for the single winning caller.
    pub async fn revoke(&self, code: &str) -> Result<bool> {
        self.revocation.revoke_authorization_code(code).await
    }
}
