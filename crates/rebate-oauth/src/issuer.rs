//! Token issuance.
//!
//! An access token is an HS256 JWT signed with a key derived from the
//! application secret and the client id; only its metadata is persisted,
//! keyed by `jti`. A refresh token is a random internal id handed out as an
//! AES-GCM sealed blob. Both rows go in with one transaction.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use rebate_core::uuid_utils::new_jti;
use rebate_core::{
    join_scope, AccessToken, Client, Clock, Error, IssuedTokens, OAuthStore, RefreshToken,
    Result, User,
};
use rebate_crypto::{random_token, AppSecret, DerivedKey, RefreshTokenSealer};

use crate::jwt::{decode_unverified, encode_token, Claims};

/// Derive the HS256 key for a client. Shared with the verifier.
pub(crate) fn signing_key(secret: &AppSecret, client_id: &str) -> Result<DerivedKey> {
    secret
        .client_signing_key(client_id)
        .map_err(|e| Error::Crypto(e.to_string()))
}

#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn OAuthStore>,
    clock: Arc<dyn Clock>,
    secret: AppSecret,
    sealer: Arc<RefreshTokenSealer>,
    issuer: String,
}

impl TokenIssuer {
    pub fn new(
        store: Arc<dyn OAuthStore>,
        clock: Arc<dyn Clock>,
        secret: AppSecret,
        sealer: Arc<RefreshTokenSealer>,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            secret,
            sealer,
            issuer: issuer.into(),
        }
    }

    /// Sign a new access token. Nothing is persisted until [`save`](Self::save).
    pub fn generate_access_token(
        &self,
        client: &Client,
        user: &User,
        scope: &[String],
    ) -> Result<String> {
        let now = self.clock.now();
        let claims = Claims {
            jti: new_jti(),
            scope: join_scope(scope),
            nbf: now.timestamp(),
            iss: self.issuer.clone(),
            sub: user.id.to_string(),
            exp: (now + Duration::seconds(client.access_token_lifetime_secs)).timestamp(),
        };
        let key = signing_key(&self.secret, &client.id)?;
        encode_token(&claims, key.as_bytes())
    }

    /// Seal a new random refresh token id.
    pub fn generate_refresh_token(&self) -> Result<String> {
        self.sealer
            .seal(&random_token())
            .map_err(|e| Error::Crypto(e.to_string()))
    }

    /// Persist a generated pair.
    ///
    /// The `jti` and expiry come back out of the JWT, the refresh id out of the
    /// sealed blob. Returns the pair with both expiries filled in.
    ///
    /// A pair rotated from a token whose user has since been revoked-all is
    /// refused with [`Error::Revoked`].
    pub async fn save(
        &self,
        tokens: IssuedTokens,
        client: &Client,
        user: &User,
    ) -> Result<IssuedTokens> {
        let now = self.clock.now();
        let claims = decode_unverified(&tokens.access_token)
            .ok_or_else(|| Error::Token("access token is not a well-formed JWT".into()))?;
        if claims.sub != user.id.to_string() {
            return Err(Error::Token("access token subject does not match user".into()));
        }
        let access_expires_at = claims
            .expires_at()
            .ok_or_else(|| Error::Token("access token exp out of range".into()))?;

        let access = AccessToken {
            id: claims.jti.clone(),
            user_id: user.id,
            client_id: client.id.clone(),
            scope: tokens.scope.clone(),
            revoked: false,
            expires_at: access_expires_at,
            created_at: now,
        };

        let refresh = match &tokens.refresh_token {
            Some(blob) => {
                let id = self
                    .sealer
                    .open(blob)
                    .map_err(|e| Error::Crypto(e.to_string()))?;
                Some(RefreshToken {
                    id,
                    access_token_id: access.id.clone(),
                    revoked: false,
                    expires_at: refresh_expiry(&tokens, client, now),
                    created_at: now,
                })
            }
            None => None,
        };

        if let Err(e) = self
            .store
            .insert_token_pair(&access, refresh.as_ref(), tokens.rotated_from.as_deref())
            .await
        {
            if matches!(e, Error::Revoked(_)) {
                warn!(
                    subsystem = "oauth",
                    component = "issuer",
                    op = "save",
                    client_id = %client.id,
                    user_id = %user.id,
                    jti = %access.id,
                    "Rotated pair refused; user's tokens were revoked mid-rotation"
                );
            }
            return Err(e);
        }

        info!(
            subsystem = "oauth",
            component = "issuer",
            op = "save",
            client_id = %client.id,
            user_id = %user.id,
            jti = %access.id,
            with_refresh = refresh.is_some(),
            "Token pair issued"
        );

        Ok(IssuedTokens {
            access_token_expires_at: access_expires_at,
            refresh_token_expires_at: refresh.as_ref().map(|rt| rt.expires_at),
            ..tokens
        })
    }

    /// Generate and persist a pair in one call.
    pub async fn mint(
        &self,
        client: &Client,
        user: &User,
        scope: &[String],
        with_refresh: bool,
    ) -> Result<IssuedTokens> {
        let access_token = self.generate_access_token(client, user, scope)?;
        let refresh_token = if with_refresh {
            Some(self.generate_refresh_token()?)
        } else {
            None
        };
        let tokens = IssuedTokens {
            access_token,
            // Overwritten from the JWT by save().
            access_token_expires_at: self.clock.now(),
            refresh_token,
            refresh_token_expires_at: None,
            scope: scope.to_vec(),
            rotated_from: None,
        };
        self.save(tokens, client, user).await
    }
}

fn refresh_expiry(tokens: &IssuedTokens, client: &Client, now: DateTime<Utc>) -> DateTime<Utc> {
    tokens
        .refresh_token_expires_at
        .unwrap_or_else(|| now + Duration::seconds(client.refresh_token_lifetime_secs))
}
