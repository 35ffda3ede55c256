//! The hook contract the OAuth2 protocol layer drives, and the service that
//! implements it over an [`OAuthStore`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tracing::info;
use uuid::Uuid;

use rebate_core::defaults::{DEFAULT_ISSUER, TOKEN_AUDIT_RETENTION_DAYS};
use rebate_core::{
    AccessTokenRecord, AuthorizationCode, AuthorizationCodeRecord, CleanupCounts, Client, Clock,
    Error, IssuedTokens, NewAuthorizationCode, NewClient, OAuthStore, RefreshTokenRecord, Result,
    RevocationCounts, RotationOutcome, User,
};
use rebate_crypto::{AppSecret, RefreshTokenSealer};

use crate::authorization_codes::AuthorizationCodeStore;
use crate::client_directory::ClientDirectory;
use crate::issuer::TokenIssuer;
use crate::revocation::RevocationEngine;
use crate::rotator::RefreshRotator;
use crate::verifier::TokenVerifier;

/// Hooks called by the token endpoint.
///
/// "Not found", "expired", and "revoked" are all `Ok(None)` / `Ok(false)`.
/// `Err` is reserved for infrastructure failures and
/// [`Error::SignatureInvalid`].
#[async_trait]
pub trait OAuthModel: Send + Sync {
    /// Look up a client, authenticating it when a secret is supplied.
    async fn get_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> Result<Option<Client>>;

    async fn validate_redirect_uri(&self, client: &Client, redirect_uri: &str) -> Result<bool>;

    async fn save_authorization_code(
        &self,
        code: NewAuthorizationCode,
        client: &Client,
        user: &User,
    ) -> Result<AuthorizationCode>;

    async fn get_authorization_code(&self, code: &str) -> Result<Option<AuthorizationCodeRecord>>;

    /// Consume a code. `true` only for the single winning caller.
    async fn revoke_authorization_code(&self, code: &str) -> Result<bool>;

    async fn generate_access_token(
        &self,
        client: &Client,
        user: &User,
        scope: &[String],
    ) -> Result<String>;

    async fn generate_refresh_token(
        &self,
        client: &Client,
        user: &User,
        scope: &[String],
    ) -> Result<String>;

    /// Persist a generated pair; returns it with expiries filled in.
    ///
    /// `Err(Error::Revoked)` when `tokens.rotated_from` names a token whose
    /// user was revoked-all after it was issued.
    async fn save_token(
        &self,
        tokens: IssuedTokens,
        client: &Client,
        user: &User,
    ) -> Result<IssuedTokens>;

    async fn get_access_token(&self, token: &str) -> Result<Option<AccessTokenRecord>>;

    /// May return a revoked record; hand it to [`revoke_token`](Self::revoke_token).
    async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>>;

    /// Rotate out the pair. `false` when it was already gone; presenting a
    /// rotated-out token revokes every credential of its user.
    async fn revoke_token(&self, record: &RefreshTokenRecord) -> Result<bool>;

    /// Revoke a pair at the owner's request (RFC 7009), without reuse handling.
    async fn revoke_token_pair(&self, record: &RefreshTokenRecord) -> Result<bool>;
}

/// Service-level settings.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// `iss` claim stamped on and required of every access token.
    pub issuer: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }
}

/// [`OAuthModel`] over an [`OAuthStore`], plus the operations outside the
/// hook contract (bulk revocation, cleanup, client seeding).
#[derive(Clone)]
pub struct OAuthService {
    config: OAuthConfig,
    store: Arc<dyn OAuthStore>,
    clock: Arc<dyn Clock>,
    clients: ClientDirectory,
    codes: AuthorizationCodeStore,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    rotator: RefreshRotator,
    revocation: RevocationEngine,
}

impl OAuthService {
    pub fn new(
        store: Arc<dyn OAuthStore>,
        secret: AppSecret,
        config: OAuthConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let sealer =
            Arc::new(RefreshTokenSealer::new(&secret).map_err(|e| Error::Crypto(e.to_string()))?);

        Ok(Self {
            clients: ClientDirectory::new(store.clone()),
            codes: AuthorizationCodeStore::new(store.clone(), clock.clone()),
            issuer: TokenIssuer::new(
                store.clone(),
                clock.clone(),
                secret.clone(),
                sealer.clone(),
                config.issuer.clone(),
            ),
            verifier: TokenVerifier::new(
                store.clone(),
                clock.clone(),
                secret,
                config.issuer.clone(),
            ),
            rotator: RefreshRotator::new(store.clone(), clock.clone(), sealer),
            revocation: RevocationEngine::new(store.clone(), clock.clone()),
            config,
            store,
            clock,
        })
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn store(&self) -> Arc<dyn OAuthStore> {
        self.store.clone()
    }

    /// Register a client from plaintext input.
    pub async fn register_client(&self, new: NewClient) -> Result<Client> {
        self.clients.register(new).await
    }

    /// Generate and persist a pair without going through the token endpoint.
    pub async fn mint(
        &self,
        client: &Client,
        user: &User,
        scope: &[String],
        with_refresh: bool,
    ) -> Result<IssuedTokens> {
        self.issuer.mint(client, user, scope, with_refresh).await
    }

    /// Rotate with the full outcome, reuse included.
    pub async fn rotate(&self, record: &RefreshTokenRecord) -> Result<RotationOutcome> {
        self.rotator.rotate(record).await
    }

    /// Revoke every credential of a user (password change, suspected compromise).
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<RevocationCounts> {
        self.revocation.revoke_all_for_user(user_id).await
    }

    /// Delete expired codes, and token rows past the audit retention window.
    pub async fn cleanup_expired(&self) -> Result<CleanupCounts> {
        let now = self.clock.now();
        let authorization_codes = self.store.delete_expired_codes(now).await?;
        let tokens = self
            .store
            .delete_expired_tokens(now - Duration::days(TOKEN_AUDIT_RETENTION_DAYS))
            .await?;

        let counts = CleanupCounts {
            authorization_codes,
            ..tokens
        };
        info!(
            subsystem = "oauth",
            component = "cleanup",
            op = "cleanup_expired",
            authorization_codes = counts.authorization_codes,
            access_tokens = counts.access_tokens,
            refresh_tokens = counts.refresh_tokens,
            "Expired OAuth state removed"
        );
        Ok(counts)
    }
}

#[async_trait]
impl OAuthModel for OAuthService {
    async fn get_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> Result<Option<Client>> {
        self.clients.get_client(client_id, client_secret).await
    }

    async fn validate_redirect_uri(&self, client: &Client, redirect_uri: &str) -> Result<bool> {
        Ok(self.clients.validate_redirect_uri(client, redirect_uri))
    }

    async fn save_authorization_code(
        &self,
        code: NewAuthorizationCode,
        client: &Client,
        user: &User,
    ) -> Result<AuthorizationCode> {
        self.codes.issue(code, client, user).await
    }

    async fn get_authorization_code(&self, code: &str) -> Result<Option<AuthorizationCodeRecord>> {
        self.codes.retrieve(code).await
    }

    async fn revoke_authorization_code(&self, code: &str) -> Result<bool> {
        self.codes.revoke(code).await
    }

    async fn generate_access_token(
        &self,
        client: &Client,
        user: &User,
        scope: &[String],
    ) -> Result<String> {
        self.issuer.generate_access_token(client, user, scope)
    }

    async fn generate_refresh_token(
        &self,
        _client: &Client,
        _user: &User,
        _scope: &[String],
    ) -> Result<String> {
        self.issuer.generate_refresh_token()
    }

    async fn save_token(
        &self,
        tokens: IssuedTokens,
        client: &Client,
        user: &User,
    ) -> Result<IssuedTokens> {
        self.issuer.save(tokens, client, user).await
    }

    async fn get_access_token(&self, token: &str) -> Result<Option<AccessTokenRecord>> {
        self.verifier.verify(token).await
    }

    async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>> {
        self.rotator.get_refresh_token(token).await
    }

    async fn revoke_token(&self, record: &RefreshTokenRecord) -> Result<bool> {
        self.rotator.revoke_token(record).await
    }

    async fn revoke_token_pair(&self, record: &RefreshTokenRecord) -> Result<bool> {
        self.revocation.revoke_pair(&record.refresh_token.id).await
    }
}
