//! Core traits for rebate storage abstractions.
//!
//! These traits define the interfaces that concrete stores must satisfy.
//! `rebate-db` provides a Postgres implementation and an in-memory one with
//! the same atomic semantics.
//!
//! Lookups that take `now` apply the expiry check inside the lookup itself,
//! so an expired row is indistinguishable from a missing one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// CLIENT / USER DIRECTORY
// =============================================================================

/// Read access to registered OAuth clients.
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Exact-match lookup by client id.
    async fn find_client(&self, client_id: &str) -> Result<Option<StoredClient>>;

    /// Register a client. Used for seeding and fixtures.
    async fn insert_client(&self, client: &StoredClient) -> Result<()>;
}

/// Read access to the user-identity store.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>>;

    async fn insert_user(&self, user: &User) -> Result<()>;
}

// =============================================================================
// AUTHORIZATION CODES
// =============================================================================

/// Storage for single-use authorization codes.
#[async_trait]
pub trait AuthorizationCodeRepository: Send + Sync {
    async fn insert_code(&self, code: &AuthorizationCode) -> Result<()>;

    /// Fetch a code that is unrevoked and unexpired at `now`.
    async fn find_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<AuthorizationCode>>;

    /// Mark a code consumed.
    ///
    /// Single conditional update: returns `true` only for the call that
    /// flipped `revoked` from false to true while the code was unexpired at `now`.
    async fn consume_code(&self, code: &str, now: DateTime<Utc>) -> Result<bool>;

    /// Delete codes that expired before `before`.
    async fn delete_expired_codes(&self, before: DateTime<Utc>) -> Result<u64>;
}

// =============================================================================
// TOKENS
// =============================================================================

/// Storage for access/refresh token pairs.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Persist an access token and, optionally, its refresh token in one transaction.
    ///
    /// `rotated_from` is the refresh token the pair replaces. When the user's
    /// tokens were revoked at or after that token was issued, nothing is
    /// written and the call fails with [`Error::Revoked`](crate::Error::Revoked).
    /// The check and the insert are serialized against
    /// [`revoke_all_for_user`](Self::revoke_all_for_user), so a pair can
    /// never slip in behind a cascade.
    async fn insert_token_pair(
        &self,
        access: &AccessToken,
        refresh: Option<&RefreshToken>,
        rotated_from: Option<&str>,
    ) -> Result<()>;

    /// Load a live access token by `jti` with client, user, and refresh token.
    ///
    /// `None` when missing, revoked, expired at `now`, or when its paired
    /// refresh token is revoked.
    async fn find_access_token(&self, jti: &str, now: DateTime<Utc>)
        -> Result<Option<AccessTokenRecord>>;

    /// Load a refresh token by internal id with access token, client, and user.
    ///
    /// `None` when missing or expired at `now`. Revoked rows are returned.
    async fn find_refresh_token(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>>;

    /// Load the bare refresh token row regardless of state.
    async fn find_refresh_token_row(&self, id: &str) -> Result<Option<RefreshToken>>;

    /// Revoke a refresh token and its access token if the refresh token is unrevoked.
    ///
    /// Single conditional update: returns `true` only for the winning caller.
    async fn rotate_refresh_token(&self, id: &str) -> Result<bool>;

    /// Revoke every access and refresh token belonging to `user_id` in one statement.
    ///
    /// Also records `now` as the user's revocation watermark, which blocks
    /// rotated pairs descending from tokens issued up to that instant.
    async fn revoke_all_for_user(&self, user_id: Uuid, now: DateTime<Utc>)
        -> Result<RevocationCounts>;

    /// Delete token rows that expired before `before`.
    async fn delete_expired_tokens(&self, before: DateTime<Utc>) -> Result<CleanupCounts>;
}

/// Everything the OAuth service needs from storage.
pub trait OAuthStore:
    ClientRepository + UserRepository + AuthorizationCodeRepository + TokenRepository
{
}

impl<T> OAuthStore for T where
    T: ClientRepository + UserRepository + AuthorizationCodeRepository + TokenRepository
{
}
