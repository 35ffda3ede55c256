//! In-memory implementation of the OAuth storage traits.
//!
//! Mirrors the Postgres semantics exactly: expiry is checked inside lookups,
//! and the conditional updates (code consumption, rotation, per-user
//! revocation, the watermark check on rotated pairs) run under a single
//! `Mutex` so they are atomic with respect to each other. Used by unit and integration tests and local development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use rebate_core::{
    AccessToken, AccessTokenRecord, AuthorizationCode, AuthorizationCodeRepository, CleanupCounts,
    ClientRepository, Error, RefreshToken, RefreshTokenRecord, Result, RevocationCounts,
    StoredClient, TokenRepository, User, UserRepository,
};

use crate::store::lineage_revoked;

#[derive(Default)]
struct State {
    clients: HashMap<String, StoredClient>,
    users: HashMap<Uuid, User>,
    codes: HashMap<String, AuthorizationCode>,
    access_tokens: HashMap<String, AccessToken>,
    refresh_tokens: HashMap<String, RefreshToken>,
    /// Per-user revoke-all watermark.
    tokens_revoked_at: HashMap<Uuid, DateTime<Utc>>,
}

impl State {
    fn refresh_for_access(&self, access_token_id: &str) -> Option<&RefreshToken> {
        self.refresh_tokens
            .values()
            .find(|rt| rt.access_token_id == access_token_id)
    }
}

/// Shared in-memory store. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored access tokens, revoked or not.
    pub async fn access_token_count(&self) -> usize {
        self.state.lock().await.access_tokens.len()
    }

    /// Raw access token row regardless of state.
    pub async fn access_token_row(&self, jti: &str) -> Option<AccessToken> {
        self.state.lock().await.access_tokens.get(jti).cloned()
    }

    /// Raw authorization code row regardless of state.
    pub async fn code_row(&self, code: &str) -> Option<AuthorizationCode> {
        self.state.lock().await.codes.get(code).cloned()
    }
}

#[async_trait]
impl ClientRepository for MemoryStore {
    async fn find_client(&self, client_id: &str) -> Result<Option<StoredClient>> {
        Ok(self.state.lock().await.clients.get(client_id).cloned())
    }

    async fn insert_client(&self, client: &StoredClient) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.clients.contains_key(&client.client.id) {
            return Err(Error::InvalidInput(format!(
                "client {} already exists",
                client.client.id
            )));
        }
        state
            .clients
            .insert(client.client.id.clone(), client.clone());
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.users.contains_key(&user.id) {
            return Err(Error::InvalidInput(format!("user {} already exists", user.id)));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }
}

#[async_trait]
impl AuthorizationCodeRepository for MemoryStore {
    async fn insert_code(&self, code: &AuthorizationCode) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.codes.contains_key(&code.id) {
            return Err(Error::InvalidInput("duplicate authorization code".to_string()));
        }
        state.codes.insert(code.id.clone(), code.clone());
        Ok(())
    }

    async fn find_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<AuthorizationCode>> {
        let state = self.state.lock().await;
        Ok(state
            .codes
            .get(code)
            .filter(|c| !c.revoked && c.expires_at > now)
            .cloned())
    }

    async fn consume_code(&self, code: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.codes.get_mut(code) {
            Some(c) if !c.revoked && c.expires_at > now => {
                c.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_expired_codes(&self, before: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock().await;
        let len = state.codes.len();
        state.codes.retain(|_, c| c.expires_at >= before);
        Ok((len - state.codes.len()) as u64)
    }
}

#[async_trait]
impl TokenRepository for MemoryStore {
    async fn insert_token_pair(
        &self,
        access: &AccessToken,
        refresh: Option<&RefreshToken>,
        rotated_from: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(parent_id) = rotated_from {
            let parent_created_at = state.refresh_tokens.get(parent_id).map(|rt| rt.created_at);
            let watermark = state.tokens_revoked_at.get(&access.user_id).copied();
            if lineage_revoked(watermark, parent_created_at) {
                return Err(Error::Revoked(format!(
                    "tokens of user {} were revoked",
                    access.user_id
                )));
            }
        }
        if state.access_tokens.contains_key(&access.id)
            || refresh.is_some_and(|rt| state.refresh_tokens.contains_key(&rt.id))
        {
            return Err(Error::InvalidInput("duplicate token id".to_string()));
        }
        state
            .access_tokens
            .insert(access.id.clone(), access.clone());
        if let Some(refresh) = refresh {
            state
                .refresh_tokens
                .insert(refresh.id.clone(), refresh.clone());
        }
        Ok(())
    }

    async fn find_access_token(
        &self,
        jti: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AccessTokenRecord>> {
        let state = self.state.lock().await;
        let Some(access) = state.access_tokens.get(jti) else {
            return Ok(None);
        };
        if access.revoked || access.expires_at <= now {
            return Ok(None);
        }
        let refresh_token = state.refresh_for_access(&access.id).cloned();
        if refresh_token.as_ref().is_some_and(|rt| rt.revoked) {
            return Ok(None);
        }
        let (Some(client), Some(user)) = (
            state.clients.get(&access.client_id),
            state.users.get(&access.user_id),
        ) else {
            return Ok(None);
        };

        Ok(Some(AccessTokenRecord {
            access_token: access.clone(),
            client: client.client.clone(),
            user: user.clone(),
            refresh_token,
        }))
    }

    async fn find_refresh_token(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>> {
        let state = self.state.lock().await;
        let Some(refresh) = state.refresh_tokens.get(id) else {
            return Ok(None);
        };
        if refresh.expires_at <= now {
            return Ok(None);
        }
        let Some(access) = state.access_tokens.get(&refresh.access_token_id) else {
            return Ok(None);
        };
        let (Some(client), Some(user)) = (
            state.clients.get(&access.client_id),
            state.users.get(&access.user_id),
        ) else {
            return Ok(None);
        };

        Ok(Some(RefreshTokenRecord {
            refresh_token: refresh.clone(),
            access_token: access.clone(),
            client: client.client.clone(),
            user: user.clone(),
        }))
    }

    async fn find_refresh_token_row(&self, id: &str) -> Result<Option<RefreshToken>> {
        Ok(self.state.lock().await.refresh_tokens.get(id).cloned())
    }

    async fn rotate_refresh_token(&self, id: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        let access_token_id = match state.refresh_tokens.get_mut(id) {
            Some(rt) if !rt.revoked => {
                rt.revoked = true;
                rt.access_token_id.clone()
            }
            _ => return Ok(false),
        };
        if let Some(at) = state.access_tokens.get_mut(&access_token_id) {
            at.revoked = true;
        }
        Ok(true)
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RevocationCounts> {
        let mut state = self.state.lock().await;
        let watermark = state.tokens_revoked_at.entry(user_id).or_insert(now);
        *watermark = (*watermark).max(now);

        let mut counts = RevocationCounts::default();
        let mut user_access_ids = Vec::new();

        for at in state.access_tokens.values_mut() {
            if at.user_id != user_id {
                continue;
            }
            user_access_ids.push(at.id.clone());
            if !at.revoked {
                at.revoked = true;
                counts.access_tokens += 1;
            }
        }
        for rt in state.refresh_tokens.values_mut() {
            if !rt.revoked && user_access_ids.contains(&rt.access_token_id) {
                rt.revoked = true;
                counts.refresh_tokens += 1;
            }
        }
        Ok(counts)
    }

    async fn delete_expired_tokens(&self, before: DateTime<Utc>) -> Result<CleanupCounts> {
        let mut state = self.state.lock().await;

        let refresh_before = state.refresh_tokens.len();
        state.refresh_tokens.retain(|_, rt| rt.expires_at >= before);
        let refresh_tokens = (refresh_before - state.refresh_tokens.len()) as u64;

        let anchored: Vec<String> = state
            .refresh_tokens
            .values()
            .map(|rt| rt.access_token_id.clone())
            .collect();
        let access_before = state.access_tokens.len();
        state
            .access_tokens
            .retain(|id, at| at.expires_at >= before || anchored.contains(id));
        let access_tokens = (access_before - state.access_tokens.len()) as u64;

        Ok(CleanupCounts {
            authorization_codes: 0,
            access_tokens,
            refresh_tokens,
        })
    }
}
