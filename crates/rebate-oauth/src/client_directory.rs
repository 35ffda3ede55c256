//! Client directory adapter.
//!
//! Lookups are exact on the id. A supplied secret must match the stored
//! SHA-256 digest; anything short of a full match is `None`.

use std::sync::Arc;

use tracing::debug;

use rebate_core::{Client, Error, NewClient, OAuthStore, Result, StoredClient};
use rebate_crypto::{constant_time_eq, sha256_hex};

#[derive(Clone)]
pub struct ClientDirectory {
    store: Arc<dyn OAuthStore>,
}

impl ClientDirectory {
    pub fn new(store: Arc<dyn OAuthStore>) -> Self {
        Self { store }
    }

    /// Hash a client secret for storage.
    pub fn hash_secret(secret: &str) -> String {
        sha256_hex(secret.as_bytes())
    }

    /// Look up a client, authenticating it when a secret is supplied.
    ///
    /// - secret supplied, confidential client: digest must match
    /// - secret supplied, public client: `None`
    /// - no secret: lookup by id alone (the caller decides whether a
    ///   confidential client may proceed without one)
    pub async fn get_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> Result<Option<Client>> {
        let Some(stored) = self.store.find_client(client_id).await? else {
            debug!(
                subsystem = "oauth",
                component = "client_directory",
                client_id,
                reason = "unknown_client",
                "Client lookup denied"
            );
            return Ok(None);
        };

        let Some(secret) = client_secret else {
            return Ok(Some(stored.client));
        };

        let matches = stored
            .secret_hash
            .as_deref()
            .is_some_and(|hash| constant_time_eq(&Self::hash_secret(secret), hash));

        if matches {
            Ok(Some(stored.client))
        } else {
            debug!(
                subsystem = "oauth",
                component = "client_directory",
                client_id,
                reason = "secret_mismatch",
                "Client lookup denied"
            );
            Ok(None)
        }
    }

    /// Exact string match against the registered redirect URIs.
    pub fn validate_redirect_uri(&self, client: &Client, redirect_uri: &str) -> bool {
        client.has_redirect_uri(redirect_uri)
    }

    /// Register a client from plaintext input. For seeding and fixtures.
    pub async fn register(&self, new: NewClient) -> Result<Client> {
        if new.id.is_empty() {
            return Err(Error::InvalidInput("client id must not be empty".into()));
        }
        if new.redirect_uris.is_empty() {
            return Err(Error::InvalidInput(
                "client needs at least one redirect URI".into(),
            ));
        }

        let access_token_lifetime_secs = new.access_lifetime();
        let refresh_token_lifetime_secs = new.refresh_lifetime();
        let secret_hash = new.secret.as_deref().map(Self::hash_secret);

        let stored = StoredClient {
            client: Client {
                id: new.id,
                name: new.name,
                redirect_uris: new.redirect_uris,
                grants: new.grants,
                user_id: new.user_id,
                is_confidential: secret_hash.is_some(),
                access_token_lifetime_secs,
                refresh_token_lifetime_secs,
            },
            secret_hash,
        };
        self.store.insert_client(&stored).await?;
        Ok(stored.client)
    }
}
