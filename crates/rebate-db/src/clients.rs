//! Client directory storage.

use async_trait::async_trait;
use tracing::debug;

use rebate_core::{ClientRepository, Error, GrantType, Result, StoredClient};

use crate::store::{stored_client_from_row, PgOAuthStore, CLIENT_COLUMNS};

#[async_trait]
impl ClientRepository for PgOAuthStore {
    async fn find_client(&self, client_id: &str) -> Result<Option<StoredClient>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM oauth_client c WHERE c.id = $1",
            CLIENT_COLUMNS
        ))
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(stored_client_from_row))
    }

    async fn insert_client(&self, stored: &StoredClient) -> Result<()> {
        let client = &stored.client;
        let grants: Vec<&str> = client.grants.iter().map(GrantType::as_str).collect();

        sqlx::query(
            r#"INSERT INTO oauth_client (
                id, name, secret_hash, redirect_uris, grants, user_id,
                access_token_lifetime_secs, refresh_token_lifetime_secs
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&stored.secret_hash)
        .bind(&client.redirect_uris)
        .bind(&grants)
        .bind(client.user_id)
        .bind(client.access_token_lifetime_secs)
        .bind(client.refresh_token_lifetime_secs)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "clients",
            op = "insert",
            client_id = %client.id,
            confidential = stored.secret_hash.is_some(),
            "Registered OAuth client"
        );
        Ok(())
    }
}
