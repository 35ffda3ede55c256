//! Authorization code storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use rebate_core::{AuthorizationCode, AuthorizationCodeRepository, Error, Result};

use crate::store::{code_from_row, PgOAuthStore, CODE_COLUMNS};

#[async_trait]
impl AuthorizationCodeRepository for PgOAuthStore {
    async fn insert_code(&self, code: &AuthorizationCode) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO oauth_authorization_code (
                id, client_id, user_id, redirect_uri, scope,
                code_challenge, code_challenge_method, expires_at, revoked, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(&code.id)
        .bind(&code.client_id)
        .bind(code.user_id)
        .bind(&code.redirect_uri)
        .bind(&code.scope)
        .bind(&code.code_challenge)
        .bind(code.code_challenge_method.as_str())
        .bind(code.expires_at)
        .bind(code.revoked)
        .bind(code.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn find_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<AuthorizationCode>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM oauth_authorization_code ac \
             WHERE ac.id = $1 AND ac.revoked = FALSE AND ac.expires_at > $2",
            CODE_COLUMNS
        ))
        .bind(code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(code_from_row).transpose()
    }

    async fn consume_code(&self, code: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE oauth_authorization_code SET revoked = TRUE
            WHERE id = $1 AND revoked = FALSE AND expires_at > $2"#,
        )
        .bind(code)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_expired_codes(&self, before: DateTime<Utc>) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM oauth_authorization_code WHERE expires_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?
            .rows_affected();

        debug!(
            subsystem = "db",
            component = "authorization_codes",
            op = "delete_expired",
            rows_affected = deleted,
            "Deleted expired authorization codes"
        );
        Ok(deleted)
    }
}
