//! Access/refresh token pair storage.
//!
//! Rotation and per-user revocation are single statements. The winner of a
//! concurrent rotation is decided by the row lock taken by
//! `UPDATE ... WHERE revoked = FALSE`; the loser sees zero affected rows.
//!
//! Revoke-all and the insert of a rotated pair both lock the user row first
//! (exclusive and shared respectively). Whichever commits second sees the
//! other's effect: either the insert finds the watermark and refuses, or the
//! bulk revoke's fresh snapshot includes the new pair.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use rebate_core::{
    AccessToken, AccessTokenRecord, CleanupCounts, Error, RefreshToken, RefreshTokenRecord,
    Result, RevocationCounts, TokenRepository,
};

use crate::store::{
    access_token_from_row, lineage_revoked, refresh_token_from_row, stored_client_from_row,
    user_from_row, PgOAuthStore, ACCESS_COLUMNS, CLIENT_COLUMNS, REFRESH_COLUMNS, USER_COLUMNS,
};

#[async_trait]
impl TokenRepository for PgOAuthStore {
    async fn insert_token_pair(
        &self,
        access: &AccessToken,
        refresh: Option<&RefreshToken>,
        rotated_from: Option<&str>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        if let Some(parent_id) = rotated_from {
            let row = sqlx::query(
                r#"SELECT u.tokens_revoked_at, rt.created_at AS parent_created_at
                FROM app_user u
                LEFT JOIN oauth_refresh_token rt ON rt.id = $2
                WHERE u.id = $1
                FOR SHARE OF u"#,
            )
            .bind(access.user_id)
            .bind(parent_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?;

            let revoked = match row {
                Some(row) => lineage_revoked(
                    row.get("tokens_revoked_at"),
                    row.get("parent_created_at"),
                ),
                None => true,
            };
            if revoked {
                debug!(
                    subsystem = "db",
                    component = "tokens",
                    op = "insert_token_pair",
                    user_id = %access.user_id,
                    "Refused rotated pair behind a revoke-all"
                );
                return Err(Error::Revoked(format!(
                    "tokens of user {} were revoked",
                    access.user_id
                )));
            }
        }

        sqlx::query(
            r#"INSERT INTO oauth_access_token (
                id, user_id, client_id, scope, revoked, expires_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(&access.id)
        .bind(access.user_id)
        .bind(&access.client_id)
        .bind(&access.scope)
        .bind(access.revoked)
        .bind(access.expires_at)
        .bind(access.created_at)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if let Some(refresh) = refresh {
            sqlx::query(
                r#"INSERT INTO oauth_refresh_token (
                    id, access_token_id, revoked, expires_at, created_at
                ) VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(&refresh.id)
            .bind(&refresh.access_token_id)
            .bind(refresh.revoked)
            .bind(refresh.expires_at)
            .bind(refresh.created_at)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn find_access_token(
        &self,
        jti: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AccessTokenRecord>> {
        let row = sqlx::query(&format!(
            r#"SELECT {}, {}, {}, {}
            FROM oauth_access_token at
            JOIN oauth_client c ON c.id = at.client_id
            JOIN app_user u ON u.id = at.user_id
            LEFT JOIN oauth_refresh_token rt ON rt.access_token_id = at.id
            WHERE at.id = $1
              AND at.revoked = FALSE
              AND at.expires_at > $2
              AND COALESCE(rt.revoked, FALSE) = FALSE"#,
            ACCESS_COLUMNS, CLIENT_COLUMNS, USER_COLUMNS, REFRESH_COLUMNS
        ))
        .bind(jti)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|row| AccessTokenRecord {
            access_token: access_token_from_row(&row),
            client: stored_client_from_row(&row).client,
            user: user_from_row(&row),
            refresh_token: refresh_token_from_row(&row),
        }))
    }

    async fn find_refresh_token(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>> {
        let row = sqlx::query(&format!(
            r#"SELECT {}, {}, {}, {}
            FROM oauth_refresh_token rt
            JOIN oauth_access_token at ON at.id = rt.access_token_id
            JOIN oauth_client c ON c.id = at.client_id
            JOIN app_user u ON u.id = at.user_id
            WHERE rt.id = $1 AND rt.expires_at > $2"#,
            REFRESH_COLUMNS, ACCESS_COLUMNS, CLIENT_COLUMNS, USER_COLUMNS
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let refresh_token = refresh_token_from_row(&row)
            .ok_or_else(|| Error::Internal("refresh token row without id".to_string()))?;

        Ok(Some(RefreshTokenRecord {
            refresh_token,
            access_token: access_token_from_row(&row),
            client: stored_client_from_row(&row).client,
            user: user_from_row(&row),
        }))
    }

    async fn find_refresh_token_row(&self, id: &str) -> Result<Option<RefreshToken>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM oauth_refresh_token rt WHERE rt.id = $1",
            REFRESH_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().and_then(refresh_token_from_row))
    }

    async fn rotate_refresh_token(&self, id: &str) -> Result<bool> {
        let row = sqlx::query(
            r#"WITH rt AS (
                UPDATE oauth_refresh_token SET revoked = TRUE
                WHERE id = $1 AND revoked = FALSE
                RETURNING access_token_id
            ), at AS (
                UPDATE oauth_access_token SET revoked = TRUE
                WHERE id IN (SELECT access_token_id FROM rt)
                RETURNING id
            )
            SELECT (SELECT COUNT(*) FROM rt) AS rotated,
                   (SELECT COUNT(*) FROM at) AS access_revoked"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let rotated: i64 = row.get("rotated");
        Ok(rotated == 1)
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RevocationCounts> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "UPDATE app_user SET tokens_revoked_at = GREATEST(tokens_revoked_at, $2) WHERE id = $1",
        )
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let row = sqlx::query(
            r#"WITH at AS (
                UPDATE oauth_access_token SET revoked = TRUE
                WHERE user_id = $1 AND revoked = FALSE
                RETURNING id
            ), rt AS (
                UPDATE oauth_refresh_token SET revoked = TRUE
                WHERE revoked = FALSE
                  AND access_token_id IN (SELECT id FROM oauth_access_token WHERE user_id = $1)
                RETURNING id
            )
            SELECT (SELECT COUNT(*) FROM at) AS access_revoked,
                   (SELECT COUNT(*) FROM rt) AS refresh_revoked"#,
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        let access_revoked: i64 = row.get("access_revoked");
        let refresh_revoked: i64 = row.get("refresh_revoked");

        info!(
            subsystem = "db",
            component = "tokens",
            op = "revoke_all_for_user",
            user_id = %user_id,
            access_revoked,
            refresh_revoked,
            "Revoked all tokens for user"
        );

        Ok(RevocationCounts {
            access_tokens: access_revoked as u64,
            refresh_tokens: refresh_revoked as u64,
        })
    }

    async fn delete_expired_tokens(&self, before: DateTime<Utc>) -> Result<CleanupCounts> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let refresh_tokens = sqlx::query("DELETE FROM oauth_refresh_token WHERE expires_at < $1")
            .bind(before)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?
            .rows_affected();

        // An expired access token still anchors a live refresh token; keep it.
        let access_tokens = sqlx::query(
            r#"DELETE FROM oauth_access_token at
            WHERE at.expires_at < $1
              AND NOT EXISTS (
                  SELECT 1 FROM oauth_refresh_token rt WHERE rt.access_token_id = at.id
              )"#,
        )
        .bind(before)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?
        .rows_affected();

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "tokens",
            op = "delete_expired",
            access_tokens,
            refresh_tokens,
            "Deleted expired tokens"
        );

        Ok(CleanupCounts {
            authorization_codes: 0,
            access_tokens,
            refresh_tokens,
        })
    }
}
