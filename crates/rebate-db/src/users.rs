//! User-identity lookups used to stamp the token subject.

use async_trait::async_trait;
use uuid::Uuid;

use rebate_core::{Error, Result, User, UserRepository};

use crate::store::{user_from_row, PgOAuthStore, USER_COLUMNS};

#[async_trait]
impl UserRepository for PgOAuthStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM app_user u WHERE u.id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query("INSERT INTO app_user (id, email, created_at) VALUES ($1, $2, $3)")
            .bind(user.id)
            .bind(&user.email)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
