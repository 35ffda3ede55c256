//! # rebate-db
//!
//! Storage layer for the rebate OAuth2 token lifecycle.
//!
//! This crate provides:
//! - Connection pool management
//! - [`PgOAuthStore`], the PostgreSQL implementation of the client, user,
//!   authorization code, and token repositories
//! - [`memory::MemoryStore`], an in-memory implementation with identical
//!   atomicity, for tests and local development
//!
//! ## Example
//!
//! ```rust,ignore
//! use chrono::Utc;
//! use rebate_db::{Database, TokenRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/rebate").await?;
//!     let counts = db.oauth.revoke_all_for_user(user_id, Utc::now()).await?;
//!     println!("Revoked {} access tokens", counts.access_tokens);
//!     Ok(())
//! }
//! ```

pub mod authorization_codes;
pub mod clients;
pub mod memory;
pub mod pool;
pub mod store;
pub mod tokens;
pub mod users;

// Test fixtures for integration tests
// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use rebate_core::{
    AuthorizationCodeRepository, ClientRepository, Error, OAuthStore, Result, TokenRepository,
    UserRepository,
};

pub use memory::MemoryStore;
pub use pool::{create_pool, log_pool_metrics, PoolConfig};
pub use store::PgOAuthStore;

/// Database handle bundling the pool and the OAuth store.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Clients, users, authorization codes, and token pairs.
    pub oauth: PgOAuthStore,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            oauth: PgOAuthStore::new(pool.clone()),
            pool,
        }
    }

    /// Connect with the default pool settings.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, &PoolConfig::default()).await
    }

    /// Connect with explicit pool settings.
    pub async fn connect_with_config(url: &str, config: &PoolConfig) -> Result<Self> {
        let pool = create_pool(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
