//! Connection pool for the token store.
//!
//! Refresh rotation and revoke-all both take a `FOR SHARE` / `FOR UPDATE`
//! lock on the owning `app_user` row. Every session therefore carries an
//! `idle_in_transaction_session_timeout`, so a caller that stalls mid-rotation
//! cannot pin that lock, and a `statement_timeout` bounds the bulk revoke
//! statements.

use std::str::FromStr;
use std::time::{Duration, Instant};

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use rebate_core::{Error, Result};

/// Reported to PostgreSQL as `application_name`.
pub const APPLICATION_NAME: &str = "rebate-auth";

/// Pool and session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a request waits for a free connection.
    pub acquire_timeout: Duration,
    /// Server-side cap on a single statement. `None` leaves the server default.
    pub statement_timeout: Option<Duration>,
    /// Server-side cap on an idle open transaction.
    pub idle_in_transaction_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            statement_timeout: Some(Duration::from_secs(30)),
            idle_in_transaction_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl PoolConfig {
    /// Reject settings the pool cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(Error::Config(
                "pool max_connections must be at least 1".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(Error::Config(format!(
                "pool min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.acquire_timeout.is_zero() {
            return Err(Error::Config(
                "pool acquire_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Runtime parameters sent with each new session, in milliseconds.
    pub fn session_parameters(&self) -> Vec<(&'static str, String)> {
        [
            ("statement_timeout", self.statement_timeout),
            (
                "idle_in_transaction_session_timeout",
                self.idle_in_transaction_timeout,
            ),
        ]
        .into_iter()
        .filter_map(|(name, timeout)| timeout.map(|t| (name, t.as_millis().to_string())))
        .collect()
    }

    fn connect_options(&self, database_url: &str) -> Result<PgConnectOptions> {
        let options = PgConnectOptions::from_str(database_url)
            .map_err(Error::Database)?
            .application_name(APPLICATION_NAME);
        Ok(options.options(self.session_parameters()))
    }
}

/// Open a pool to `database_url` with the given settings.
pub async fn create_pool(database_url: &str, config: &PoolConfig) -> Result<PgPool> {
    config.validate()?;
    let connect_options = config.connect_options(database_url)?;
    let start = Instant::now();

    info!(
        subsystem = "db",
        component = "pool",
        op = "create",
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        acquire_timeout_ms = config.acquire_timeout.as_millis() as u64,
        "Creating database connection pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "established",
        pool_size = pool.size(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Database connection pool established"
    );
    Ok(pool)
}

/// Log pool occupancy; warns when every connection is checked out.
pub fn log_pool_metrics(pool: &PgPool) {
    let size = pool.size();
    let idle = pool.num_idle();
    debug!(subsystem = "db", component = "pool", pool_size = size, pool_idle = idle, "Pool health");
    if idle == 0 && size > 0 {
        warn!(
            subsystem = "db",
            component = "pool",
            pool_size = size,
            "Connection pool has no idle connections"
        );
    }
}
