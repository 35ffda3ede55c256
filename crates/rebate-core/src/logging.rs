//! Structured logging schema and field name constants for rebate.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by standardized names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Signature failures, degraded service, requires operator attention |
//! | WARN  | Refresh token reuse and the resulting cascade revocation |
//! | INFO  | Lifecycle events (startup, shutdown), token issuance, cleanup passes |
//! | DEBUG | Denials (unknown client, consumed code), decision points |
//! | TRACE | Per-row detail |
//!
//! Token values, secrets, and refresh blobs are never logged. `jti` and
//! client/user ids are.

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across a request.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "oauth", "db", "crypto"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "issuer", "verifier", "rotator", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "mint", "verify", "rotate", "revoke_all"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// OAuth client id.
pub const CLIENT_ID: &str = "client_id";

/// User UUID.
pub const USER_ID: &str = "user_id";

/// Access token identifier (JWT `jti`).
pub const JTI: &str = "jti";

/// Grant type being exchanged.
pub const GRANT_TYPE: &str = "grant_type";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows touched by a bulk statement.
pub const ROWS_AFFECTED: &str = "rows_affected";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Database table or entity affected.
pub const DB_TABLE: &str = "db_table";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Denial reason kept internal (never sent to the client).
pub const REASON: &str = "reason";
