//! Centralized default constants for the rebate token lifecycle.
//!
//! **This module is the single source of truth** for lifetimes, token
//! shapes, and protocol limits. Other crates reference these constants
//! instead of defining their own magic numbers.

// =============================================================================
// LIFETIMES
// =============================================================================

/// Authorization code lifetime in seconds (10 minutes).
pub const AUTHORIZATION_CODE_LIFETIME_SECS: i64 = 600;

/// Default access token lifetime in seconds (1 hour).
pub const ACCESS_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Default refresh token lifetime in seconds (30 days).
pub const REFRESH_TOKEN_LIFETIME_SECS: i64 = 30 * 24 * 3600;

/// Revoked/expired rows are kept this long before cleanup deletes them.
pub const TOKEN_AUDIT_RETENTION_DAYS: i64 = 30;

// =============================================================================
// TOKEN SHAPE
// =============================================================================

/// Token type reported by the token endpoint.
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Default `iss` claim when no issuer URL is configured.
pub const DEFAULT_ISSUER: &str = "rebate-auth";

// =============================================================================
// PKCE (RFC 7636)
// =============================================================================

/// Minimum code_verifier length.
pub const PKCE_VERIFIER_MIN_LEN: usize = 43;

/// Maximum code_verifier length.
pub const PKCE_VERIFIER_MAX_LEN: usize = 128;

// =============================================================================
// BACKGROUND CLEANUP
// =============================================================================

/// Interval between expired-state cleanup passes in seconds.
pub const CLEANUP_INTERVAL_SECS: u64 = 3600;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifetimes_are_ordered() {
        assert!(AUTHORIZATION_CODE_LIFETIME_SECS < ACCESS_TOKEN_LIFETIME_SECS);
        assert!(ACCESS_TOKEN_LIFETIME_SECS < REFRESH_TOKEN_LIFETIME_SECS);
    }

    #[test]
    fn test_pkce_bounds_match_rfc7636() {
        assert_eq!(PKCE_VERIFIER_MIN_LEN, 43);
        assert_eq!(PKCE_VERIFIER_MAX_LEN, 128);
    }
}
