//! UUID helpers.
//!
//! Request correlation ids and user ids are UUIDv7 (time-ordered). Access
//! token identifiers (`jti`) are UUIDv4: they must be unguessable and must not
//! leak issuance time.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
///
/// # Example
///
/// ```
/// use rebate_core::uuid_utils::new_v7;
///
/// let id = new_v7();
/// assert_eq!(id.get_version_num(), 7);
/// ```
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a random token identifier for the `jti` claim.
#[inline]
pub fn new_jti() -> String {
    Uuid::new_v4().to_string()
}

/// Extract the embedded timestamp from a UUIDv7.
///
/// Returns `None` for any other UUID version.
pub fn extract_timestamp(id: &Uuid) -> Option<DateTime<Utc>> {
    if id.get_version_num() != 7 {
        return None;
    }
    let bytes = id.as_bytes();
    let millis = bytes[..6]
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    Utc.timestamp_millis_opt(millis as i64).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_v7_is_version_7() {
        assert_eq!(new_v7().get_version_num(), 7);
    }

    #[test]
    fn test_new_jti_is_v4_and_unique() {
        let a = new_jti();
        let b = new_jti();
        assert_ne!(a, b);
        let parsed = Uuid::parse_str(&a).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_extract_timestamp_roundtrip() {
        let before = Utc::now().timestamp_millis();
        let id = new_v7();
        let after = Utc::now().timestamp_millis();
        let ts = extract_timestamp(&id).unwrap().timestamp_millis();
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn test_extract_timestamp_rejects_v4() {
        assert!(extract_timestamp(&Uuid::new_v4()).is_none());
    }
}
