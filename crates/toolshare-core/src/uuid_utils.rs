//! UUID v7 utilities for time-ordered identifiers.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
///
/// UUIDv7 embeds a Unix timestamp (milliseconds) in the first 48 bits, so
/// category ids sort by creation time.
///
/// ```
/// use toolshare_core::uuid_utils::{is_v7, new_v7};
///
/// assert!(is_v7(&new_v7()));
/// ```
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Check whether a UUID is version 7.
#[inline]
pub fn is_v7(id: &Uuid) -> bool {
    id.get_version_num() == 7
}

/// Extract the creation timestamp embedded in a UUIDv7.
///
/// Returns `None` for other UUID versions.
pub fn extract_timestamp(id: &Uuid) -> Option<DateTime<Utc>> {
    if !is_v7(id) {
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
        assert!(is_v7(&new_v7()));
        assert!(!is_v7(&Uuid::new_v4()));
    }

    #[test]
    fn test_v7_ids_are_ordered() {
        let a = new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = new_v7();
        assert!(a < b);
    }

    #[test]
    fn test_extract_timestamp_close_to_now() {
        let before = Utc::now().timestamp_millis();
        let ts = extract_timestamp(&new_v7()).unwrap().timestamp_millis();
        let after = Utc::now().timestamp_millis();
        assert!(ts >= before - 1 && ts <= after + 1);
    }

    #[test]
    fn test_extract_timestamp_rejects_v4() {
        assert!(extract_timestamp(&Uuid::new_v4()).is_none());
    }
}
