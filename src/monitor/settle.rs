//! Settle detection: has a file stopped being touched long enough to read?
//!
//! This is a heuristic, not a lock. A writer that pauses for longer than the
//! threshold can still have its file picked up half-written.

use std::fs::Metadata;
use std::time::{Duration, SystemTime};

/// Check whether a file last accessed at `last_access` has been idle for
/// strictly longer than `threshold` as of `now`.
///
/// An access time in the future of `now` is never settled.
#[must_use]
pub fn is_settled(last_access: SystemTime, now: SystemTime, threshold: Duration) -> bool {
    now.duration_since(last_access)
        .is_ok_and(|idle| idle > threshold)
}

/// Last access time of a file, falling back to the modification time where
/// the platform does not track access.
///
/// # Errors
///
/// Returns an error if neither timestamp is available.
pub fn last_touched(metadata: &Metadata) -> std::io::Result<SystemTime> {
    metadata.accessed().or_else(|_| metadata.modified())
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_millis(50);

    #[test]
    fn test_settled_after_threshold() {
        let now = SystemTime::now();
        assert!(is_settled(now - Duration::from_millis(51), now, THRESHOLD));
        assert!(is_settled(now - Duration::from_secs(3600), now, THRESHOLD));
    }

    #[test]
    fn test_not_settled_within_threshold() {
        let now = SystemTime::now();
        assert!(!is_settled(now, now, THRESHOLD));
        assert!(!is_settled(now - Duration::from_millis(10), now, THRESHOLD));
    }

    #[test]
    fn test_boundary_is_not_settled() {
        let now = SystemTime::now();
        assert!(!is_settled(now - THRESHOLD, now, THRESHOLD));
    }

    #[test]
    fn test_future_access_not_settled() {
        let now = SystemTime::now();
        assert!(!is_settled(now + Duration::from_secs(5), now, THRESHOLD));
    }

    #[test]
    fn test_zero_threshold() {
        let now = SystemTime::now();
        assert!(is_settled(now - Duration::from_nanos(1), now, Duration::ZERO));
        assert!(!is_settled(now, now, Duration::ZERO));
    }

    #[test]
    fn test_last_touched_reads_metadata() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let metadata = tmp.as_file().metadata().unwrap();
        let touched = last_touched(&metadata).unwrap();
        assert!(touched <= SystemTime::now() + Duration::from_secs(1));
    }
}
