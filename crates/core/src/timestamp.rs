//! Microsecond-precision timestamp type
//!
//! Cache entries record when they were last hydrated; this newtype is that
//! clock reading. Stored as microseconds since Unix epoch, comparable and
//! orderable, with no exposed raw arithmetic.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Microseconds since Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Current moment
    ///
    /// Returns epoch (0) if the system clock reads before Unix epoch
    /// (e.g. clock stepped backwards).
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as u64)
    }

    /// From microseconds since epoch
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// Microseconds since epoch
    #[inline]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Duration since an earlier timestamp
    ///
    /// Returns `None` if `earlier` is actually later than `self`.
    pub fn duration_since(&self, earlier: Timestamp) -> Option<Duration> {
        if self.0 >= earlier.0 {
            Some(Duration::from_micros(self.0 - earlier.0))
        } else {
            None
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0 / 1_000_000;
        let micros = self.0 % 1_000_000;
        write!(f, "{}.{:06}", secs, micros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_now_advances() {
        let before = Timestamp::now();
        std::thread::sleep(Duration::from_millis(1));
        let after = Timestamp::now();
        assert!(after > before);
    }

    #[test]
    fn test_timestamp_ordering() {
        let t1 = Timestamp::from_micros(100);
        let t2 = Timestamp::from_micros(200);
        assert!(t1 < t2);
        assert_eq!(t1, Timestamp::from_micros(100));
    }

    #[test]
    fn test_timestamp_duration_since() {
        let t1 = Timestamp::from_micros(1000);
        let t2 = Timestamp::from_micros(3000);
        assert_eq!(t2.duration_since(t1).unwrap().as_micros(), 2000);
        assert!(t1.duration_since(t2).is_none());
    }

    #[test]
    fn test_timestamp_display() {
        assert_eq!(Timestamp::from_micros(1_234_567_890).to_string(), "1234.567890");
        assert_eq!(Timestamp::EPOCH.to_string(), "0.000000");
    }

    #[test]
    fn test_timestamp_serialization() {
        let ts = Timestamp::from_micros(1_234_567);
        let json = serde_json::to_string(&ts).unwrap();
        let restored: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, restored);
    }
}
