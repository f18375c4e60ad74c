//! Wall-clock helpers shared by the capability codec and the garbage collector

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch for `t` (negative before 1970).
pub fn unix_secs(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// Nanoseconds since the Unix epoch for `t`, saturating at zero.
pub fn unix_nanos(t: SystemTime) -> u128 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

/// Current Unix time in seconds.
pub fn now_unix() -> i64 {
    unix_secs(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_unix_secs_before_epoch() {
        let t = UNIX_EPOCH - Duration::from_secs(5);
        assert_eq!(unix_secs(t), -5);
        assert_eq!(unix_nanos(t), 0);
    }

    #[test]
    fn test_unix_secs_after_epoch() {
        let t = UNIX_EPOCH + Duration::from_millis(1_700_000_000_500);
        assert_eq!(unix_secs(t), 1_700_000_000);
        assert_eq!(unix_nanos(t), 1_700_000_000_500_000_000);
    }
}
