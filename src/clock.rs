//! Wall clock source for artifact names and collection tokens.

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant, for reproducible output.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Creates a clock fixed at the given Unix timestamp in seconds.
    ///
    /// Out-of-range values fall back to the Unix epoch.
    pub fn at_unix(seconds: i64) -> Self {
        Self(DateTime::<Utc>::from_timestamp(seconds, 0).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Timestamp fragment used in artifact file names, e.g. `20231114_221320`.
pub fn file_stamp(clock: &dyn Clock) -> String {
    clock.now().format("%Y%m%d_%H%M%S").to_string()
}

/// Collection token derived from the clock. Not unique across calls in the same millisecond.
pub fn collection_token(clock: &dyn Clock) -> String {
    format!("flowspec-{}", clock.now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_formats() {
        let clock = FixedClock::at_unix(1_700_000_000);
        assert_eq!(file_stamp(&clock), "20231114_221320");
        assert_eq!(collection_token(&clock), "flowspec-1700000000000");
    }

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
