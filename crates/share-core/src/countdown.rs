//! Countdown formatting and clocks
//!
//! All timestamps are Unix seconds (`i64`), matching what the ledger stores.

use std::sync::atomic::{AtomicI64, Ordering};
use tokio::time::Instant;

/// Display value for a grant whose countdown has reached zero
pub const EXPIRED_LABEL: &str = "Expired";

/// Format a countdown as `"{h}h {m}m {s}s"`, or `"Expired"` when `<= 0`
///
/// Hours are not rolled over into days.
pub fn format_remaining_time(seconds_left: i64) -> String {
    if seconds_left <= 0 {
        return EXPIRED_LABEL.to_string();
    }
    let hours = seconds_left / 3600;
    let minutes = (seconds_left % 3600) / 60;
    let seconds = seconds_left % 60;
    format!("{}h {}m {}s", hours, minutes, seconds)
}

/// Source of "now" for countdowns and grants
pub trait Clock: Send + Sync {
    /// Current Unix time in seconds
    fn now(&self) -> i64;
}

/// Wall-clock time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        ManualClock {
            now: AtomicI64::new(start),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Unix time derived from the tokio clock
///
/// Follows `tokio::time::pause`/`advance`, so timer-driven code can be
/// driven deterministically in tests and simulations.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin_unix: i64,
    origin: Instant,
}

impl TokioClock {
    /// A clock reading `origin_unix` right now
    pub fn starting_at(origin_unix: i64) -> Self {
        TokioClock {
            origin_unix,
            origin: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> i64 {
        let elapsed = Instant::now().saturating_duration_since(self.origin);
        self.origin_unix + elapsed.as_secs() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    #[test]
    fn test_format_examples() {
        assert_eq!(format_remaining_time(1), "0h 0m 1s");
        assert_eq!(format_remaining_time(59), "0h 0m 59s");
        assert_eq!(format_remaining_time(60), "0h 1m 0s");
        assert_eq!(format_remaining_time(3_600), "1h 0m 0s");
        assert_eq!(format_remaining_time(90_061), "25h 1m 1s");
    }

    #[test]
    fn test_format_expired() {
        assert_eq!(format_remaining_time(0), EXPIRED_LABEL);
        assert_eq!(format_remaining_time(-1), EXPIRED_LABEL);
        assert_eq!(format_remaining_time(i64::MIN), EXPIRED_LABEL);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        clock.advance(5);
        assert_eq!(clock.now(), 1_005);
        clock.set(42);
        assert_eq!(clock.now(), 42);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2020-01-01
        assert!(SystemClock.now() > 1_577_836_800);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_follows_paused_time() {
        let clock = TokioClock::starting_at(1_000);
        assert_eq!(clock.now(), 1_000);
        tokio::time::advance(Duration::from_millis(1_500)).await;
        assert_eq!(clock.now(), 1_001);
        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(clock.now(), 1_002);
    }

    fn parse_countdown(display: &str) -> i64 {
        let parts: Vec<i64> = display
            .split(' ')
            .map(|p| p[..p.len() - 1].parse().unwrap())
            .collect();
        parts[0] * 3600 + parts[1] * 60 + parts[2]
    }

    proptest! {
        /// Same input, same output; display decodes back to the input
        #[test]
        fn format_is_deterministic(secs in 1i64..10_000_000) {
            let first = format_remaining_time(secs);
            prop_assert_eq!(&first, &format_remaining_time(secs));
            prop_assert_eq!(parse_countdown(&first), secs);
        }

        /// Minutes and seconds always stay below 60
        #[test]
        fn format_components_in_range(secs in 1i64..10_000_000) {
            let display = format_remaining_time(secs);
            let parts: Vec<&str> = display.split(' ').collect();
            prop_assert_eq!(parts.len(), 3);
            let minutes: i64 = parts[1].trim_end_matches('m').parse().unwrap();
            let seconds: i64 = parts[2].trim_end_matches('s').parse().unwrap();
            prop_assert!(minutes < 60);
            prop_assert!(seconds < 60);
        }

        /// Every non-positive input is "Expired"
        #[test]
        fn non_positive_is_expired(secs in i64::MIN..=0i64) {
            prop_assert_eq!(format_remaining_time(secs), EXPIRED_LABEL);
        }

        /// Countdown strictly decreases while time moves toward expiry
        #[test]
        fn countdown_is_monotonic(expiry in 1_000i64..1_000_000, steps in 1usize..200) {
            let start = expiry - steps as i64;
            let mut previous = i64::MAX;
            for now in start..expiry {
                let shown = parse_countdown(&format_remaining_time(expiry - now));
                prop_assert!(shown < previous);
                previous = shown;
            }
            for now in expiry..expiry + 3 {
                prop_assert_eq!(format_remaining_time(expiry - now), EXPIRED_LABEL);
            }
        }
    }
}
