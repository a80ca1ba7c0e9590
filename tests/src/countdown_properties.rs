//! Countdown Property Tests
//!
//! - Remaining time strictly decreases while the grant is live
//! - Exactly "Expired" once `now >= expiry`
//! - Formatting is a pure function of the seconds left
//! - The board revokes each expiry exactly once, however often it ticks

/// Parse "{h}h {m}m {s}s" back into seconds
pub fn parse_countdown(label: &str) -> Option<i64> {
    let mut total = 0i64;
    for (part, unit) in label.split(' ').zip([3_600i64, 60, 1]) {
        let digits = part.get(..part.len().checked_sub(1)?)?;
        total += digits.parse::<i64>().ok()? * unit;
    }
    Some(total)
}

#[cfg(test)]
mod property_tests {
    use super::parse_countdown;
    use crate::fixtures::*;
    use medshare_core::{
        format_remaining_time, ExpiryBoard, RecordId, SharedRecord, EXPIRED_LABEL,
    };
    use proptest::prelude::*;

    fn tracked(id: &str, expiry: i64, now: i64) -> SharedRecord {
        SharedRecord::new(
            RecordId::from(id),
            patient(),
            doctor(),
            expiry,
            Default::default(),
            now,
        )
    }

    #[test]
    fn test_parse_countdown_helper() {
        assert_eq!(parse_countdown("1h 2m 5s"), Some(3_725));
        assert_eq!(parse_countdown("0h 0m 1s"), Some(1));
        assert_eq!(parse_countdown(EXPIRED_LABEL), None);
    }

    proptest! {
        /// Countdown strictly decreases each tick until expiry, then reads "Expired"
        #[test]
        fn countdown_monotonic_then_expired(
            start in 0i64..1_000_000,
            lifetime in 1i64..500
        ) {
            let expiry = start + lifetime;
            let mut record = tracked("REC-1", expiry, start);
            let mut previous = parse_countdown(&record.remaining_time);
            prop_assert_eq!(previous, Some(lifetime));

            for now in (start + 1)..(expiry + 5) {
                record.refresh_countdown(now);
                if now < expiry {
                    let current = parse_countdown(&record.remaining_time);
                    prop_assert!(current < previous);
                    prop_assert_eq!(current, Some(expiry - now));
                    previous = current;
                } else {
                    prop_assert_eq!(record.remaining_time.as_str(), EXPIRED_LABEL);
                }
            }
        }

        /// Same input, same label; non-positive input is "Expired"
        #[test]
        fn formatting_is_idempotent(seconds in any::<i64>()) {
            let first = format_remaining_time(seconds);
            prop_assert_eq!(&first, &format_remaining_time(seconds));
            if seconds <= 0 {
                prop_assert_eq!(first.as_str(), EXPIRED_LABEL);
            } else {
                prop_assert_eq!(parse_countdown(&first), Some(seconds));
            }
        }

        /// However ticks and refreshes interleave, one revoke per expiry
        #[test]
        fn board_revokes_each_expiry_once(
            lifetimes in proptest::collection::vec(1i64..20, 1..6),
            refresh_every in 1i64..5
        ) {
            let start = START;
            let fetch = |now: i64| -> Vec<SharedRecord> {
                lifetimes
                    .iter()
                    .enumerate()
                    .map(|(i, l)| tracked(&format!("REC-{}", i), start + l, now))
                    .collect()
            };

            let mut board = ExpiryBoard::new();
            let mut issued = board.replace(fetch(start), start);
            for now in (start + 1)..(start + 30) {
                issued.extend(board.tick(now));
                if (now - start) % refresh_every == 0 {
                    // The ledger keeps reporting the grants until revokes land
                    issued.extend(board.replace(fetch(now), now));
                }
                for key in issued.clone() {
                    if let Some(expiry) = board.in_flight_expiry(&key) {
                        board.complete_revoke(&key, expiry);
                    }
                }
                for r in board.records() {
                    prop_assert!(r.expiry_time > now);
                }
            }

            prop_assert_eq!(issued.len(), lifetimes.len());
            let mut ids: Vec<String> = issued.iter().map(|(id, _)| id.to_string()).collect();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), lifetimes.len());
        }
    }
}
