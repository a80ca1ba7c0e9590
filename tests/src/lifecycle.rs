//! Grant / Expire / Revoke Lifecycle Tests
//!
//! - Grant for two seconds, watch the countdown, expire, revoke once
//! - Stopping the tracker freezes state and issues nothing further
//! - A failing revoke is never retried for the same expiry
//! - A later re-grant is tracked and revoked again
//! - Stopping while a revoke is in flight does not block a later re-grant

#[cfg(test)]
mod scenarios {
    use crate::fixtures::*;
    use medshare_core::{
        fetch_shared_records, AccessCommands, AccessMonitor, Clock, ExpiryTracker, RecordId,
        TrackerConfig,
    };
    use std::time::Duration;

    // ========== GRANT THEN EXPIRE ==========

    #[tokio::test(start_paused = true)]
    async fn test_grant_then_expire() -> anyhow::Result<()> {
        let clock = paused_clock();
        let ledger = ledger_with_records(clock.clone(), &["REC-1"]);
        let rec = RecordId::from("REC-1");

        AccessCommands::new(ledger.clone(), Some(patient()))
            .grant(&rec, &doctor(), Duration::from_secs(2))
            .await?;

        let records = fetch_shared_records(ledger.as_ref(), ledger.as_ref(), &doctor(), clock.now()).await?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].expiry_time, START + 2);

        let mut tracker = ExpiryTracker::new(Some(doctor()), ledger.clone(), clock, TrackerConfig::default());
        assert!(tracker.start(records));

        // now = 1001
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        let live = tracker.snapshot();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].remaining_time, "0h 0m 1s");
        assert!(ledger.revoke_calls().is_empty());

        // now = 1002
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert!(tracker.snapshot().is_empty());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(ledger.revoke_calls(), vec![(rec.clone(), doctor())]);
        assert_eq!(ledger.grant_expiry(&rec, &doctor()), None);
        Ok(())
    }

    // ========== TEARDOWN ==========

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_ticking() -> anyhow::Result<()> {
        let clock = paused_clock();
        let ledger = ledger_with_records(clock.clone(), &["REC-1"]);
        AccessCommands::new(ledger.clone(), Some(patient()))
            .grant(&RecordId::from("REC-1"), &doctor(), Duration::from_secs(5))
            .await?;
        let records = fetch_shared_records(ledger.as_ref(), ledger.as_ref(), &doctor(), clock.now()).await?;

        let mut tracker = ExpiryTracker::new(Some(doctor()), ledger.clone(), clock, TrackerConfig::default());
        let updates = tracker.subscribe();
        tracker.start(records);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        tracker.stop();
        let frozen = tracker.snapshot();
        let published = updates.borrow().clone();
        assert_eq!(frozen, published);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(tracker.snapshot(), frozen);
        assert_eq!(*updates.borrow(), published);
        assert!(ledger.revoke_calls().is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_tracker_cancels_pending_work() -> anyhow::Result<()> {
        let clock = paused_clock();
        let ledger = ledger_with_records(clock.clone(), &["REC-1"]);
        AccessCommands::new(ledger.clone(), Some(patient()))
            .grant(&RecordId::from("REC-1"), &doctor(), Duration::from_secs(3))
            .await?;
        let records = fetch_shared_records(ledger.as_ref(), ledger.as_ref(), &doctor(), clock.now()).await?;

        let mut tracker = ExpiryTracker::new(Some(doctor()), ledger.clone(), clock, TrackerConfig::default());
        tracker.start(records);
        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(tracker);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(ledger.revoke_calls().is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop_with_revoke_in_flight() -> anyhow::Result<()> {
        let clock = paused_clock();
        let ledger = ledger_with_records(clock.clone(), &["REC-1"]);
        let rec = RecordId::from("REC-1");
        let owner = AccessCommands::new(ledger.clone(), Some(patient()));
        owner.grant(&rec, &doctor(), Duration::from_secs(1)).await?;
        ledger.set_revoke_delay(Some(Duration::from_secs(10)));

        let records = fetch_shared_records(ledger.as_ref(), ledger.as_ref(), &doctor(), clock.now()).await?;
        let mut tracker = ExpiryTracker::new(Some(doctor()), ledger.clone(), clock.clone(), TrackerConfig::default());
        tracker.start(records);

        // now = 1001; the revoke is held by the ledger
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(tracker.pending_revokes(), 1);
        tracker.stop();

        ledger.set_revoke_delay(None);
        owner.grant(&rec, &doctor(), Duration::from_secs(4)).await?;
        let records = fetch_shared_records(ledger.as_ref(), ledger.as_ref(), &doctor(), clock.now()).await?;
        assert_eq!(records[0].expiry_time, START + 5);
        assert!(tracker.start(records));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(tracker.snapshot().is_empty());
        assert_eq!(ledger.revoke_calls().len(), 2);
        assert_eq!(tracker.pending_revokes(), 0);
        assert_eq!(ledger.grant_expiry(&rec, &doctor()), None);
        Ok(())
    }

    // ========== SINGLE REVOKE ==========

    #[tokio::test(start_paused = true)]
    async fn test_single_revoke_across_refreshes() -> anyhow::Result<()> {
        let clock = paused_clock();
        let ledger = ledger_with_records(clock.clone(), &["REC-1"]);
        let rec = RecordId::from("REC-1");
        let owner = AccessCommands::new(ledger.clone(), Some(patient()));
        owner.grant(&rec, &doctor(), Duration::from_secs(2)).await?;

        // The grant stays on the ledger, so every refresh reports it again
        ledger.set_fail_revokes(true);

        let mut monitor = AccessMonitor::new(
            ledger.clone(),
            ledger.clone(),
            clock,
            Some(doctor()),
            TrackerConfig::default(),
            Duration::from_secs(2),
        );
        let updates = monitor.subscribe();

        let observed = ledger.clone();
        let regrant = async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            assert_eq!(observed.revoke_calls().len(), 1);

            // now = 1005; a new grant expiring at 1008 must be tracked again
            observed.clear_failures();
            owner
                .grant(&RecordId::from("REC-1"), &doctor(), Duration::from_secs(3))
                .await
                .expect("re-grant");
            tokio::time::sleep(Duration::from_secs(7)).await;
        };
        monitor.run_until(regrant).await?;

        let calls = ledger.revoke_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|key| key == &(rec.clone(), doctor())));
        assert_eq!(ledger.grant_expiry(&rec, &doctor()), None);
        assert!(updates.borrow().is_empty());
        Ok(())
    }
}
