//! Unauthenticated Session Tests
//!
//! Without an identity nothing starts and the ledger is never called.

#[cfg(test)]
mod scenarios {
    use crate::fixtures::*;
    use medshare_core::{
        AccessCommands, AccessMonitor, ExpiryTracker, LedgerError, RecordId, SharedRecord,
        SharedRecordsView, TrackerConfig,
    };
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_start_tracking_is_noop() {
        let clock = paused_clock();
        let ledger = ledger_with_records(clock.clone(), &["REC-1"]);
        let mut tracker = ExpiryTracker::new(None, ledger.clone(), clock, TrackerConfig::default());

        let already_expired = SharedRecord::new(
            RecordId::from("REC-1"),
            patient(),
            doctor(),
            START - 10,
            Default::default(),
            START,
        );
        assert!(!tracker.start(vec![already_expired]));
        assert!(!tracker.is_running());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(tracker.snapshot().is_empty());
        assert!(ledger.revoke_calls().is_empty());
        assert_eq!(ledger.read_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_reads_or_writes_without_identity() {
        let clock = paused_clock();
        let ledger = ledger_with_records(clock.clone(), &["REC-1"]);

        let mut view = SharedRecordsView::new(ledger.clone(), ledger.clone(), clock.clone(), None);
        assert_eq!(view.refresh().await.unwrap_err(), LedgerError::NotAuthenticated);

        let commands = AccessCommands::new(ledger.clone(), None);
        assert_eq!(
            commands
                .grant(&RecordId::from("REC-1"), &doctor(), Duration::from_secs(60))
                .await,
            Err(LedgerError::NotAuthenticated)
        );

        let mut monitor = AccessMonitor::new(
            ledger.clone(),
            ledger.clone(),
            clock,
            None,
            TrackerConfig::default(),
            Duration::from_secs(1),
        );
        assert_eq!(
            monitor.run_until(std::future::pending()).await,
            Err(LedgerError::NotAuthenticated)
        );

        assert_eq!(ledger.read_calls(), 0);
        assert!(ledger.revoke_calls().is_empty());
        assert_eq!(ledger.grant_expiry(&RecordId::from("REC-1"), &doctor()), None);
    }
}
