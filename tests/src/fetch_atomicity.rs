//! Aggregated Fetch Tests
//!
//! - One failing expiry read fails the whole fetch
//! - The previously shown list survives a failed refresh
//! - A running monitor keeps tracking the stale list through failures

#[cfg(test)]
mod scenarios {
    use crate::fixtures::*;
    use medshare_core::{
        fetch_shared_records, AccessCommands, AccessMonitor, Clock, LedgerError, RecordId,
        SharedRecordsView, TrackerConfig,
    };
    use std::time::Duration;

    async fn share_all(
        ledger: &std::sync::Arc<medshare_core::memory::InMemoryLedger>,
        ids: &[&str],
        secs: u64,
    ) -> anyhow::Result<()> {
        let owner = AccessCommands::new(ledger.clone(), Some(patient()));
        for id in ids {
            owner
                .grant(&RecordId::from(*id), &doctor(), Duration::from_secs(secs))
                .await?;
        }
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_failure_fails_fetch() -> anyhow::Result<()> {
        let clock = paused_clock();
        let ledger = ledger_with_records(clock.clone(), &["REC-1", "REC-2", "REC-3"]);
        share_all(&ledger, &["REC-1", "REC-2", "REC-3"], 600).await?;
        ledger.fail_expiry_reads_for(RecordId::from("REC-2"));

        let result = fetch_shared_records(ledger.as_ref(), ledger.as_ref(), &doctor(), clock.now()).await;
        assert!(matches!(result, Err(LedgerError::Read(ref msg)) if msg.contains("REC-2")));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_list() -> anyhow::Result<()> {
        let clock = paused_clock();
        let ledger = ledger_with_records(clock.clone(), &["REC-1", "REC-2"]);
        share_all(&ledger, &["REC-1"], 600).await?;

        let mut view = SharedRecordsView::new(ledger.clone(), ledger.clone(), clock, Some(doctor()));
        view.refresh().await?;
        let before = view.records().to_vec();
        assert_eq!(before.len(), 1);

        share_all(&ledger, &["REC-2"], 600).await?;
        ledger.fail_expiry_reads_for(RecordId::from("REC-2"));
        assert!(view.refresh().await.is_err());
        assert_eq!(view.records(), before.as_slice());
        assert!(view.last_error().is_some());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_tracks_stale_list_through_failures() -> anyhow::Result<()> {
        let clock = paused_clock();
        let ledger = ledger_with_records(clock.clone(), &["REC-1", "REC-2"]);
        share_all(&ledger, &["REC-1", "REC-2"], 600).await?;

        let mut monitor = AccessMonitor::new(
            ledger.clone(),
            ledger.clone(),
            clock,
            Some(doctor()),
            TrackerConfig::default(),
            Duration::from_secs(5),
        );
        let updates = monitor.subscribe();

        let ledger_in_run = ledger.clone();
        let extend_then_stop = async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            // REC-1 is extended, but REC-2 can no longer be read
            share_all(&ledger_in_run, &["REC-1"], 7_200).await.expect("extend");
            ledger_in_run.fail_expiry_reads_for(RecordId::from("REC-2"));
            tokio::time::sleep(Duration::from_secs(8)).await;
        };
        monitor.run_until(extend_then_stop).await?;

        let live = updates.borrow().clone();
        assert_eq!(live.len(), 2);
        let rec1 = live
            .iter()
            .find(|r| r.id == RecordId::from("REC-1"))
            .expect("REC-1 tracked");
        assert_eq!(rec1.expiry_time, START + 600);
        assert!(monitor.last_error().is_some());
        assert!(ledger.revoke_calls().is_empty());
        Ok(())
    }
}
