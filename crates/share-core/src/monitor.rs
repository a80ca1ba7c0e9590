//! Periodic refresh feeding the expiry tracker
//!
//! Data flow: ledger read -> [`SharedRecordsView`] -> [`ExpiryTracker`]
//! countdown -> revoke on expiry -> next refresh reflects the ledger again.

use crate::countdown::Clock;
use crate::error::LedgerError;
use crate::fetch::SharedRecordsView;
use crate::ledger::{AccessLedger, RecordCatalog};
use crate::tracker::{ExpiryTracker, TrackerConfig};
use crate::types::{Address, SharedRecord};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default period between full ledger refreshes
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Keeps the tracked list in step with the ledger
pub struct AccessMonitor<C, L: AccessLedger> {
    view: SharedRecordsView<C, L>,
    tracker: ExpiryTracker<L>,
    refresh_interval: Duration,
}

impl<C, L> AccessMonitor<C, L>
where
    C: RecordCatalog,
    L: AccessLedger,
{
    pub fn new(
        catalog: Arc<C>,
        ledger: Arc<L>,
        clock: Arc<dyn Clock>,
        identity: Option<Address>,
        tracker_config: TrackerConfig,
        refresh_interval: Duration,
    ) -> Self {
        let view = SharedRecordsView::new(catalog, ledger.clone(), clock.clone(), identity);
        let tracker = ExpiryTracker::new(identity, ledger, clock, tracker_config);
        AccessMonitor {
            view,
            tracker,
            refresh_interval,
        }
    }

    /// Live list as seen by the tracker
    pub fn subscribe(&self) -> watch::Receiver<Vec<SharedRecord>> {
        self.tracker.subscribe()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.view.last_error()
    }

    /// Fetch, track, and keep refreshing until `shutdown` resolves
    ///
    /// The first fetch must succeed. Later refresh failures keep the stale
    /// list. A refresh still in flight when `shutdown` fires is dropped, so
    /// its result never reaches the tracker.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), LedgerError>
    where
        F: Future<Output = ()>,
    {
        let initial = self.view.refresh().await?.to_vec();
        self.tracker.start(initial);

        tokio::pin!(shutdown);
        let mut refresh = tokio::time::interval(self.refresh_interval);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        refresh.tick().await;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = refresh.tick() => {
                    let view = &mut self.view;
                    let tracker = &mut self.tracker;
                    tokio::select! {
                        _ = &mut shutdown => break,
                        result = view.refresh() => match result {
                            Ok(records) => {
                                debug!(count = records.len(), "refreshed shared records");
                                tracker.update(records.to_vec());
                            }
                            Err(e) => warn!(error = %e, "refresh failed; tracking stale list"),
                        },
                    }
                }
            }
        }

        self.tracker.stop();
        info!("access monitor stopped");
        Ok(())
    }
}
