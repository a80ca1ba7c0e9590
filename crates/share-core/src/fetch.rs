//! Aggregated fetch/join of shared records and access history
//!
//! One catalog read returns the records shared with the viewer as parallel
//! arrays; each record then needs its own expiry read. The expiry reads are
//! independent, so they are issued concurrently and joined all-or-nothing:
//! a single failure fails the whole fetch rather than producing a partial
//! list.

use crate::countdown::Clock;
use crate::error::LedgerError;
use crate::ledger::{AccessLedger, RecordCatalog};
use crate::types::{AccessLogEntry, Address, HistoryEntry, RecordId, SharedRecord};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fetch every record shared with `viewer`, joined with its current expiry
///
/// Records come back in ledger order with countdowns computed against `now`.
pub async fn fetch_shared_records<C, L>(
    catalog: &C,
    ledger: &L,
    viewer: &Address,
    now: i64,
) -> Result<Vec<SharedRecord>, LedgerError>
where
    C: RecordCatalog,
    L: AccessLedger,
{
    let rows = catalog.shared_with(viewer).await?.join()?;
    let expiries = try_join_all(
        rows.iter()
            .map(|row| ledger.check_access_expiry(&row.id, viewer)),
    )
    .await?;

    debug!(viewer = %viewer, count = rows.len(), "fetched shared records");

    Ok(rows
        .into_iter()
        .zip(expiries)
        .map(|(row, expiry_time)| {
            SharedRecord::new(row.id, row.owner, *viewer, expiry_time, row.metadata, now)
        })
        .collect())
}

/// Access history of a single record, in ledger order
pub async fn fetch_access_history<L: AccessLedger>(
    ledger: &L,
    record_id: &RecordId,
) -> Result<Vec<AccessLogEntry>, LedgerError> {
    ledger.access_history(record_id).await?.join()
}

/// Access history across every record `owner` owns
///
/// Sorted by descending `expires_at` so the most recently active grants
/// come first. Ties keep ledger order.
pub async fn fetch_global_history<C, L>(
    catalog: &C,
    ledger: &L,
    owner: &Address,
) -> Result<Vec<HistoryEntry>, LedgerError>
where
    C: RecordCatalog,
    L: AccessLedger,
{
    let record_ids = catalog.records_by_owner(owner).await?;
    let histories = try_join_all(
        record_ids
            .iter()
            .map(|record_id| fetch_access_history(ledger, record_id)),
    )
    .await?;

    let mut entries: Vec<HistoryEntry> = record_ids
        .into_iter()
        .zip(histories)
        .flat_map(|(record_id, history)| {
            history.into_iter().map(move |entry| HistoryEntry {
                record_id: record_id.clone(),
                entry,
            })
        })
        .collect();
    entries.sort_by(|a, b| b.entry.expires_at.cmp(&a.entry.expires_at));
    Ok(entries)
}

/// Last good list of records shared with the viewer
///
/// A failed refresh keeps the previous list and sets an error message, so a
/// transient ledger failure never blanks what the user already sees.
pub struct SharedRecordsView<C, L> {
    catalog: Arc<C>,
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
    identity: Option<Address>,
    records: Vec<SharedRecord>,
    last_error: Option<String>,
}

impl<C, L> SharedRecordsView<C, L>
where
    C: RecordCatalog,
    L: AccessLedger,
{
    pub fn new(
        catalog: Arc<C>,
        ledger: Arc<L>,
        clock: Arc<dyn Clock>,
        identity: Option<Address>,
    ) -> Self {
        SharedRecordsView {
            catalog,
            ledger,
            clock,
            identity,
            records: Vec::new(),
            last_error: None,
        }
    }

    /// Re-read the ledger and replace the list on success
    ///
    /// Without an identity nothing is called and the state is untouched.
    pub async fn refresh(&mut self) -> Result<&[SharedRecord], LedgerError> {
        let Some(viewer) = self.identity else {
            return Err(LedgerError::NotAuthenticated);
        };

        let now = self.clock.now();
        match fetch_shared_records(self.catalog.as_ref(), self.ledger.as_ref(), &viewer, now).await {
            Ok(records) => {
                self.records = records;
                self.last_error = None;
                Ok(&self.records)
            }
            Err(e) => {
                warn!(viewer = %viewer, error = %e, "shared records refresh failed; keeping previous list");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn records(&self) -> &[SharedRecord] {
        &self.records
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn identity(&self) -> Option<&Address> {
        self.identity.as_ref()
    }

    /// Switch identity; records fetched for the previous one are dropped
    pub fn set_identity(&mut self, identity: Option<Address>) {
        if self.identity != identity {
            self.identity = identity;
            self.records.clear();
            self.last_error = None;
        }
    }
}
