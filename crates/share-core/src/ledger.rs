//! Interfaces to the external access ledger and record catalog
//!
//! Both are owned by the ledger; this client only reads them and submits
//! signed writes. Write operations resolve only once the ledger has
//! confirmed the transaction, never on mere broadcast.

use crate::error::LedgerError;
use crate::types::{AccessHistoryPage, Address, RecordId, SharedRecordsPage, TxReceipt};
use std::future::Future;

/// Time-bounded access grants on records
pub trait AccessLedger: Send + Sync + 'static {
    /// Grant `grantee` access to `record_id` for `duration_secs`, signed by `sender`
    ///
    /// The ledger sets the expiry to `granted_at + duration_secs`.
    fn grant_access(
        &self,
        sender: &Address,
        record_id: &RecordId,
        grantee: &Address,
        duration_secs: u64,
    ) -> impl Future<Output = Result<TxReceipt, LedgerError>> + Send;

    /// Revoke `grantee`'s access to `record_id`, signed by `sender`
    fn revoke_access(
        &self,
        sender: &Address,
        record_id: &RecordId,
        grantee: &Address,
    ) -> impl Future<Output = Result<TxReceipt, LedgerError>> + Send;

    /// Current expiry (Unix seconds) of `grantee`'s access to `record_id`
    fn check_access_expiry(
        &self,
        record_id: &RecordId,
        grantee: &Address,
    ) -> impl Future<Output = Result<i64, LedgerError>> + Send;

    /// Every grant ever made on `record_id`, in ledger order
    fn access_history(
        &self,
        record_id: &RecordId,
    ) -> impl Future<Output = Result<AccessHistoryPage, LedgerError>> + Send;
}

/// Enumeration of records by grantee and by owner
pub trait RecordCatalog: Send + Sync + 'static {
    /// Records currently shared with `grantee`, as parallel arrays
    fn shared_with(
        &self,
        grantee: &Address,
    ) -> impl Future<Output = Result<SharedRecordsPage, LedgerError>> + Send;

    /// Ids of every record owned by `owner`
    fn records_by_owner(
        &self,
        owner: &Address,
    ) -> impl Future<Output = Result<Vec<RecordId>, LedgerError>> + Send;
}
