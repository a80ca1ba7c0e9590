//! In-memory access ledger
//!
//! Implements [`AccessLedger`] and [`RecordCatalog`] against local state so
//! the tracker and fetch logic can run without a node. Writes "confirm"
//! immediately with sequential block numbers. Failures can be injected per
//! record (expiry reads) or globally (revokes), and revokes can be slowed
//! down to keep them in flight.

use crate::countdown::Clock;
use crate::error::LedgerError;
use crate::ledger::{AccessLedger, RecordCatalog};
use crate::types::{
    AccessHistoryPage, AccessLogEntry, Address, GrantKey, RecordId, RecordMetadata,
    SharedRecordsPage, TxReceipt,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone)]
struct StoredRecord {
    id: RecordId,
    owner: Address,
    metadata: RecordMetadata,
}

#[derive(Debug, Default)]
struct LedgerState {
    records: Vec<StoredRecord>,
    /// Live grants: key -> expiry
    grants: HashMap<GrantKey, i64>,
    history: HashMap<RecordId, Vec<AccessLogEntry>>,
    block_number: u64,
    revoke_calls: Vec<GrantKey>,
    read_calls: usize,
    failing_expiry_reads: HashSet<RecordId>,
    fail_revokes: bool,
    revoke_delay: Option<Duration>,
}

impl LedgerState {
    fn next_receipt(&mut self, kind: &str) -> TxReceipt {
        self.block_number += 1;
        TxReceipt {
            tx_hash: format!("0x{}{:060x}", kind, self.block_number),
            block_number: self.block_number,
        }
    }

    fn record(&self, record_id: &RecordId) -> Option<&StoredRecord> {
        self.records.iter().find(|r| &r.id == record_id)
    }
}

/// Ledger held entirely in process memory
pub struct InMemoryLedger {
    clock: Arc<dyn Clock>,
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        InMemoryLedger {
            clock,
            state: Mutex::new(LedgerState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a record as uploaded by `owner`
    pub fn add_record(&self, id: RecordId, owner: Address, metadata: RecordMetadata) {
        self.state().records.push(StoredRecord {
            id,
            owner,
            metadata,
        });
    }

    /// Make every expiry read for `record_id` fail
    pub fn fail_expiry_reads_for(&self, record_id: RecordId) {
        self.state().failing_expiry_reads.insert(record_id);
    }

    /// Make every revoke fail (the grant stays live)
    pub fn set_fail_revokes(&self, fail: bool) {
        self.state().fail_revokes = fail;
    }

    /// Hold every revoke for `delay` before it lands
    pub fn set_revoke_delay(&self, delay: Option<Duration>) {
        self.state().revoke_delay = delay;
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.failing_expiry_reads.clear();
        state.fail_revokes = false;
    }

    /// Every revoke submitted so far, including failed ones, in call order
    pub fn revoke_calls(&self) -> Vec<GrantKey> {
        self.state().revoke_calls.clone()
    }

    /// Number of read operations served so far
    pub fn read_calls(&self) -> usize {
        self.state().read_calls
    }

    /// Live grant expiry, if any, without counting as a ledger read
    pub fn grant_expiry(&self, record_id: &RecordId, grantee: &Address) -> Option<i64> {
        self.state()
            .grants
            .get(&(record_id.clone(), *grantee))
            .copied()
    }
}

impl AccessLedger for InMemoryLedger {
    async fn grant_access(
        &self,
        sender: &Address,
        record_id: &RecordId,
        grantee: &Address,
        duration_secs: u64,
    ) -> Result<TxReceipt, LedgerError> {
        let now = self.clock.now();
        let mut state = self.state();
        let owner = state
            .record(record_id)
            .map(|r| r.owner)
            .ok_or_else(|| LedgerError::Write(format!("unknown record {}", record_id)))?;
        if owner != *sender {
            return Err(LedgerError::Write(format!(
                "{} is not the owner of {}",
                sender, record_id
            )));
        }

        let duration = i64::try_from(duration_secs)
            .map_err(|_| LedgerError::Write(format!("duration {} too large", duration_secs)))?;
        let expires_at = now.saturating_add(duration);
        state.grants.insert((record_id.clone(), *grantee), expires_at);
        state
            .history
            .entry(record_id.clone())
            .or_default()
            .push(AccessLogEntry {
                grantee: *grantee,
                granted_at: now,
                expires_at,
            });
        Ok(state.next_receipt("a1"))
    }

    async fn revoke_access(
        &self,
        sender: &Address,
        record_id: &RecordId,
        grantee: &Address,
    ) -> Result<TxReceipt, LedgerError> {
        let key = (record_id.clone(), *grantee);
        let delay = {
            let mut state = self.state();
            state.revoke_calls.push(key.clone());
            state.revoke_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if state.fail_revokes {
            return Err(LedgerError::Write(format!(
                "revoke of {} for {} rejected",
                record_id, grantee
            )));
        }

        let owner = state.record(record_id).map(|r| r.owner);
        if owner != Some(*sender) && sender != grantee {
            return Err(LedgerError::Write(format!(
                "{} may not revoke access to {}",
                sender, record_id
            )));
        }
        // Revoking a grant that does not exist is a no-op
        state.grants.remove(&key);
        Ok(state.next_receipt("b2"))
    }

    async fn check_access_expiry(
        &self,
        record_id: &RecordId,
        grantee: &Address,
    ) -> Result<i64, LedgerError> {
        let mut state = self.state();
        state.read_calls += 1;
        if state.failing_expiry_reads.contains(record_id) {
            return Err(LedgerError::Read(format!(
                "checkAccessExpiry({}) reverted",
                record_id
            )));
        }
        Ok(state
            .grants
            .get(&(record_id.clone(), *grantee))
            .copied()
            .unwrap_or(0))
    }

    async fn access_history(&self, record_id: &RecordId) -> Result<AccessHistoryPage, LedgerError> {
        let mut state = self.state();
        state.read_calls += 1;
        let entries = state.history.get(record_id).cloned().unwrap_or_default();
        Ok(AccessHistoryPage {
            grantees: entries.iter().map(|e| e.grantee).collect(),
            granted_at: entries.iter().map(|e| e.granted_at).collect(),
            expires_at: entries.iter().map(|e| e.expires_at).collect(),
        })
    }
}

impl RecordCatalog for InMemoryLedger {
    async fn shared_with(&self, grantee: &Address) -> Result<SharedRecordsPage, LedgerError> {
        let mut state = self.state();
        state.read_calls += 1;

        let mut page = SharedRecordsPage::default();
        for record in &state.records {
            if !state.grants.contains_key(&(record.id.clone(), *grantee)) {
                continue;
            }
            let meta = &record.metadata;
            page.ids.push(record.id.0.clone());
            page.patient_names.push(meta.patient_name.clone());
            page.ages.push(meta.age);
            page.genders.push(meta.gender.clone());
            page.blood_groups.push(meta.blood_group.clone());
            page.vitals.push(meta.vitals.clone());
            page.diagnoses.push(meta.diagnosis.clone());
            page.cids.push(meta.cid.clone());
            page.owners.push(record.owner);
        }
        Ok(page)
    }

    async fn records_by_owner(&self, owner: &Address) -> Result<Vec<RecordId>, LedgerError> {
        let mut state = self.state();
        state.read_calls += 1;
        Ok(state
            .records
            .iter()
            .filter(|r| &r.owner == owner)
            .map(|r| r.id.clone())
            .collect())
    }
}
