//! Grant/revoke commands
//!
//! Turn a user intent ("share record X with doctor Y for N hours") into a
//! signed ledger write. Success means the ledger confirmed the transaction.

use crate::error::LedgerError;
use crate::ledger::AccessLedger;
use crate::types::{Address, RecordId, TxReceipt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Write-side access operations for the authenticated identity
pub struct AccessCommands<L> {
    ledger: Arc<L>,
    identity: Option<Address>,
}

impl<L: AccessLedger> AccessCommands<L> {
    pub fn new(ledger: Arc<L>, identity: Option<Address>) -> Self {
        AccessCommands { ledger, identity }
    }

    /// Grant `grantee` access to `record_id` for `duration`
    ///
    /// Sub-second remainders are dropped; a grant must last at least one
    /// whole second.
    pub async fn grant(
        &self,
        record_id: &RecordId,
        grantee: &Address,
        duration: Duration,
    ) -> Result<TxReceipt, LedgerError> {
        let sender = self.require_identity()?;
        let duration_secs = duration.as_secs();
        if duration_secs == 0 {
            return Err(LedgerError::InvalidDuration);
        }

        match self
            .ledger
            .grant_access(sender, record_id, grantee, duration_secs)
            .await
        {
            Ok(receipt) => {
                info!(
                    record = %record_id,
                    grantee = %grantee,
                    duration_secs,
                    tx = %receipt.tx_hash,
                    block = receipt.block_number,
                    "access granted"
                );
                Ok(receipt)
            }
            Err(e) => {
                warn!(record = %record_id, grantee = %grantee, error = %e, "grant failed");
                Err(e)
            }
        }
    }

    /// Share for a whole number of hours
    pub async fn grant_for_hours(
        &self,
        record_id: &RecordId,
        grantee: &Address,
        hours: u64,
    ) -> Result<TxReceipt, LedgerError> {
        let duration = Duration::from_secs(hours.saturating_mul(3600));
        self.grant(record_id, grantee, duration).await
    }

    /// Revoke `grantee`'s access to `record_id`
    ///
    /// Revoking a grant that does not exist is left to the ledger.
    pub async fn revoke(
        &self,
        record_id: &RecordId,
        grantee: &Address,
    ) -> Result<TxReceipt, LedgerError> {
        let sender = self.require_identity()?;
        match self.ledger.revoke_access(sender, record_id, grantee).await {
            Ok(receipt) => {
                info!(record = %record_id, grantee = %grantee, tx = %receipt.tx_hash, "access revoked");
                Ok(receipt)
            }
            Err(e) => {
                warn!(record = %record_id, grantee = %grantee, error = %e, "revoke failed");
                Err(e)
            }
        }
    }

    pub fn identity(&self) -> Option<&Address> {
        self.identity.as_ref()
    }

    fn require_identity(&self) -> Result<&Address, LedgerError> {
        self.identity.as_ref().ok_or(LedgerError::NotAuthenticated)
    }
}
