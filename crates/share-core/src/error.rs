//! Ledger error taxonomy
//!
//! Read failures are recovered by callers (stale data is kept), write
//! failures are surfaced to whoever initiated the write, and the
//! revoke-on-expiry path only logs them.

use thiserror::Error;

/// Errors produced while talking to the access ledger or record catalog
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No wallet identity is available; nothing was sent to the ledger
    #[error("no authenticated identity")]
    NotAuthenticated,

    /// An address string could not be parsed
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A grant was requested for less than one whole second
    #[error("grant duration must be at least one second")]
    InvalidDuration,

    /// Parallel arrays returned by the ledger disagree in length
    #[error("ledger column `{column}` has {got} entries, expected {expected}")]
    ArrayLengthMismatch {
        column: &'static str,
        expected: usize,
        got: usize,
    },

    /// A view call failed (transport error or contract revert)
    #[error("ledger read failed: {0}")]
    Read(String),

    /// A transaction was rejected before inclusion (signer or node refused it)
    #[error("ledger write failed: {0}")]
    Write(String),

    /// A transaction was mined but reverted
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    /// A transaction was broadcast but no receipt arrived in time
    #[error("transaction {tx_hash} was not confirmed in time")]
    ConfirmationTimeout { tx_hash: String },

    /// The ledger answered with a payload that could not be decoded
    #[error("malformed ledger response: {0}")]
    Decode(String),
}

impl LedgerError {
    /// Whether this error came from a write (grant/revoke) rather than a read
    pub fn is_write_failure(&self) -> bool {
        matches!(
            self,
            LedgerError::Write(_)
                | LedgerError::Reverted { .. }
                | LedgerError::ConfirmationTimeout { .. }
        )
    }
}
