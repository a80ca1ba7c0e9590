//! Medshare Core - Shared-Access Lifecycle
//!
//! Client-side view of medical records shared through an access ledger:
//! - Typed join of the ledger's parallel-array responses
//! - Concurrent, all-or-nothing expiry reads for every shared record
//! - Live per-record countdowns with revoke-on-expiry (exactly once per expiry)
//! - Grant/revoke commands that resolve only after ledger confirmation
//!
//! The ledger itself is external. It is reached through the [`AccessLedger`]
//! and [`RecordCatalog`] traits; `medshare-rpc` provides the JSON-RPC
//! implementation and [`memory::InMemoryLedger`] a local one.
//!
//! # Example
//!
//! ```rust
//! use medshare_core::format_remaining_time;
//!
//! assert_eq!(format_remaining_time(3_725), "1h 2m 5s");
//! assert_eq!(format_remaining_time(0), "Expired");
//! ```

pub mod commands;
pub mod countdown;
pub mod error;
pub mod fetch;
pub mod hex;
pub mod ledger;
pub mod memory;
pub mod monitor;
pub mod tracker;
pub mod types;

// Re-export commonly used types for convenience
pub use commands::AccessCommands;
pub use countdown::{format_remaining_time, Clock, ManualClock, SystemClock, TokioClock, EXPIRED_LABEL};
pub use error::LedgerError;
pub use fetch::{fetch_access_history, fetch_global_history, fetch_shared_records, SharedRecordsView};
pub use ledger::{AccessLedger, RecordCatalog};
pub use monitor::AccessMonitor;
pub use tracker::{ExpiryBoard, ExpiryTracker, TrackerConfig};
pub use types::{
    AccessHistoryPage, AccessLogEntry, AccessStatus, Address, GrantKey, HistoryEntry, RecordId,
    RecordMetadata, SharedRecord, SharedRecordsPage, TxReceipt,
};
