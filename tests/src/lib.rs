//! Medshare Scenario Test Suite
//!
//! End-to-end scenarios over the in-memory ledger:
//! - Grant then expire, with exactly one revoke per expiry
//! - Teardown stops all ticking and revoking
//! - Unauthenticated sessions make no ledger calls
//! - Aggregated fetch is all-or-nothing
//! - Countdown formatting and monotonicity properties
//! - Batch decryption of shared documents

pub mod fixtures;

pub mod countdown_properties;
pub mod documents;
pub mod fetch_atomicity;
pub mod lifecycle;
pub mod unauthenticated;
