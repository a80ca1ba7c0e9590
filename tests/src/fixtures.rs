//! Shared setup for scenarios

use medshare_core::memory::InMemoryLedger;
use medshare_core::{Address, Clock, RecordId, RecordMetadata, TokioClock};
use std::sync::Arc;

pub const START: i64 = 1_000;
pub const PATIENT: u8 = 0xa1;
pub const DOCTOR: u8 = 0xd1;

pub fn addr(last: u8) -> Address {
    let mut raw = [0u8; 20];
    raw[19] = last;
    Address(raw)
}

pub fn patient() -> Address {
    addr(PATIENT)
}

pub fn doctor() -> Address {
    addr(DOCTOR)
}

/// Clock following paused tokio time, starting at [`START`]
pub fn paused_clock() -> Arc<dyn Clock> {
    Arc::new(TokioClock::starting_at(START))
}

/// Ledger holding `ids`, all owned by the patient
pub fn ledger_with_records(clock: Arc<dyn Clock>, ids: &[&str]) -> Arc<InMemoryLedger> {
    let ledger = Arc::new(InMemoryLedger::new(clock));
    for id in ids {
        ledger.add_record(
            RecordId::from(*id),
            patient(),
            RecordMetadata {
                patient_name: format!("Patient of {}", id),
                age: 42,
                blood_group: "O+".into(),
                cid: format!("cid{}", id.replace('-', "")),
                ..RecordMetadata::default()
            },
        );
    }
    ledger
}
