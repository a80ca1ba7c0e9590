//! Shared-access data model
//!
//! Read models built from ledger responses. The ledger is the source of
//! truth; everything here is a read-through copy.

use crate::countdown::format_remaining_time;
use crate::error::LedgerError;
use crate::hex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 20-byte ledger account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let has_prefix = trimmed.starts_with("0x") || trimmed.starts_with("0X");
        if !has_prefix || trimmed.len() != 42 {
            return Err(LedgerError::InvalidAddress(s.to_string()));
        }
        let bytes = hex::decode(trimmed).ok_or_else(|| LedgerError::InvalidAddress(s.to_string()))?;
        let mut raw = [0u8; 20];
        raw.copy_from_slice(&bytes);
        Ok(Address(raw))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_prefixed(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Opaque record identifier, assigned by the uploading client
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId(value)
    }
}

/// Identity of a single grant: (record, grantee)
pub type GrantKey = (RecordId, Address);

/// Display fields copied from the record catalog at fetch time
///
/// Not authoritative and never used for access decisions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub patient_name: String,
    pub age: u32,
    pub gender: String,
    pub blood_group: String,
    pub vitals: String,
    pub diagnosis: String,
    /// Content identifier of the encrypted document in the blob store
    pub cid: String,
}

/// A record currently shared with the viewer, joined with its live grant
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedRecord {
    pub id: RecordId,
    pub owner: Address,
    pub grantee: Address,
    /// Absolute Unix timestamp (seconds) after which the grant is invalid
    pub expiry_time: i64,
    /// Human-formatted countdown, `"Expired"` once `expiry_time <= now`
    pub remaining_time: String,
    pub metadata: RecordMetadata,
}

impl SharedRecord {
    /// Build a record with its countdown computed against `now`
    pub fn new(
        id: RecordId,
        owner: Address,
        grantee: Address,
        expiry_time: i64,
        metadata: RecordMetadata,
        now: i64,
    ) -> Self {
        let mut record = SharedRecord {
            id,
            owner,
            grantee,
            expiry_time,
            remaining_time: String::new(),
            metadata,
        };
        record.refresh_countdown(now);
        record
    }

    pub fn seconds_left(&self, now: i64) -> i64 {
        self.expiry_time.saturating_sub(now)
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expiry_time <= now
    }

    /// Recompute `remaining_time` for `now`
    pub fn refresh_countdown(&mut self, now: i64) {
        self.remaining_time = format_remaining_time(self.seconds_left(now));
    }

    pub fn grant_key(&self) -> GrantKey {
        (self.id.clone(), self.grantee)
    }
}

/// Parallel-array response for "records shared with me"
///
/// Every column is indexed by position in `ids`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedRecordsPage {
    pub ids: Vec<String>,
    pub patient_names: Vec<String>,
    pub ages: Vec<u32>,
    pub genders: Vec<String>,
    pub blood_groups: Vec<String>,
    pub vitals: Vec<String>,
    pub diagnoses: Vec<String>,
    pub cids: Vec<String>,
    pub owners: Vec<Address>,
}

/// One joined row of a [`SharedRecordsPage`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedRecordRow {
    pub id: RecordId,
    pub owner: Address,
    pub metadata: RecordMetadata,
}

impl SharedRecordsPage {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Join the columns by index, in ledger order
    ///
    /// Fails on the first column whose length differs from `ids`.
    pub fn join(self) -> Result<Vec<SharedRecordRow>, LedgerError> {
        let expected = self.ids.len();
        check_column("patient_names", expected, self.patient_names.len())?;
        check_column("ages", expected, self.ages.len())?;
        check_column("genders", expected, self.genders.len())?;
        check_column("blood_groups", expected, self.blood_groups.len())?;
        check_column("vitals", expected, self.vitals.len())?;
        check_column("diagnoses", expected, self.diagnoses.len())?;
        check_column("cids", expected, self.cids.len())?;
        check_column("owners", expected, self.owners.len())?;

        let mut patient_names = self.patient_names.into_iter();
        let mut ages = self.ages.into_iter();
        let mut genders = self.genders.into_iter();
        let mut blood_groups = self.blood_groups.into_iter();
        let mut vitals = self.vitals.into_iter();
        let mut diagnoses = self.diagnoses.into_iter();
        let mut cids = self.cids.into_iter();

        let rows = self
            .ids
            .into_iter()
            .zip(self.owners)
            .map(|(id, owner)| SharedRecordRow {
                id: RecordId(id),
                owner,
                metadata: RecordMetadata {
                    patient_name: patient_names.next().unwrap_or_default(),
                    age: ages.next().unwrap_or_default(),
                    gender: genders.next().unwrap_or_default(),
                    blood_group: blood_groups.next().unwrap_or_default(),
                    vitals: vitals.next().unwrap_or_default(),
                    diagnosis: diagnoses.next().unwrap_or_default(),
                    cid: cids.next().unwrap_or_default(),
                },
            })
            .collect();
        Ok(rows)
    }
}

/// Derived status of a historical grant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessStatus {
    Active,
    Expired,
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessStatus::Active => write!(f, "Active"),
            AccessStatus::Expired => write!(f, "Expired"),
        }
    }
}

/// Ledger-reported history of one grant. Immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub grantee: Address,
    pub granted_at: i64,
    pub expires_at: i64,
}

impl AccessLogEntry {
    pub fn status(&self, now: i64) -> AccessStatus {
        if self.expires_at > now {
            AccessStatus::Active
        } else {
            AccessStatus::Expired
        }
    }
}

/// Parallel-array response for a record's access history
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessHistoryPage {
    pub grantees: Vec<Address>,
    pub granted_at: Vec<i64>,
    pub expires_at: Vec<i64>,
}

impl AccessHistoryPage {
    /// Join the columns by index, in ledger order
    pub fn join(self) -> Result<Vec<AccessLogEntry>, LedgerError> {
        let expected = self.grantees.len();
        check_column("granted_at", expected, self.granted_at.len())?;
        check_column("expires_at", expected, self.expires_at.len())?;

        Ok(self
            .grantees
            .into_iter()
            .zip(self.granted_at)
            .zip(self.expires_at)
            .map(|((grantee, granted_at), expires_at)| AccessLogEntry {
                grantee,
                granted_at,
                expires_at,
            })
            .collect())
    }
}

/// A history entry tagged with the record it belongs to (owner-wide view)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub record_id: RecordId,
    pub entry: AccessLogEntry,
}

/// A confirmed (mined) ledger transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: u64,
}

fn check_column(column: &'static str, expected: usize, got: usize) -> Result<(), LedgerError> {
    if got != expected {
        return Err(LedgerError::ArrayLengthMismatch {
            column,
            expected,
            got,
        });
    }
    Ok(())
}
