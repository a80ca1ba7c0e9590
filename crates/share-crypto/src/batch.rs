//! Batch decryption of shared documents
//!
//! Each shared record names its encrypted document by CID. Documents are
//! fetched and opened concurrently; a document that cannot be fetched or
//! opened is logged and left out, and the rest of the batch continues.

use crate::error::CryptoError;
use crate::seal::{open, DocumentKey, SealedDocument};
use crate::store::BlobStore;
use futures::future::join_all;
use medshare_core::{RecordId, SharedRecord};
use tracing::{debug, warn};

/// A decrypted document and the record it belongs to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenedDocument {
    pub record_id: RecordId,
    pub cid: String,
    pub plaintext: Vec<u8>,
}

/// Fetch and open the document of every record, skipping failures
///
/// Output keeps the order of `records`.
pub async fn open_shared_documents<S: BlobStore>(
    store: &S,
    key: &DocumentKey,
    records: &[SharedRecord],
) -> Vec<OpenedDocument> {
    let attempts = join_all(records.iter().map(|record| open_one(store, key, record))).await;

    let opened: Vec<OpenedDocument> = records
        .iter()
        .zip(attempts)
        .filter_map(|(record, attempt)| match attempt {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(record = %record.id, cid = %record.metadata.cid, error = %e, "skipping document");
                None
            }
        })
        .collect();

    debug!(requested = records.len(), opened = opened.len(), "batch decryption finished");
    opened
}

async fn open_one<S: BlobStore>(
    store: &S,
    key: &DocumentKey,
    record: &SharedRecord,
) -> Result<OpenedDocument, CryptoError> {
    let cid = record.metadata.cid.as_str();
    if cid.is_empty() {
        return Err(CryptoError::InvalidCid(String::new()));
    }
    let bytes = store.fetch(cid).await?;
    let sealed = SealedDocument::from_bytes(&bytes)?;
    let plaintext = open(key, &sealed)?;
    Ok(OpenedDocument {
        record_id: record.id.clone(),
        cid: cid.to_string(),
        plaintext,
    })
}
