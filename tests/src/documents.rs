//! Shared Document Tests
//!
//! Patient seals documents, grants access, doctor fetches the shared list
//! and opens what is still live. Broken documents are skipped.

#[cfg(test)]
mod scenarios {
    use crate::fixtures::*;
    use medshare_core::{fetch_shared_records, AccessCommands, Clock, RecordId};
    use medshare_crypto::{
        open_shared_documents, seal, BlobStore, CryptoError, DocumentKey, DOCUMENT_KEY_SALT,
    };
    use std::collections::HashMap;
    use std::time::Duration;

    struct MemoryBlobs(HashMap<String, Vec<u8>>);

    impl BlobStore for MemoryBlobs {
        async fn fetch(&self, cid: &str) -> Result<Vec<u8>, CryptoError> {
            self.0
                .get(cid)
                .cloned()
                .ok_or_else(|| CryptoError::Fetch(format!("{} not pinned", cid)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_doctor_opens_shared_documents() -> anyhow::Result<()> {
        let clock = paused_clock();
        let ledger = ledger_with_records(clock.clone(), &["REC-1", "REC-2", "REC-3"]);
        let key = DocumentKey::derive("patient passphrase", DOCUMENT_KEY_SALT);

        let mut blobs = HashMap::new();
        blobs.insert("cidREC1".to_string(), seal(&key, b"lab results")?.to_bytes());
        blobs.insert("cidREC2".to_string(), b"not a sealed document".to_vec());
        // REC-3's document was never pinned
        let store = MemoryBlobs(blobs);

        let owner = AccessCommands::new(ledger.clone(), Some(patient()));
        for id in ["REC-1", "REC-2", "REC-3"] {
            owner
                .grant(&RecordId::from(id), &doctor(), Duration::from_secs(3_600))
                .await?;
        }

        let shared = fetch_shared_records(ledger.as_ref(), ledger.as_ref(), &doctor(), clock.now()).await?;
        assert_eq!(shared.len(), 3);

        let opened = open_shared_documents(&store, &key, &shared).await;
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].record_id, RecordId::from("REC-1"));
        assert_eq!(opened[0].plaintext, b"lab results");
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_passphrase_opens_nothing() -> anyhow::Result<()> {
        let clock = paused_clock();
        let ledger = ledger_with_records(clock.clone(), &["REC-1"]);
        let sealing_key = DocumentKey::derive("right", DOCUMENT_KEY_SALT);
        let store = MemoryBlobs(HashMap::from([(
            "cidREC1".to_string(),
            seal(&sealing_key, b"imaging")?.to_bytes(),
        )]));
        AccessCommands::new(ledger.clone(), Some(patient()))
            .grant(&RecordId::from("REC-1"), &doctor(), Duration::from_secs(60))
            .await?;

        let shared = fetch_shared_records(ledger.as_ref(), ledger.as_ref(), &doctor(), clock.now()).await?;
        let opened = open_shared_documents(&store, &DocumentKey::derive("wrong", DOCUMENT_KEY_SALT), &shared).await;
        assert!(opened.is_empty());
        Ok(())
    }
}
