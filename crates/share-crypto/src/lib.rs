//! Medshare Crypto - Sealed record documents
//!
//! Record documents live encrypted in a content-addressed blob store. This
//! crate derives document keys, seals and opens documents with
//! XChaCha20-Poly1305, and decrypts everything shared with the viewer in
//! one concurrent batch.

pub mod batch;
pub mod error;
pub mod seal;
pub mod store;

pub use batch::{open_shared_documents, OpenedDocument};
pub use error::CryptoError;
pub use seal::{open, seal, DocumentKey, SealedDocument};
pub use store::{BlobStore, GatewayBlobStore};

/// Salt used when deriving document keys from a passphrase
pub const DOCUMENT_KEY_SALT: &[u8] = b"medshare-document-key-v1";
