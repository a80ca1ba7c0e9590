//! Error types for document sealing and retrieval

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Wrong key or tampered ciphertext
    #[error("decryption failed: authentication tag mismatch")]
    Decrypt,

    #[error("encryption failed")]
    Encrypt,

    /// Sealed bytes too short to hold a nonce and tag
    #[error("malformed sealed document: {0}")]
    Framing(String),

    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    #[error("invalid content identifier {0:?}")]
    InvalidCid(String),

    #[error("blob fetch failed: {0}")]
    Fetch(String),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid gateway url: {0}")]
    Gateway(String),
}
