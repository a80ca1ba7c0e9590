//! Symmetric sealing of record documents
//!
//! Documents are sealed with XChaCha20-Poly1305 under a 32-byte key derived
//! from a passphrase. The 24-byte nonce is random per document, so a key can
//! seal any number of documents without nonce reuse.
//!
//! Wire form: `nonce (24) || ciphertext || tag (16)`.

use crate::error::CryptoError;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use sha2::Sha256;
use std::fmt;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 24;
pub const TAG_LEN: usize = 16;

/// PBKDF2-HMAC-SHA256 iterations applied during passphrase derivation
pub const DERIVE_ROUNDS: u32 = 100_000;

/// Symmetric document key
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentKey([u8; KEY_LEN]);

impl DocumentKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        DocumentKey(bytes)
    }

    /// Derive a key from a passphrase with PBKDF2-HMAC-SHA256
    pub fn derive(passphrase: &str, salt: &[u8]) -> Self {
        let mut key = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, DERIVE_ROUNDS, &mut key);
        DocumentKey(key)
    }

    /// Fresh random key from the OS entropy source
    pub fn generate() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; KEY_LEN];
        getrandom::getrandom(&mut bytes).map_err(|e| CryptoError::Entropy(e.to_string()))?;
        Ok(DocumentKey(bytes))
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(&self.0))
    }
}

impl fmt::Debug for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DocumentKey(<redacted>)")
    }
}

/// An encrypted document as stored in the blob store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedDocument {
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the Poly1305 tag appended
    pub ciphertext: Vec<u8>,
}

impl SealedDocument {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Framing(format!(
                "{} bytes, need at least {}",
                bytes.len(),
                NONCE_LEN + TAG_LEN
            )));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let mut fixed = [0u8; NONCE_LEN];
        fixed.copy_from_slice(nonce);
        Ok(SealedDocument {
            nonce: fixed,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Encrypt `plaintext` under `key` with a random nonce
pub fn seal(key: &DocumentKey, plaintext: &[u8]) -> Result<SealedDocument, CryptoError> {
    let mut nonce = [0u8; NONCE_LEN];
    getrandom::getrandom(&mut nonce).map_err(|e| CryptoError::Entropy(e.to_string()))?;
    let ciphertext = key
        .cipher()
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::Encrypt)?;
    Ok(SealedDocument { nonce, ciphertext })
}

/// Authenticate and decrypt a sealed document
pub fn open(key: &DocumentKey, sealed: &SealedDocument) -> Result<Vec<u8>, CryptoError> {
    key.cipher()
        .decrypt(XNonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map_err(|_| CryptoError::Decrypt)
}
