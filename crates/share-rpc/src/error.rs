//! JSON-RPC transport errors and their mapping onto [`LedgerError`]

use medshare_core::LedgerError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while talking to the JSON-RPC endpoint
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The endpoint answered with a JSON-RPC error object
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Return data did not match the expected ABI layout
    #[error("abi decoding failed: {0}")]
    Abi(String),

    /// A field of the response was not in the expected format
    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),

    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    #[error("transaction {tx_hash} not confirmed within {waited_secs}s")]
    Timeout { tx_hash: String, waited_secs: u64 },

    #[error("invalid endpoint url: {0}")]
    Url(String),
}

impl RpcError {
    /// Map a failure of a view call
    pub fn into_read_error(self) -> LedgerError {
        match self {
            RpcError::Abi(msg) | RpcError::InvalidResponse(msg) => LedgerError::Decode(msg),
            RpcError::Json(e) => LedgerError::Decode(e.to_string()),
            other => LedgerError::Read(other.to_string()),
        }
    }

    /// Map a failure of a transaction submission or confirmation
    pub fn into_write_error(self) -> LedgerError {
        match self {
            RpcError::Reverted { tx_hash } => LedgerError::Reverted { tx_hash },
            RpcError::Timeout { tx_hash, .. } => LedgerError::ConfirmationTimeout { tx_hash },
            RpcError::Abi(msg) | RpcError::InvalidResponse(msg) => LedgerError::Decode(msg),
            RpcError::Json(e) => LedgerError::Decode(e.to_string()),
            other => LedgerError::Write(other.to_string()),
        }
    }
}

/// Errors raised while loading [`crate::LedgerConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration value {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
}
