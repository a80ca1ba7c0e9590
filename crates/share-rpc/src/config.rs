//! Ledger endpoint configuration
//!
//! Loaded from a JSON file or from `MEDSHARE_*` environment variables.
//! Timeouts fall back to their defaults when absent.

use crate::client::ConfirmationPolicy;
use crate::error::ConfigError;
use medshare_core::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const RPC_URL_VAR: &str = "MEDSHARE_RPC_URL";
pub const ACCESS_CONTRACT_VAR: &str = "MEDSHARE_ACCESS_CONTRACT";
pub const CATALOG_CONTRACT_VAR: &str = "MEDSHARE_CATALOG_CONTRACT";
pub const REQUEST_TIMEOUT_VAR: &str = "MEDSHARE_REQUEST_TIMEOUT_SECS";
pub const RECEIPT_POLL_VAR: &str = "MEDSHARE_RECEIPT_POLL_MILLIS";
pub const CONFIRMATION_TIMEOUT_VAR: &str = "MEDSHARE_CONFIRMATION_TIMEOUT_SECS";

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_receipt_poll_millis() -> u64 {
    1_000
}

fn default_confirmation_timeout_secs() -> u64 {
    120
}

/// Where the ledger lives and how patiently to talk to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub access_contract: Address,
    pub catalog_contract: Address,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_receipt_poll_millis")]
    pub receipt_poll_millis: u64,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
}

impl LedgerConfig {
    /// Config with default timeouts
    pub fn new(rpc_url: impl Into<String>, access_contract: Address, catalog_contract: Address) -> Self {
        LedgerConfig {
            rpc_url: rpc_url.into(),
            access_contract,
            catalog_contract,
            request_timeout_secs: default_request_timeout_secs(),
            receipt_poll_millis: default_receipt_poll_millis(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
        }
    }

    /// Read from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary key lookup (environment, CLI overrides, ...)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let address = |key: &'static str| -> Result<Address, ConfigError> {
            required(key)?.parse().map_err(|e: medshare_core::LedgerError| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            })
        };
        let number = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                    key,
                    reason: e.to_string(),
                }),
            }
        };

        let config = LedgerConfig {
            rpc_url: required(RPC_URL_VAR)?,
            access_contract: address(ACCESS_CONTRACT_VAR)?,
            catalog_contract: address(CATALOG_CONTRACT_VAR)?,
            request_timeout_secs: number(REQUEST_TIMEOUT_VAR, default_request_timeout_secs())?,
            receipt_poll_millis: number(RECEIPT_POLL_VAR, default_receipt_poll_millis())?,
            confirmation_timeout_secs: number(CONFIRMATION_TIMEOUT_VAR, default_confirmation_timeout_secs())?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject non-http endpoints and zero timeouts
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.rpc_url).map_err(|e| ConfigError::Invalid {
            key: RPC_URL_VAR,
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: RPC_URL_VAR,
                reason: format!("scheme must be http or https, got {}", url.scheme()),
            });
        }
        for (key, value) in [
            (REQUEST_TIMEOUT_VAR, self.request_timeout_secs),
            (RECEIPT_POLL_VAR, self.receipt_poll_millis),
            (CONFIRMATION_TIMEOUT_VAR, self.confirmation_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            poll_interval: Duration::from_millis(self.receipt_poll_millis),
            timeout: Duration::from_secs(self.confirmation_timeout_secs),
        }
    }
}
