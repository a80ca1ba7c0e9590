//! JSON-RPC 2.0 client for an Ethereum-compatible endpoint
//!
//! Signing is delegated to the endpoint's wallet through
//! `eth_sendTransaction`; this process never holds key material.

use crate::error::RpcError;
use medshare_core::{hex, Address, TxReceipt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

/// How long to wait for a submitted transaction to be mined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        ConfirmationPolicy {
            poll_interval: Duration::from_millis(1_000),
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Receipt as returned by `eth_getTransactionReceipt`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl RawReceipt {
    /// Whether the transaction has been included in a block
    pub fn is_mined(&self) -> bool {
        self.block_number.is_some()
    }

    /// Confirmed receipt, or `Reverted` when the status is `0x0`
    pub fn into_receipt(self) -> Result<TxReceipt, RpcError> {
        let block = self.block_number.as_deref().ok_or_else(|| {
            RpcError::InvalidResponse(format!("receipt {} has no block number", self.transaction_hash))
        })?;
        let block_number = hex::parse_quantity(block)
            .ok_or_else(|| RpcError::InvalidResponse(format!("bad block number {:?}", block)))?;

        // Pre-byzantium receipts carry no status; treat inclusion as success
        if let Some(status) = self.status.as_deref() {
            match hex::parse_quantity(status) {
                Some(1) => {}
                Some(0) => {
                    return Err(RpcError::Reverted {
                        tx_hash: self.transaction_hash,
                    })
                }
                _ => return Err(RpcError::InvalidResponse(format!("bad receipt status {:?}", status))),
            }
        }

        Ok(TxReceipt {
            tx_hash: self.transaction_hash,
            block_number,
        })
    }
}

/// Thin JSON-RPC client over `reqwest`
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: reqwest::Url,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Client for `url`; only `http` and `https` endpoints are accepted
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self, RpcError> {
        let url = reqwest::Url::parse(url).map_err(|e| RpcError::Url(format!("{}: {}", url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RpcError::Url(format!("unsupported scheme {:?}", url.scheme())));
        }
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(JsonRpcClient {
            http,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Issue one request and deserialize its `result`
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!(id, method, "rpc request");

        let response: RpcResponse = self
            .http
            .post(self.url.clone())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(serde_json::from_value(response.result.unwrap_or(Value::Null))?)
    }

    /// `eth_call` against the latest block; returns the raw return data
    pub async fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        let raw: String = self
            .request(
                "eth_call",
                json!([{ "to": to.to_string(), "data": hex::encode_prefixed(data) }, "latest"]),
            )
            .await?;
        hex::decode(&raw).ok_or_else(|| RpcError::InvalidResponse(format!("eth_call returned non-hex data {:?}", raw)))
    }

    /// Submit a transaction signed by the endpoint wallet for `from`; returns its hash
    pub async fn send_transaction(&self, from: &Address, to: &Address, data: &[u8]) -> Result<String, RpcError> {
        self.request(
            "eth_sendTransaction",
            json!([{
                "from": from.to_string(),
                "to": to.to_string(),
                "data": hex::encode_prefixed(data),
            }]),
        )
        .await
    }

    /// Receipt for `tx_hash`, `None` while it is still pending
    pub async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<RawReceipt>, RpcError> {
        self.request("eth_getTransactionReceipt", json!([tx_hash])).await
    }

    /// Poll until `tx_hash` is mined or `policy.timeout` elapses
    pub async fn wait_for_receipt(&self, tx_hash: &str, policy: &ConfirmationPolicy) -> Result<TxReceipt, RpcError> {
        let started = tokio::time::Instant::now();
        loop {
            if let Some(raw) = self.transaction_receipt(tx_hash).await? {
                if raw.is_mined() {
                    let receipt = raw.into_receipt()?;
                    debug!(tx = %receipt.tx_hash, block = receipt.block_number, "transaction confirmed");
                    return Ok(receipt);
                }
            }
            if started.elapsed() >= policy.timeout {
                return Err(RpcError::Timeout {
                    tx_hash: tx_hash.to_string(),
                    waited_secs: policy.timeout.as_secs(),
                });
            }
            tokio::time::sleep(policy.poll_interval).await;
        }
    }
}
