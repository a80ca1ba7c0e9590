//! Content-addressed blob retrieval

use crate::error::CryptoError;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Read access to encrypted documents by content identifier
pub trait BlobStore: Send + Sync {
    fn fetch(&self, cid: &str) -> impl Future<Output = Result<Vec<u8>, CryptoError>> + Send;
}

/// Blob store reached through an HTTP gateway (`GET {gateway}/ipfs/{cid}`)
pub struct GatewayBlobStore {
    http: reqwest::Client,
    gateway: String,
}

impl GatewayBlobStore {
    pub fn new(gateway: &str, request_timeout: Duration) -> Result<Self, CryptoError> {
        let parsed = reqwest::Url::parse(gateway).map_err(|e| CryptoError::Gateway(format!("{}: {}", gateway, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CryptoError::Gateway(format!("unsupported scheme {:?}", parsed.scheme())));
        }
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(GatewayBlobStore {
            http,
            gateway: gateway.trim_end_matches('/').to_string(),
        })
    }

    /// Gateway URL for `cid`
    pub fn document_url(&self, cid: &str) -> Result<String, CryptoError> {
        validate_cid(cid)?;
        Ok(format!("{}/ipfs/{}", self.gateway, cid))
    }
}

impl BlobStore for GatewayBlobStore {
    async fn fetch(&self, cid: &str) -> Result<Vec<u8>, CryptoError> {
        let url = self.document_url(cid)?;
        debug!(%url, "fetching document");
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CryptoError::Fetch(format!("{} returned {}", url, status)));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Content identifiers are base-encoded hashes; anything else is refused
pub fn validate_cid(cid: &str) -> Result<(), CryptoError> {
    if cid.is_empty() || !cid.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CryptoError::InvalidCid(cid.to_string()));
    }
    Ok(())
}
