//! # Content Store Adapter
//!
//! Minted asset metadata is pinned to a content-addressed store; the
//! resulting address becomes the asset's on-ledger content reference.
//! The HTTP implementation targets an IPFS pinning service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ContentStoreError;

/// A content address (e.g. `ipfs://bafy...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentAddress(String);

impl ContentAddress {
    /// Wrap a fully qualified content address.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Build an `ipfs://` address from a bare CID.
    pub fn from_cid(cid: &str) -> Self {
        Self(format!("ipfs://{cid}"))
    }

    /// Return the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The content-addressed store collaborator.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Pin a JSON payload, returning its content address.
    async fn pin(&self, payload: &serde_json::Value) -> Result<ContentAddress, ContentStoreError>;
}

/// Configuration for the pinning service HTTP adapter.
#[derive(Debug, Clone)]
pub struct ContentStoreConfig {
    /// Base URL of the pinning service.
    pub base_url: String,
    /// JWT for pinning service authentication.
    pub jwt: String,
    /// Request timeout in seconds (default: 30).
    pub timeout_secs: u64,
}

impl ContentStoreConfig {
    /// Create a new configuration with default timeout.
    pub fn new(base_url: impl Into<String>, jwt: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            jwt: jwt.into(),
            timeout_secs: 30,
        }
    }
}

/// HTTP client for an IPFS pinning service.
#[derive(Debug)]
pub struct HttpContentStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContentStore {
    /// Create a new content store adapter from configuration.
    pub fn new(config: ContentStoreConfig) -> Result<Self, ContentStoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.jwt))
                        .map_err(|_| ContentStoreError::NotConfigured {
                            reason: "invalid JWT characters".into(),
                        })?,
                );
                headers.insert(
                    reqwest::header::CONTENT_TYPE,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .build()
            .map_err(|e| ContentStoreError::Unavailable {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn pin(&self, payload: &serde_json::Value) -> Result<ContentAddress, ContentStoreError> {
        /// Pin response shape used by Pinata-compatible services.
        #[derive(Deserialize)]
        struct PinResponse {
            #[serde(rename = "IpfsHash")]
            ipfs_hash: String,
        }

        let url = format!("{}/pinning/pinJSONToIPFS", self.base_url);
        let body = serde_json::json!({
            "pinataOptions": { "cidVersion": 0 },
            "pinataContent": payload,
        });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ContentStoreError::Unavailable {
                reason: format!("pin: {e}"),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ContentStoreError::PinRejected {
                reason: format!("HTTP {status}: {text}"),
            });
        }

        let pinned: PinResponse = resp.json().await.map_err(|e| ContentStoreError::PinRejected {
            reason: format!("response deserialization failed: {e}"),
        })?;

        Ok(ContentAddress::from_cid(&pinned.ipfs_hash))
    }
}
