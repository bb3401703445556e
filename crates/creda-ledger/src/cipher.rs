//! # Cipher Service Adapter
//!
//! Credential metadata is encrypted before it is embedded in asset
//! metadata. The cipher scheme itself is opaque to this workspace; the
//! service hands back ciphertext plus the initialization value, which the
//! engine records on the credential for later decryption.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CipherError;

/// Ciphertext and its initialization value, as produced by `encrypt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherText {
    /// The encrypted payload.
    #[serde(rename = "encryptedText")]
    pub encrypted_text: String,
    /// Initialization value needed to decrypt.
    pub iv: String,
}

/// The opaque cipher collaborator.
#[async_trait]
pub trait CipherService: Send + Sync {
    /// Encrypt a plaintext, producing ciphertext and its IV.
    async fn encrypt(&self, plaintext: &str) -> Result<CipherText, CipherError>;

    /// Decrypt a ciphertext using its IV.
    async fn decrypt(&self, encrypted_text: &str, iv: &str) -> Result<String, CipherError>;
}

/// Configuration for the cipher service HTTP adapter.
#[derive(Debug, Clone)]
pub struct CipherConfig {
    /// Base URL of the cipher service.
    pub base_url: String,
    /// Bearer token for cipher service authentication.
    pub api_key: String,
    /// Request timeout in seconds (default: 30).
    pub timeout_secs: u64,
}

impl CipherConfig {
    /// Create a new configuration with default timeout.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_secs: 30,
        }
    }
}

/// HTTP client for the cipher service.
#[derive(Debug)]
pub struct HttpCipherService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCipherService {
    /// Create a new cipher adapter from configuration.
    pub fn new(config: CipherConfig) -> Result<Self, CipherError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                        .map_err(|_| CipherError::NotConfigured {
                            reason: "invalid API key characters".into(),
                        })?,
                );
                headers.insert(
                    reqwest::header::CONTENT_TYPE,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .build()
            .map_err(|e| CipherError::Unavailable {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        operation: &str,
        url: String,
        body: serde_json::Value,
    ) -> Result<T, CipherError> {
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CipherError::Unavailable {
                reason: format!("{operation}: {e}"),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CipherError::Failed {
                operation: operation.to_string(),
                reason: format!("HTTP {status}: {body}"),
            });
        }

        resp.json().await.map_err(|e| CipherError::Failed {
            operation: operation.to_string(),
            reason: format!("response deserialization failed: {e}"),
        })
    }
}

#[async_trait]
impl CipherService for HttpCipherService {
    async fn encrypt(&self, plaintext: &str) -> Result<CipherText, CipherError> {
        self.post_json(
            "encrypt",
            format!("{}/encrypt", self.base_url),
            serde_json::json!({ "plaintext": plaintext }),
        )
        .await
    }

    async fn decrypt(&self, encrypted_text: &str, iv: &str) -> Result<String, CipherError> {
        #[derive(Deserialize)]
        struct Decrypted {
            plaintext: String,
        }
        let out: Decrypted = self
            .post_json(
                "decrypt",
                format!("{}/decrypt", self.base_url),
                serde_json::json!({ "encryptedText": encrypted_text, "iv": iv }),
            )
            .await?;
        Ok(out.plaintext)
    }
}
