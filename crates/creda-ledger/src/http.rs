//! # Ledger Gateway HTTP Client
//!
//! Connects to the ledger gateway that fronts the distributed ledger:
//! DID registration, status-list slot allocation and updates, unsigned
//! transaction preparation, and signed transaction submission.
//!
//! ## Error Handling
//!
//! Timeouts and unreachable hosts map to [`GatewayError::Timeout`] /
//! [`GatewayError::Unavailable`]; 4xx responses with a decodable error
//! body map to [`GatewayError::Rejected`] carrying the remote message.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use creda_core::{ChainStatus, DidId, FileId};

use crate::error::GatewayError;
use crate::gateway::{
    DidInfo, LedgerGateway, Receipt, SignedTransaction, StatusListDocument, StatusSlot,
    TransactionRequest,
};

/// Configuration for the ledger gateway HTTP adapter.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway API.
    pub base_url: String,
    /// Bearer token for gateway authentication.
    pub api_key: String,
    /// Request timeout in seconds (default: 30).
    pub timeout_secs: u64,
}

impl GatewayConfig {
    /// Create a new configuration with default timeout.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_secs: 30,
        }
    }
}

/// HTTP client implementation of [`LedgerGateway`].
#[derive(Debug)]
pub struct HttpLedgerGateway {
    client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

/// Error body shape returned by the gateway on rejection.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpLedgerGateway {
    /// Create a new gateway adapter from configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                        .map_err(|_| GatewayError::NotConfigured {
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
            .map_err(|e| GatewayError::NotConfigured {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            timeout_ms: config.timeout_secs * 1_000,
        })
    }

    /// Send a request and map transport / non-2xx failures consistently.
    async fn send_request(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<reqwest::Response, GatewayError> {
        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout {
                    operation: operation.to_string(),
                    elapsed_ms: self.timeout_ms,
                }
            } else {
                GatewayError::Unavailable {
                    operation: operation.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = resp.status();
        debug!(operation, status = status.as_u16(), "gateway response");
        if status.is_client_error() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.message)
                .unwrap_or_else(|_| format!("HTTP {status}: {text}"));
            return Err(GatewayError::Rejected {
                operation: operation.to_string(),
                message,
            });
        }
        if status.is_server_error() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Unavailable {
                operation: operation.to_string(),
                reason: format!("HTTP {status}: {text}"),
            });
        }

        Ok(resp)
    }

    async fn decode_json<T: for<'de> Deserialize<'de>>(
        resp: reqwest::Response,
        operation: &str,
    ) -> Result<T, GatewayError> {
        resp.json().await.map_err(|e| GatewayError::Decode {
            operation: operation.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl LedgerGateway for HttpLedgerGateway {
    async fn register_did(&self, public_key_multibase: &str) -> Result<DidInfo, GatewayError> {
        let url = format!("{}/did", self.base_url);
        let body = serde_json::json!({ "publicKeyMultibase": public_key_multibase });
        let resp = self
            .send_request(self.client.post(&url).json(&body), "register_did")
            .await?;
        Self::decode_json(resp, "register_did").await
    }

    async fn register_status_slot(&self, issuer_did: &DidId) -> Result<StatusSlot, GatewayError> {
        /// Registration response: the document id plus the allocated slot.
        #[derive(Deserialize)]
        struct RegisterResponse {
            #[serde(rename = "fileId")]
            file_id: FileId,
            #[serde(rename = "statusInfo")]
            status_info: StatusInfo,
        }
        #[derive(Deserialize)]
        struct StatusInfo {
            #[serde(rename = "statusListIndex")]
            status_list_index: u32,
        }

        let url = format!("{}/did/register", self.base_url);
        let body = serde_json::json!({ "issuerDID": issuer_did.key_fragment() });
        let resp = self
            .send_request(self.client.post(&url).json(&body), "register_status_slot")
            .await?;
        let registered: RegisterResponse =
            Self::decode_json(resp, "register_status_slot").await?;
        Ok(StatusSlot {
            file_id: registered.file_id,
            file_index: registered.status_info.status_list_index,
        })
    }

    async fn request_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<Vec<u8>, GatewayError> {
        let operation = format!("request_transaction:{}", request.action());
        let url = format!("{}/assets/{}", self.base_url, request.action());
        let resp = self
            .send_request(self.client.post(&url).json(request), &operation)
            .await?;
        let bytes = resp.bytes().await.map_err(|e| GatewayError::Decode {
            operation,
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    async fn submit(&self, transaction: &SignedTransaction) -> Result<Receipt, GatewayError> {
        let url = format!("{}/transactions/submit", self.base_url);
        let resp = self
            .send_request(self.client.post(&url).json(transaction), "submit")
            .await?;
        Self::decode_json(resp, "submit").await
    }

    async fn get_status_list(
        &self,
        file_id: &FileId,
    ) -> Result<StatusListDocument, GatewayError> {
        /// Status-list documents arrive wrapped in a credential subject.
        #[derive(Deserialize)]
        struct StatusListResponse {
            #[serde(rename = "credentialSubject")]
            credential_subject: StatusListDocument,
        }

        let url = format!("{}/did/status/{}", self.base_url, file_id);
        let resp = self
            .send_request(self.client.get(&url), "get_status_list")
            .await?;
        let wrapped: StatusListResponse = Self::decode_json(resp, "get_status_list").await?;
        Ok(wrapped.credential_subject)
    }

    async fn update_status(
        &self,
        file_id: &FileId,
        file_index: u32,
        status: ChainStatus,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/did/status/{}/{}", self.base_url, file_id, file_index);
        let body = serde_json::json!({ "status": status });
        self.send_request(self.client.put(&url).json(&body), "update_status")
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_new_defaults_timeout() {
        let config = GatewayConfig::new("https://gateway.example/api/v1", "test-key");
        assert_eq!(config.base_url, "https://gateway.example/api/v1");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn adapter_builds_with_valid_config() {
        let config = GatewayConfig::new("https://gateway.example/api/v1/", "test-key");
        let gateway = HttpLedgerGateway::new(config).expect("adapter should build");
        assert_eq!(gateway.base_url, "https://gateway.example/api/v1");
        assert_eq!(gateway.timeout_ms, 30_000);
    }

    #[test]
    fn adapter_is_trait_object_safe() {
        let gateway = HttpLedgerGateway::new(GatewayConfig::new("https://g.example", "key"))
            .expect("build");
        let _boxed: Box<dyn LedgerGateway> = Box::new(gateway);
    }

    #[test]
    fn adapter_is_arc_safe() {
        use std::sync::Arc;
        let gateway = HttpLedgerGateway::new(GatewayConfig::new("https://g.example", "key"))
            .expect("build");
        let _: Arc<dyn LedgerGateway> = Arc::new(gateway);
    }
}
