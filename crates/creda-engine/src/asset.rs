//! # Ledger Asset Operations
//!
//! The five one-shot asset operations behind the lifecycle pipelines.
//! Every operation follows the same protocol: request an unsigned
//! transaction from the gateway, sign it with the authority key, submit
//! it, and interpret the receipt. Success is the receipt reporting
//! [`ReceiptCode::Success`]; freeze and unfreeze additionally tolerate
//! their "already in target state" codes as benign no-ops.
//!
//! Operations never touch persisted credential state — the orchestrator
//! owns the record and advances `internal_status` only after the receipt
//! confirming each step.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, warn};

use creda_core::{CredentialRecord, IssuerRecord, SerialNumber, WalletRef};
use creda_ledger::{
    AuthoritySigner, CipherService, ContentStore, LedgerAction, LedgerGateway, Receipt,
    ReceiptCode, TransactionRequest,
};

use crate::error::EngineError;

/// What a successful mint produced: the asset serial and the metadata IV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintOutcome {
    /// Serial assigned to the minted asset.
    pub serial_number: SerialNumber,
    /// Initialization value from encrypting the credential metadata.
    pub iv: String,
}

/// Executes asset operations against the ledger gateway.
pub struct AssetOps {
    gateway: Arc<dyn LedgerGateway>,
    cipher: Arc<dyn CipherService>,
    content: Arc<dyn ContentStore>,
    signer: Arc<AuthoritySigner>,
}

impl AssetOps {
    /// Compose the asset operations over their collaborators.
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        cipher: Arc<dyn CipherService>,
        content: Arc<dyn ContentStore>,
        signer: Arc<AuthoritySigner>,
    ) -> Self {
        Self {
            gateway,
            cipher,
            content,
            signer,
        }
    }

    /// Request, sign, submit, and return the receipt for one transaction.
    async fn execute(&self, request: &TransactionRequest) -> Result<Receipt, EngineError> {
        let unsigned = self.gateway.request_transaction(request).await?;
        let signed = self.signer.sign(&unsigned);
        let receipt = self.gateway.submit(&signed).await?;
        debug!(
            action = %request.action(),
            code = %receipt.status,
            "ledger receipt"
        );
        Ok(receipt)
    }

    /// Fail unless the receipt reports success.
    fn require_success(action: LedgerAction, receipt: &Receipt) -> Result<(), EngineError> {
        if receipt.status == ReceiptCode::Success {
            Ok(())
        } else {
            Err(EngineError::LedgerOperationFailed {
                action,
                code: receipt.status.clone(),
            })
        }
    }

    /// Mint the credential's asset.
    ///
    /// Decodes the caller-supplied base64 metadata, encrypts it through
    /// the cipher service, pins the metadata envelope to the content
    /// store, and mints with the resulting content reference.
    pub async fn mint(
        &self,
        credential: &CredentialRecord,
        issuer: &IssuerRecord,
        metadata_b64: &str,
    ) -> Result<MintOutcome, EngineError> {
        let raw = STANDARD
            .decode(metadata_b64)
            .map_err(|e| EngineError::InvalidMetadata {
                reason: format!("metadata is not valid base64: {e}"),
            })?;
        let plaintext = String::from_utf8(raw).map_err(|e| EngineError::InvalidMetadata {
            reason: format!("metadata is not valid UTF-8: {e}"),
        })?;
        // Reject malformed metadata before any ledger call.
        let metadata: serde_json::Value =
            serde_json::from_str(&plaintext).map_err(|e| EngineError::InvalidMetadata {
                reason: format!("metadata is not valid JSON: {e}"),
            })?;

        let encrypted = self.cipher.encrypt(&metadata.to_string()).await?;

        let envelope = serde_json::json!({
            "name": "Identity Credential",
            "description": format!("Verifiable credential issued by {}", issuer.issuer),
            "creator": issuer.issuer.as_str(),
            "properties": {
                "encryptedText": encrypted.encrypted_text,
            },
            "image": issuer.image_ref,
        });
        let content_ref = self.content.pin(&envelope).await?;

        let request = TransactionRequest::Mint {
            collection_id: issuer.collection_id.clone(),
            content_ref: content_ref.to_string(),
        };
        let receipt = self.execute(&request).await?;
        Self::require_success(LedgerAction::Mint, &receipt)?;
        debug!(credential = %credential.id, "asset minted");

        let serial_number =
            receipt
                .first_serial()
                .ok_or_else(|| EngineError::MalformedReceipt {
                    action: LedgerAction::Mint,
                    reason: "success receipt carries no serial".into(),
                })?;

        Ok(MintOutcome {
            serial_number,
            iv: encrypted.iv,
        })
    }

    /// Transfer the minted asset into the owner's wallet.
    pub async fn send_to_owner(
        &self,
        credential: &CredentialRecord,
        issuer: &IssuerRecord,
        wallet: &WalletRef,
    ) -> Result<(), EngineError> {
        let serial_number =
            credential
                .serial_number
                .ok_or_else(|| EngineError::MalformedReceipt {
                    action: LedgerAction::Transfer,
                    reason: "credential has no serial number".into(),
                })?;

        let request = TransactionRequest::Transfer {
            collection_id: issuer.collection_id.clone(),
            sender: self.signer.account_id().clone(),
            receiver: wallet.account_id.clone(),
            serial_number,
            memo: format!("{} identity asset transfer", issuer.issuer),
        };
        let receipt = self.execute(&request).await?;
        Self::require_success(LedgerAction::Transfer, &receipt)
    }

    /// Freeze the owner's account for the issuer's collection.
    ///
    /// An already-frozen account is a benign no-op.
    pub async fn freeze(
        &self,
        issuer: &IssuerRecord,
        wallet: &WalletRef,
    ) -> Result<(), EngineError> {
        let request = TransactionRequest::Freeze {
            collection_id: issuer.collection_id.clone(),
            account: wallet.account_id.clone(),
        };
        let receipt = self.execute(&request).await?;
        match receipt.status {
            ReceiptCode::Success => Ok(()),
            ReceiptCode::AccountAlreadyFrozen => {
                warn!(account = %wallet.account_id, "account already frozen");
                Ok(())
            }
            code => Err(EngineError::LedgerOperationFailed {
                action: LedgerAction::Freeze,
                code,
            }),
        }
    }

    /// Unfreeze the owner's account for the issuer's collection.
    ///
    /// A never-frozen account is a benign no-op, which also makes this
    /// operation safe to repeat when a revocation retry re-runs it.
    pub async fn unfreeze(
        &self,
        issuer: &IssuerRecord,
        wallet: &WalletRef,
    ) -> Result<(), EngineError> {
        let request = TransactionRequest::Unfreeze {
            collection_id: issuer.collection_id.clone(),
            account: wallet.account_id.clone(),
        };
        let receipt = self.execute(&request).await?;
        match receipt.status {
            ReceiptCode::Success => Ok(()),
            ReceiptCode::TokenNotFrozen => {
                warn!(account = %wallet.account_id, "account was not frozen");
                Ok(())
            }
            code => Err(EngineError::LedgerOperationFailed {
                action: LedgerAction::Unfreeze,
                code,
            }),
        }
    }

    /// Wipe the credential's asset from the owner's account.
    pub async fn wipe(
        &self,
        credential: &CredentialRecord,
        issuer: &IssuerRecord,
        wallet: &WalletRef,
    ) -> Result<(), EngineError> {
        let serial_number =
            credential
                .serial_number
                .ok_or_else(|| EngineError::MalformedReceipt {
                    action: LedgerAction::Wipe,
                    reason: "credential has no serial number".into(),
                })?;

        let request = TransactionRequest::Wipe {
            collection_id: issuer.collection_id.clone(),
            serial_number,
            account: wallet.account_id.clone(),
        };
        let receipt = self.execute(&request).await?;
        Self::require_success(LedgerAction::Wipe, &receipt)
    }
}

impl std::fmt::Debug for AssetOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetOps")
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}
