//! # Ledger Gateway Trait and Wire Types
//!
//! The gateway hands back unsigned transaction payloads which the engine
//! signs with the authority key and submits; success or failure is read
//! from the returned [`Receipt`]. The gateway also owns the status-list
//! documents (registration, updates, retrieval) and DID registration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use creda_core::{AccountId, ChainStatus, CollectionId, DidId, FileId, SerialNumber};

use crate::error::GatewayError;

/// The five one-shot asset operations, named for receipts and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    /// Mint a new asset under the issuer's collection.
    Mint,
    /// Transfer an asset into the owner's account.
    Transfer,
    /// Freeze the owner's account for the collection.
    Freeze,
    /// Unfreeze the owner's account for the collection.
    Unfreeze,
    /// Destroy an asset instance held in an account.
    Wipe,
}

impl std::fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Mint => "mint",
            Self::Transfer => "transfer",
            Self::Freeze => "freeze",
            Self::Unfreeze => "unfreeze",
            Self::Wipe => "wipe",
        };
        f.write_str(s)
    }
}

/// A request for an unsigned transaction payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TransactionRequest {
    /// Mint an asset whose metadata lives at `content_ref`.
    Mint {
        /// The issuer's asset collection.
        collection_id: CollectionId,
        /// Content address of the pinned metadata envelope.
        content_ref: String,
    },
    /// Transfer a minted asset from the authority to the owner.
    Transfer {
        /// The issuer's asset collection.
        collection_id: CollectionId,
        /// The authority operator account.
        sender: AccountId,
        /// The owner's wallet account.
        receiver: AccountId,
        /// Serial of the asset being delivered.
        serial_number: SerialNumber,
        /// Transfer memo recorded on the ledger.
        memo: String,
    },
    /// Freeze `account` for `collection_id`.
    Freeze {
        /// The issuer's asset collection.
        collection_id: CollectionId,
        /// The account to freeze.
        account: AccountId,
    },
    /// Unfreeze `account` for `collection_id`.
    Unfreeze {
        /// The issuer's asset collection.
        collection_id: CollectionId,
        /// The account to unfreeze.
        account: AccountId,
    },
    /// Wipe one asset instance from `account`.
    Wipe {
        /// The issuer's asset collection.
        collection_id: CollectionId,
        /// Serial of the asset being destroyed.
        serial_number: SerialNumber,
        /// The account holding the asset.
        account: AccountId,
    },
}

impl TransactionRequest {
    /// The action this request performs, for receipts and error context.
    pub fn action(&self) -> LedgerAction {
        match self {
            Self::Mint { .. } => LedgerAction::Mint,
            Self::Transfer { .. } => LedgerAction::Transfer,
            Self::Freeze { .. } => LedgerAction::Freeze,
            Self::Unfreeze { .. } => LedgerAction::Unfreeze,
            Self::Wipe { .. } => LedgerAction::Wipe,
        }
    }
}

/// A transaction payload signed with the authority key, ready to submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// The unsigned payload as returned by the gateway, base64-encoded.
    pub payload: String,
    /// Ed25519 signature over the raw payload bytes, base64-encoded.
    pub signature: String,
    /// The signing operator account.
    pub signer: AccountId,
}

/// Result code reported by a transaction receipt.
///
/// Anything other than [`ReceiptCode::Success`] is a failed operation,
/// except the two benign freeze-state codes which the asset operations
/// tolerate as no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReceiptCode {
    /// The transaction reached consensus and applied.
    Success,
    /// Unfreeze target was never frozen — benign for unfreeze.
    TokenNotFrozen,
    /// Freeze target is already frozen — benign for freeze.
    AccountAlreadyFrozen,
    /// Any other code reported by the ledger.
    Other(String),
}

impl ReceiptCode {
    /// The wire representation of this code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "SUCCESS",
            Self::TokenNotFrozen => "TOKEN_NOT_FROZEN",
            Self::AccountAlreadyFrozen => "ACCOUNT_ALREADY_FROZEN",
            Self::Other(code) => code,
        }
    }
}

impl From<String> for ReceiptCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "SUCCESS" => Self::Success,
            "TOKEN_NOT_FROZEN" => Self::TokenNotFrozen,
            "ACCOUNT_ALREADY_FROZEN" => Self::AccountAlreadyFrozen,
            _ => Self::Other(code),
        }
    }
}

impl Serialize for ReceiptCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReceiptCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(String::deserialize(deserializer)?.into())
    }
}

impl std::fmt::Display for ReceiptCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receipt returned after a submitted transaction reaches the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Result code for the submitted transaction.
    pub status: ReceiptCode,
    /// Serial numbers assigned by a mint, in assignment order.
    #[serde(default)]
    pub serials: Vec<u64>,
    /// Consensus topic sequence number, when the action produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_sequence_number: Option<u64>,
}

impl Receipt {
    /// A bare success receipt (no serials), convenient for fakes.
    pub fn success() -> Self {
        Self {
            status: ReceiptCode::Success,
            serials: Vec::new(),
            topic_sequence_number: None,
        }
    }

    /// The first assigned serial, if the receipt carries any.
    pub fn first_serial(&self) -> Option<SerialNumber> {
        self.serials.first().copied().map(SerialNumber::new)
    }
}

/// A newly registered DID document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DidInfo {
    /// Identifier of the registered DID document.
    pub id: DidId,
}

/// A freshly allocated status-list slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSlot {
    /// The status-list document the slot lives in.
    pub file_id: FileId,
    /// The slot's bit-pair offset. Immutable once returned.
    pub file_index: u32,
}

/// The ledger's current view of a status-list document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusListDocument {
    /// The compressed, base64url-encoded bitstring.
    #[serde(rename = "encodedList")]
    pub encoded_list: String,
}

/// The ledger gateway collaborator.
///
/// Implementations must be `Send + Sync`; the engine shares one instance
/// behind an `Arc` across concurrent requests. All calls are one round
/// trip; timeout and cancellation live inside the implementation.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Register a DID document for the given multibase-encoded public key.
    async fn register_did(&self, public_key_multibase: &str) -> Result<DidInfo, GatewayError>;

    /// Allocate a new status-list slot under the issuer's DID.
    async fn register_status_slot(&self, issuer_did: &DidId) -> Result<StatusSlot, GatewayError>;

    /// Request an unsigned transaction payload for `request`.
    async fn request_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<Vec<u8>, GatewayError>;

    /// Submit a signed transaction and await its receipt.
    async fn submit(&self, transaction: &SignedTransaction) -> Result<Receipt, GatewayError>;

    /// Fetch the current encoded status list for `file_id`.
    async fn get_status_list(&self, file_id: &FileId)
        -> Result<StatusListDocument, GatewayError>;

    /// Update the two-bit slot at `file_index` to `status`.
    async fn update_status(
        &self,
        file_id: &FileId,
        file_index: u32,
        status: ChainStatus,
    ) -> Result<(), GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use creda_core::{AccountId, CollectionId};

    #[test]
    fn receipt_code_wire_roundtrip() {
        for (code, wire) in [
            (ReceiptCode::Success, "\"SUCCESS\""),
            (ReceiptCode::TokenNotFrozen, "\"TOKEN_NOT_FROZEN\""),
            (ReceiptCode::AccountAlreadyFrozen, "\"ACCOUNT_ALREADY_FROZEN\""),
            (ReceiptCode::Other("INVALID_SIGNATURE".into()), "\"INVALID_SIGNATURE\""),
        ] {
            assert_eq!(serde_json::to_string(&code).expect("serialize"), wire);
            let back: ReceiptCode = serde_json::from_str(wire).expect("deserialize");
            assert_eq!(back, code);
        }
    }

    #[test]
    fn receipt_first_serial() {
        let mut receipt = Receipt::success();
        assert!(receipt.first_serial().is_none());
        receipt.serials = vec![7, 8];
        assert_eq!(receipt.first_serial(), Some(SerialNumber::new(7)));
    }

    #[test]
    fn transaction_request_action_names() {
        let collection = CollectionId::new("0.0.555").expect("collection");
        let account = AccountId::new("0.0.777").expect("account");
        let request = TransactionRequest::Freeze {
            collection_id: collection,
            account,
        };
        assert_eq!(request.action(), LedgerAction::Freeze);
        assert_eq!(request.action().to_string(), "freeze");
    }

    #[test]
    fn transaction_request_serializes_with_action_tag() {
        let request = TransactionRequest::Mint {
            collection_id: CollectionId::new("0.0.555").expect("collection"),
            content_ref: "ipfs://bafy".into(),
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["action"], "mint");
        assert_eq!(json["content_ref"], "ipfs://bafy");
    }

    #[test]
    fn status_list_document_uses_wire_field_name() {
        let doc: StatusListDocument =
            serde_json::from_str(r#"{"encodedList":"abc"}"#).expect("deserialize");
        assert_eq!(doc.encoded_list, "abc");
    }
}
