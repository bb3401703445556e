//! Engine error types.
//!
//! Lower-level failures are wrapped with enough context (action attempted,
//! credential id) to resume the pipeline later; nothing is silently
//! swallowed except the documented freeze-state tolerances.

use thiserror::Error;

use creda_ledger::{CipherError, ContentStoreError, GatewayError, LedgerAction, ReceiptCode};
use creda_statuslist::DecodeError;

/// Errors from the persistence collaborator.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// An open credential already exists for the (owner, issuer) pair.
    ///
    /// Raised by `create` to uphold the at-most-one-open-credential
    /// invariant; callers reaching this raced another issuance.
    #[error("open credential already exists for owner {owner} and issuer {issuer}")]
    OpenCredentialExists {
        /// The owner of the conflicting pair.
        owner: String,
        /// The issuer of the conflicting pair.
        issuer: String,
    },

    /// The storage backend failed.
    #[error("storage failure: {reason}")]
    Storage {
        /// Backend failure detail.
        reason: String,
    },
}

/// Errors surfaced by the lifecycle engine's entry points.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An issuer, identity, credential, or wallet could not be resolved.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// What was being looked up.
        entity: &'static str,
        /// The lookup key, for diagnostics.
        key: String,
    },

    /// A ledger receipt reported a non-success, non-tolerated code.
    #[error("ledger {action} failed with code {code}")]
    LedgerOperationFailed {
        /// The asset operation that failed.
        action: LedgerAction,
        /// The code reported by the receipt.
        code: ReceiptCode,
    },

    /// A ledger receipt succeeded but is missing required data.
    #[error("ledger {action} returned a malformed receipt: {reason}")]
    MalformedReceipt {
        /// The asset operation whose receipt is malformed.
        action: LedgerAction,
        /// What was missing or wrong.
        reason: String,
    },

    /// The status list could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The ledger gateway was unreachable or rejected a call.
    #[error(transparent)]
    Transport(#[from] GatewayError),

    /// The cipher service failed during mint.
    #[error(transparent)]
    Encryption(#[from] CipherError),

    /// The content store failed during mint.
    #[error(transparent)]
    ContentStore(#[from] ContentStoreError),

    /// The persistence collaborator failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The caller-supplied credential metadata is malformed.
    #[error("invalid credential metadata: {reason}")]
    InvalidMetadata {
        /// Why the metadata was rejected.
        reason: String,
    },

    /// A concurrent retrieval task failed to join.
    #[error("internal failure: {reason}")]
    Internal {
        /// What went wrong.
        reason: String,
    },
}
