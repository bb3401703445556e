//! Adapter error types.
//!
//! Each collaborator has its own error enum, mapped from HTTP failures with
//! diagnostic context (operation name, status, response body excerpt).

use thiserror::Error;

/// Errors from the ledger gateway adapter.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The adapter could not be constructed from its configuration.
    #[error("gateway not configured: {reason}")]
    NotConfigured {
        /// Why construction failed.
        reason: String,
    },

    /// The request exceeded the configured timeout.
    #[error("gateway timeout after {elapsed_ms}ms during {operation}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// Configured timeout budget.
        elapsed_ms: u64,
    },

    /// The gateway was unreachable or returned a server error.
    #[error("gateway unavailable during {operation}: {reason}")]
    Unavailable {
        /// The operation that failed.
        operation: String,
        /// Transport-level failure detail.
        reason: String,
    },

    /// The gateway rejected the request (4xx with a decodable message).
    #[error("gateway rejected {operation}: {message}")]
    Rejected {
        /// The operation that was rejected.
        operation: String,
        /// The remote error message.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("gateway response for {operation} could not be decoded: {reason}")]
    Decode {
        /// The operation whose response was malformed.
        operation: String,
        /// Deserialization failure detail.
        reason: String,
    },
}

/// Errors from the cipher service adapter.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The adapter could not be constructed from its configuration.
    #[error("cipher service not configured: {reason}")]
    NotConfigured {
        /// Why construction failed.
        reason: String,
    },

    /// Encryption or decryption failed.
    #[error("cipher operation {operation} failed: {reason}")]
    Failed {
        /// `encrypt` or `decrypt`.
        operation: String,
        /// Failure detail.
        reason: String,
    },

    /// The cipher service was unreachable.
    #[error("cipher service unavailable: {reason}")]
    Unavailable {
        /// Transport-level failure detail.
        reason: String,
    },
}

/// Errors from the content store adapter.
#[derive(Debug, Error)]
pub enum ContentStoreError {
    /// The adapter could not be constructed from its configuration.
    #[error("content store not configured: {reason}")]
    NotConfigured {
        /// Why construction failed.
        reason: String,
    },

    /// The payload could not be pinned.
    #[error("content pin rejected: {reason}")]
    PinRejected {
        /// The remote rejection detail.
        reason: String,
    },

    /// The content store was unreachable.
    #[error("content store unavailable: {reason}")]
    Unavailable {
        /// Transport-level failure detail.
        reason: String,
    },
}
