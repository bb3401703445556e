//! Validation errors for domain-primitive construction.

use thiserror::Error;

/// Errors raised when constructing a validated identifier newtype.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The value was empty or whitespace-only.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the rejected field.
        field: &'static str,
    },

    /// The value did not match the expected format.
    #[error("invalid {field}: {reason}")]
    Format {
        /// Name of the rejected field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}
