//! # Identifier Newtypes
//!
//! Domain-primitive newtypes for identifiers used throughout the creda
//! workspace. Each identifier is a distinct type — you cannot pass an
//! [`OwnerId`] where an [`IssuerId`] is expected.
//!
//! ## Validation
//!
//! String-based identifiers validate at construction time (non-empty;
//! [`DidId`] additionally requires the `did:` scheme). The UUID-based
//! [`CredentialId`] is always valid by construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Implement `Deserialize` for a validating string newtype by routing the
/// raw string through the type's `new()` constructor, so invalid values are
/// rejected at deserialization time — not silently accepted.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Implement the common accessor / Display surface for a string newtype.
macro_rules! impl_string_newtype {
    ($ty:ident) => {
        impl $ty {
            /// Return the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s.to_string())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// UUID-based identifiers
// ---------------------------------------------------------------------------

/// Unique identifier of a credential record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialId(Uuid);

impl CredentialId {
    /// Create a new random credential identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a credential identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CredentialId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CredentialId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

// ---------------------------------------------------------------------------
// String-based identifiers
// ---------------------------------------------------------------------------

/// Opaque identifier of a credential owner (the end user).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create a validated owner identifier (non-empty).
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let s = raw.into();
        if s.trim().is_empty() {
            return Err(ValidationError::Empty { field: "owner" });
        }
        Ok(Self(s))
    }
}

impl_string_newtype!(OwnerId);
impl_validating_deserialize!(OwnerId);

/// Business key of an issuer, stable across the issuer's asset collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IssuerId(String);

impl IssuerId {
    /// Create a validated issuer identifier (non-empty).
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let s = raw.into();
        if s.trim().is_empty() {
            return Err(ValidationError::Empty { field: "issuer" });
        }
        Ok(Self(s))
    }
}

impl_string_newtype!(IssuerId);
impl_validating_deserialize!(IssuerId);

/// Identifier of an on-ledger status-list document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FileId(String);

impl FileId {
    /// Create a validated file identifier (non-empty).
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let s = raw.into();
        if s.trim().is_empty() {
            return Err(ValidationError::Empty { field: "file_id" });
        }
        Ok(Self(s))
    }
}

impl_string_newtype!(FileId);
impl_validating_deserialize!(FileId);

/// A W3C Decentralized Identifier (`did:method:identifier`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DidId(String);

impl DidId {
    /// Create a validated DID (must carry the `did:` scheme).
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let s = raw.into();
        if s.trim().is_empty() {
            return Err(ValidationError::Empty { field: "did" });
        }
        if !s.starts_with("did:") {
            return Err(ValidationError::Format {
                field: "did",
                reason: format!("expected did:method:identifier, got {s:?}"),
            });
        }
        Ok(Self(s))
    }

    /// The verification-method fragment used when registering status slots.
    pub fn key_fragment(&self) -> String {
        format!("{}#key-1", self.0)
    }
}

impl_string_newtype!(DidId);
impl_validating_deserialize!(DidId);

/// A ledger account identifier (authority operator or owner wallet).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create a validated account identifier (non-empty).
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let s = raw.into();
        if s.trim().is_empty() {
            return Err(ValidationError::Empty { field: "account_id" });
        }
        Ok(Self(s))
    }
}

impl_string_newtype!(AccountId);
impl_validating_deserialize!(AccountId);

/// Identifier of an issuer's on-ledger asset collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CollectionId(String);

impl CollectionId {
    /// Create a validated collection identifier (non-empty).
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let s = raw.into();
        if s.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "collection_id",
            });
        }
        Ok(Self(s))
    }
}

impl_string_newtype!(CollectionId);
impl_validating_deserialize!(CollectionId);

/// Serial number of a minted ledger asset.
///
/// Assigned exactly once, at the `Minted` transition; absent serials are
/// modeled as `Option<SerialNumber>` on the record, not as a sentinel string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerialNumber(u64);

impl SerialNumber {
    /// Wrap a raw serial number.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Access the raw serial number.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_id_rejects_empty() {
        assert!(OwnerId::new("").is_err());
        assert!(OwnerId::new("   ").is_err());
        assert!(OwnerId::new("user-1").is_ok());
    }

    #[test]
    fn did_requires_scheme() {
        assert!(DidId::new("did:hedera:testnet:abc123").is_ok());
        assert!(DidId::new("hedera:testnet:abc123").is_err());
        assert!(DidId::new("").is_err());
    }

    #[test]
    fn did_key_fragment() {
        let did = DidId::new("did:hedera:testnet:abc123").expect("valid did");
        assert_eq!(did.key_fragment(), "did:hedera:testnet:abc123#key-1");
    }

    #[test]
    fn credential_id_roundtrips_through_string() {
        let id = CredentialId::new();
        let parsed: CredentialId = id.to_string().parse().expect("parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn validating_deserialize_rejects_bad_did() {
        let err = serde_json::from_str::<DidId>("\"not-a-did\"");
        assert!(err.is_err());
        let ok: DidId = serde_json::from_str("\"did:key:zAbc\"").expect("valid");
        assert_eq!(ok.as_str(), "did:key:zAbc");
    }

    #[test]
    fn serial_number_display() {
        assert_eq!(SerialNumber::new(42).to_string(), "42");
        assert_eq!(SerialNumber::new(42).value(), 42);
    }
}
