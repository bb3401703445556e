//! # creda-core — Foundational Types
//!
//! Domain-primitive newtypes, credential records, and the two-state status
//! model shared by every crate in the creda workspace.
//!
//! ## Two-State Model
//!
//! Every credential carries two independent status fields that must never
//! be merged into one enumeration:
//!
//! - [`InternalStatus`] — local delivery progress
//!   (`Pending → Minted → Delivered → Active`, terminal `Burned`). Advanced
//!   only by the lifecycle engine after a confirmed ledger receipt.
//! - [`ChainStatus`] — ledger-derived revocation state
//!   (`Active | Resumed | Suspended | Revoked`). Re-derived from the
//!   on-ledger status list, never advanced by local logic alone.

pub mod credential;
pub mod error;
pub mod identity;

pub use credential::{
    ChainStatus, CredentialRecord, IdentityRecord, InternalStatus, IssuerRecord, StatusChange,
    WalletRef,
};
pub use error::ValidationError;
pub use identity::{
    AccountId, CollectionId, CredentialId, DidId, FileId, IssuerId, OwnerId, SerialNumber,
};
