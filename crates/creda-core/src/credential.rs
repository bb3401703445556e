//! # Credential, Issuer, and Identity Records
//!
//! The persisted record types and the two-state status model.
//!
//! ## Status Fields
//!
//! [`InternalStatus`] tracks delivery progress and only ever moves forward
//! (or terminates at `Burned`); [`ChainStatus`] mirrors the on-ledger
//! status-list slot and is re-derived from the ledger, never advanced
//! locally. [`StatusChange`] is the caller-facing requested status for the
//! revocation pipeline; it carries `Expired`, which the ledger-side list
//! has no concept of and which therefore maps to `Revoked` on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{
    AccountId, CollectionId, CredentialId, DidId, FileId, IssuerId, OwnerId, SerialNumber,
};

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Local delivery-progress state of a credential.
///
/// Advances strictly forward (`Pending → Minted → Delivered → Active`) or
/// terminates at `Burned`. Resumption re-executes the remaining forward
/// steps; it never skips or reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InternalStatus {
    /// Status-list slot registered, asset not yet minted.
    Pending,
    /// Asset minted under the issuer's collection; serial number assigned.
    Minted,
    /// Asset transferred into the owner's custody.
    Delivered,
    /// Asset frozen in the owner's account; steady state.
    Active,
    /// Asset wiped from the owner's account; terminal.
    Burned,
}

impl InternalStatus {
    /// Whether this credential still occupies the (owner, issuer) slot —
    /// i.e. a new issuance must resume this record instead of creating one.
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Burned)
    }
}

impl std::fmt::Display for InternalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Minted => "MINTED",
            Self::Delivered => "DELIVERED",
            Self::Active => "ACTIVE",
            Self::Burned => "BURNED",
        };
        f.write_str(s)
    }
}

/// Ledger-derived revocation state, decoded from the status list's two-bit
/// slot. The numeric discriminants are the slot values themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    /// Slot `00` — credential is active.
    Active = 0,
    /// Slot `01` — credential was suspended and has been resumed.
    Resumed = 1,
    /// Slot `10` — credential is suspended.
    Suspended = 2,
    /// Slot `11` — credential is revoked.
    Revoked = 3,
}

impl ChainStatus {
    /// Map a decoded two-bit slot value to its status.
    ///
    /// Returns `None` for values outside `[0, 3]`.
    pub fn from_slot(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Active),
            1 => Some(Self::Resumed),
            2 => Some(Self::Suspended),
            3 => Some(Self::Revoked),
            _ => None,
        }
    }

    /// The slot value this status occupies in the encoded list.
    pub fn slot_value(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Resumed => "resumed",
            Self::Suspended => "suspended",
            Self::Revoked => "revoked",
        };
        f.write_str(s)
    }
}

/// A caller-requested status change for the revocation pipeline.
///
/// `Expired` exists only on this request surface: the ledger-side list has
/// no expired slot, so it is written (and stored) as `Revoked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusChange {
    /// Reactivate the credential.
    Active,
    /// Resume a suspended credential.
    Resumed,
    /// Suspend the credential.
    Suspended,
    /// Revoke the credential and destroy its asset.
    Revoked,
    /// Mark the credential expired (revoked on the wire).
    Expired,
}

impl StatusChange {
    /// The status actually written to the ledger-side list.
    pub fn wire_status(&self) -> ChainStatus {
        match self {
            Self::Active => ChainStatus::Active,
            Self::Resumed => ChainStatus::Resumed,
            Self::Suspended => ChainStatus::Suspended,
            Self::Revoked | Self::Expired => ChainStatus::Revoked,
        }
    }

    /// Whether this request destroys the underlying asset.
    ///
    /// Only a literal `Revoked` request triggers the unfreeze→wipe→freeze
    /// sequence; `Expired` revokes the list slot but leaves the asset.
    pub fn destroys_asset(&self) -> bool {
        matches!(self, Self::Revoked)
    }
}

impl std::fmt::Display for StatusChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Resumed => "resumed",
            Self::Suspended => "suspended",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One credential per (owner, issuer) pair that has ever been issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Record identifier.
    pub id: CredentialId,
    /// The credential's owner.
    pub owner: OwnerId,
    /// The issuing party's business key.
    pub issuer: IssuerId,
    /// On-ledger status-list document holding this credential's slot.
    pub file_id: FileId,
    /// Bit-pair offset into the status list. Allocated once at
    /// registration; never reused or mutated.
    pub file_index: u32,
    /// Ledger asset serial; `None` until minted.
    pub serial_number: Option<SerialNumber>,
    /// Initialization value from encrypting the credential metadata;
    /// `None` until minted.
    pub iv: Option<String>,
    /// Delivery-progress state.
    pub internal_status: InternalStatus,
    /// Ledger-derived revocation state.
    pub chain_status: ChainStatus,
    /// Caller-supplied expiry.
    pub expiration_date: DateTime<Utc>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Create a freshly registered credential in `Pending` with an `Active`
    /// chain slot, as written by the registration step.
    pub fn registered(
        owner: OwnerId,
        issuer: IssuerId,
        file_id: FileId,
        file_index: u32,
        expiration_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CredentialId::new(),
            owner,
            issuer,
            file_id,
            file_index,
            serial_number: None,
            iv: None,
            internal_status: InternalStatus::Pending,
            chain_status: ChainStatus::Active,
            expiration_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Issuer configuration: DID plus the asset collection credentials are
/// minted under. Externally provisioned; read-only to this engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuerRecord {
    /// Owner (operator) of the issuer configuration.
    pub owner: OwnerId,
    /// The issuer's business key.
    pub issuer: IssuerId,
    /// The issuer's DID.
    pub did_id: DidId,
    /// The ledger asset collection credentials are minted into.
    pub collection_id: CollectionId,
    /// Content address of the image embedded in minted asset metadata.
    pub image_ref: String,
}

/// Per-owner identity: DID document plus the credentials issued to them.
/// Created lazily on first issuance; only appended to afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// The identity's owner.
    pub owner: OwnerId,
    /// The owner's DID document identifier.
    pub did_id: DidId,
    /// Credentials issued to this owner, in issuance order.
    pub credentials: Vec<CredentialId>,
}

/// The owner's ledger account, resolved through the wallet directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRef {
    /// The account the owner's assets are held in.
    pub account_id: AccountId,
}
