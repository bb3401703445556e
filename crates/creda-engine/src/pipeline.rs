//! # Issuance Pipeline Steps
//!
//! The forward pipeline is modeled as an explicit ordered step list with a
//! resume-from index, not as case fallthrough: lower states execute every
//! subsequent step in order, and the mapping is auditable and testable in
//! isolation.

use creda_core::InternalStatus;

/// One step of the forward issuance pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceStep {
    /// Encrypt metadata, pin it, and mint the asset.
    Mint,
    /// Best-effort unfreeze, then transfer the asset to the owner.
    Deliver,
    /// Freeze the asset in the owner's account.
    Lock,
}

/// The forward pipeline, in execution order.
pub const ISSUANCE_PIPELINE: [IssuanceStep; 3] =
    [IssuanceStep::Mint, IssuanceStep::Deliver, IssuanceStep::Lock];

/// The pipeline index a credential in `status` resumes at.
///
/// `None` means the pipeline has nothing left to do (`Active` is the
/// idempotent steady state) or must not run at all (`Burned` is terminal).
pub fn resume_from(status: InternalStatus) -> Option<usize> {
    match status {
        InternalStatus::Pending => Some(0),
        InternalStatus::Minted => Some(1),
        InternalStatus::Delivered => Some(2),
        InternalStatus::Active | InternalStatus::Burned => None,
    }
}

/// The internal status persisted once `step` has a confirmed receipt.
pub fn status_after(step: IssuanceStep) -> InternalStatus {
    match step {
        IssuanceStep::Mint => InternalStatus::Minted,
        IssuanceStep::Deliver => InternalStatus::Delivered,
        IssuanceStep::Lock => InternalStatus::Active,
    }
}
