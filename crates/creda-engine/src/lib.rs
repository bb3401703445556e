//! # creda-engine — Credential Lifecycle Orchestration
//!
//! The state machine that drives a credential from registration through
//! mint, delivery, and lock, and later through status change, unlock,
//! destruction, and re-lock — resuming correctly from whatever step last
//! succeeded, and re-deriving on-ledger truth from the status list instead
//! of trusting local cache.
//!
//! ## Resumable Pipeline
//!
//! Every lifecycle step is one asynchronous ledger round trip that can
//! fail independently. The engine persists the advanced
//! [`InternalStatus`](creda_core::InternalStatus) after each confirmed
//! receipt, so the persisted state is the single source of truth for where
//! a retried call resumes. The forward pipeline is an explicit ordered
//! step list ([`pipeline::ISSUANCE_PIPELINE`]) with a resume-from index —
//! lower states execute every subsequent step in order.
//!
//! ## Composition
//!
//! All collaborators (ledger gateway, cipher service, content store,
//! repositories, wallet directory) are constructor-injected trait objects,
//! substitutable with fakes in tests.

pub mod asset;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod repository;

pub use asset::{AssetOps, MintOutcome};
pub use engine::{FetchedCredential, LifecycleEngine, Role, Session, StatusChangeOutcome};
pub use error::{EngineError, RepositoryError};
pub use pipeline::{resume_from, IssuanceStep, ISSUANCE_PIPELINE};
pub use repository::{
    CredentialRepository, IdentityRepository, InMemoryCredentialRepository,
    InMemoryIdentityRepository, InMemoryIssuerRepository, InMemoryWalletDirectory,
    IssuerRepository, WalletDirectory,
};
