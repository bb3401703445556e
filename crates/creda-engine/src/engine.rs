//! # Lifecycle Orchestrator
//!
//! [`LifecycleEngine`] drives the three caller-facing operations:
//!
//! - **issue** — find-or-create the credential for an (owner, issuer)
//!   pair, then run the forward pipeline from wherever the persisted
//!   status says it last stopped.
//! - **change_status** — write the requested status into the ledger-side
//!   list, destroy the asset when the request is a literal revocation,
//!   and re-derive the stored chain status from the list.
//! - **fetch** — authorize the caller, then load the owner's credentials
//!   with their current status lists, concurrently.
//!
//! The engine persists `internal_status` only after the receipt
//! confirming each step, so a failure leaves the record resumable at
//! exactly the step that failed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use creda_core::{
    CredentialId, CredentialRecord, IdentityRecord, InternalStatus, IssuerId, IssuerRecord,
    OwnerId, StatusChange, WalletRef,
};
use creda_ledger::{AuthoritySigner, CipherService, ContentStore, LedgerGateway};
use creda_statuslist::decode_status;

use crate::asset::AssetOps;
use crate::error::EngineError;
use crate::pipeline::{resume_from, status_after, IssuanceStep, ISSUANCE_PIPELINE};
use crate::repository::{
    CredentialRepository, IdentityRepository, IssuerRepository, WalletDirectory,
};

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Authorization role carried by a caller's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// May read any owner's credentials.
    Admin,
    /// May read their own credentials, plus those issued under an issuer
    /// configuration they own.
    User,
}

/// The caller's identity for authorization decisions.
#[derive(Debug, Clone)]
pub struct Session {
    /// The calling owner.
    pub owner: OwnerId,
    /// The caller's role.
    pub role: Role,
}

impl Session {
    /// An administrative session.
    pub fn admin(owner: OwnerId) -> Self {
        Self {
            owner,
            role: Role::Admin,
        }
    }

    /// An ordinary user session.
    pub fn user(owner: OwnerId) -> Self {
        Self {
            owner,
            role: Role::User,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What a status change left behind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChangeOutcome {
    /// The credential that was changed.
    pub credential_id: CredentialId,
    /// Delivery-progress state after the change.
    pub internal_status: InternalStatus,
    /// Ledger-derived revocation state after the change.
    pub chain_status: creda_core::ChainStatus,
}

/// One credential together with its current encoded status list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedCredential {
    /// The credential record, with `chain_status` freshly re-derived.
    pub credential: CredentialRecord,
    /// The compressed, base64url-encoded status list the slot lives in.
    pub status_list: String,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The credential lifecycle orchestrator.
///
/// Shares its collaborators behind `Arc`; one instance serves concurrent
/// requests.
pub struct LifecycleEngine {
    credentials: Arc<dyn CredentialRepository>,
    identities: Arc<dyn IdentityRepository>,
    issuers: Arc<dyn IssuerRepository>,
    wallets: Arc<dyn WalletDirectory>,
    gateway: Arc<dyn LedgerGateway>,
    signer: Arc<AuthoritySigner>,
    assets: AssetOps,
}

impl LifecycleEngine {
    /// Compose the engine over its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        credentials: Arc<dyn CredentialRepository>,
        identities: Arc<dyn IdentityRepository>,
        issuers: Arc<dyn IssuerRepository>,
        wallets: Arc<dyn WalletDirectory>,
        gateway: Arc<dyn LedgerGateway>,
        cipher: Arc<dyn CipherService>,
        content: Arc<dyn ContentStore>,
        signer: Arc<AuthoritySigner>,
    ) -> Self {
        let assets = AssetOps::new(
            Arc::clone(&gateway),
            cipher,
            content,
            Arc::clone(&signer),
        );
        Self {
            credentials,
            identities,
            issuers,
            wallets,
            gateway,
            signer,
            assets,
        }
    }

    // ─── Issuance ──────────────────────────────────────────────────────────

    /// Issue (or resume issuing) a credential to `owner` under the
    /// caller's issuer configuration.
    ///
    /// Idempotent: an already-`Active` credential is returned as-is with
    /// no ledger traffic, and a partially issued one re-runs only the
    /// steps that have not yet confirmed.
    pub async fn issue(
        &self,
        session: &Session,
        owner: &OwnerId,
        issuer_id: &IssuerId,
        metadata_b64: &str,
        expiration: DateTime<Utc>,
    ) -> Result<CredentialRecord, EngineError> {
        let issuer = self.resolve_issuer(&session.owner, issuer_id).await?;
        self.ensure_identity(owner).await?;

        let mut record = match self.credentials.find_open(owner, &issuer.issuer).await? {
            Some(existing) if existing.internal_status == InternalStatus::Active => {
                info!(credential = %existing.id, "credential already active, nothing to do");
                return Ok(existing);
            }
            Some(existing) => {
                info!(
                    credential = %existing.id,
                    status = %existing.internal_status,
                    "resuming interrupted issuance"
                );
                existing
            }
            None => self.register(owner, &issuer, expiration).await?,
        };

        let wallet = self.wallet_for(owner).await?;
        let Some(start) = resume_from(record.internal_status) else {
            return Ok(record);
        };

        for step in &ISSUANCE_PIPELINE[start..] {
            match step {
                IssuanceStep::Mint => {
                    let outcome = self.assets.mint(&record, &issuer, metadata_b64).await?;
                    record.serial_number = Some(outcome.serial_number);
                    record.iv = Some(outcome.iv);
                }
                IssuanceStep::Deliver => {
                    // Unfreeze first; a resumed delivery may find the
                    // account still frozen from a previous lifecycle.
                    self.assets.unfreeze(&issuer, &wallet).await?;
                    self.assets.send_to_owner(&record, &issuer, &wallet).await?;
                }
                IssuanceStep::Lock => {
                    self.assets.freeze(&issuer, &wallet).await?;
                }
            }
            record.internal_status = status_after(*step);
            record.updated_at = Utc::now();
            self.credentials.update(&record).await?;
            info!(
                credential = %record.id,
                status = %record.internal_status,
                "issuance step confirmed"
            );
        }

        Ok(record)
    }

    /// Register a brand-new credential: allocate its status-list slot,
    /// persist the `Pending` record, and link it to the owner's identity.
    async fn register(
        &self,
        owner: &OwnerId,
        issuer: &IssuerRecord,
        expiration: DateTime<Utc>,
    ) -> Result<CredentialRecord, EngineError> {
        let slot = self.gateway.register_status_slot(&issuer.did_id).await?;
        let record = CredentialRecord::registered(
            owner.clone(),
            issuer.issuer.clone(),
            slot.file_id,
            slot.file_index,
            expiration,
        );
        let record = self.credentials.create(record).await?;
        self.identities.append_credential(owner, record.id).await?;
        info!(
            credential = %record.id,
            file_index = record.file_index,
            "credential registered"
        );
        Ok(record)
    }

    /// Create the owner's identity on first contact: register a DID for
    /// the authority key and persist the identity record.
    async fn ensure_identity(&self, owner: &OwnerId) -> Result<IdentityRecord, EngineError> {
        if let Some(identity) = self.identities.find_by_owner(owner).await? {
            return Ok(identity);
        }
        let did = self
            .gateway
            .register_did(&self.signer.public_key_multibase())
            .await?;
        let identity = IdentityRecord {
            owner: owner.clone(),
            did_id: did.id,
            credentials: Vec::new(),
        };
        let identity = self.identities.create(identity).await?;
        info!(owner = %owner, did = %identity.did_id, "identity created");
        Ok(identity)
    }

    // ─── Status changes ────────────────────────────────────────────────────

    /// Change a credential's status.
    ///
    /// Writes the requested status into the ledger-side list (unless
    /// `skip_chain_update`, for callers reacting to an already-applied
    /// change), destroys the asset when the request is a literal
    /// revocation, and re-derives the stored chain status from the list.
    pub async fn change_status(
        &self,
        session: &Session,
        issuer_id: &IssuerId,
        credential_id: &CredentialId,
        new_status: StatusChange,
        skip_chain_update: bool,
    ) -> Result<StatusChangeOutcome, EngineError> {
        let issuer = self.resolve_issuer(&session.owner, issuer_id).await?;
        let mut record = self
            .credentials
            .find_by_id(credential_id)
            .await?
            .filter(|record| record.issuer == issuer.issuer)
            .ok_or_else(|| EngineError::NotFound {
                entity: "credential",
                key: credential_id.to_string(),
            })?;

        if !skip_chain_update {
            self.gateway
                .update_status(&record.file_id, record.file_index, new_status.wire_status())
                .await?;
            info!(
                credential = %record.id,
                status = %new_status,
                "status list updated"
            );
        }

        if new_status.destroys_asset() {
            self.destroy_asset(&mut record, &issuer).await?;
        }

        record.chain_status = if skip_chain_update {
            new_status.wire_status()
        } else {
            let document = self.gateway.get_status_list(&record.file_id).await?;
            decode_status(&document.encoded_list, record.file_index)?
        };
        record.updated_at = Utc::now();
        self.credentials.update(&record).await?;

        Ok(StatusChangeOutcome {
            credential_id: record.id,
            internal_status: record.internal_status,
            chain_status: record.chain_status,
        })
    }

    /// Revocation's asset teardown: unfreeze, wipe, re-freeze.
    ///
    /// The record turns `Burned` at the wipe receipt; a wipe failure
    /// propagates with the record untouched so a retry re-runs from the
    /// unfreeze (which tolerates the already-unfrozen account).
    async fn destroy_asset(
        &self,
        record: &mut CredentialRecord,
        issuer: &IssuerRecord,
    ) -> Result<(), EngineError> {
        if record.serial_number.is_none() {
            // Revoking a never-minted credential has no asset to destroy.
            warn!(credential = %record.id, "revoked before mint, skipping asset teardown");
            record.internal_status = InternalStatus::Burned;
            return Ok(());
        }
        let wallet = self.wallet_for(&record.owner).await?;

        self.assets.unfreeze(issuer, &wallet).await?;
        self.assets.wipe(record, issuer, &wallet).await?;
        record.internal_status = InternalStatus::Burned;
        record.updated_at = Utc::now();
        self.credentials.update(record).await?;
        info!(credential = %record.id, "asset wiped");

        self.assets.freeze(issuer, &wallet).await?;
        Ok(())
    }

    // ─── Retrieval ─────────────────────────────────────────────────────────

    /// Fetch `owner`'s credentials with their current status lists.
    ///
    /// Status lists are loaded concurrently, one task per credential;
    /// response order matches the repository's creation order, and any
    /// single failure fails the whole call.
    pub async fn fetch(
        &self,
        session: &Session,
        owner: &OwnerId,
        issuer_id: Option<&IssuerId>,
    ) -> Result<Vec<FetchedCredential>, EngineError> {
        let scope = self.fetch_scope(session, owner, issuer_id).await?;

        let records = self.credentials.find_for_owner(owner, scope.as_ref()).await?;
        let mut tasks: JoinSet<Result<(usize, FetchedCredential), EngineError>> = JoinSet::new();
        for (index, mut credential) in records.into_iter().enumerate() {
            let gateway = Arc::clone(&self.gateway);
            tasks.spawn(async move {
                let document = gateway.get_status_list(&credential.file_id).await?;
                credential.chain_status =
                    decode_status(&document.encoded_list, credential.file_index)?;
                Ok((
                    index,
                    FetchedCredential {
                        credential,
                        status_list: document.encoded_list,
                    },
                ))
            });
        }

        let mut fetched: Vec<Option<FetchedCredential>> = Vec::new();
        fetched.resize_with(tasks.len(), || None);
        while let Some(joined) = tasks.join_next().await {
            let (index, item) = joined.map_err(|e| EngineError::Internal {
                reason: format!("status list task failed to join: {e}"),
            })??;
            fetched[index] = Some(item);
        }
        // Every slot was filled by exactly one task.
        Ok(fetched.into_iter().flatten().collect())
    }

    /// Decide whether `session` may read `owner`'s credentials, and which
    /// issuer restriction applies to the view.
    ///
    /// Admins and the owner themself see whatever they ask for. Any other
    /// caller must own an issuer configuration, and their view is pinned
    /// to that issuer even when they asked for no restriction — an
    /// operator never sees credentials another operator issued. Denials
    /// surface as `NotFound` so callers cannot probe for the existence of
    /// other owners' credentials.
    async fn fetch_scope(
        &self,
        session: &Session,
        owner: &OwnerId,
        issuer_id: Option<&IssuerId>,
    ) -> Result<Option<IssuerId>, EngineError> {
        if session.role == Role::Admin || session.owner == *owner {
            return Ok(issuer_id.cloned());
        }
        if let Some(issuer) = self
            .issuers
            .find_for_owner(&session.owner, issuer_id)
            .await?
        {
            return Ok(Some(issuer.issuer));
        }
        Err(EngineError::NotFound {
            entity: "credentials",
            key: owner.to_string(),
        })
    }

    // ─── Lookups ───────────────────────────────────────────────────────────

    async fn resolve_issuer(
        &self,
        owner: &OwnerId,
        issuer_id: &IssuerId,
    ) -> Result<IssuerRecord, EngineError> {
        self.issuers
            .find_for_owner(owner, Some(issuer_id))
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "issuer",
                key: issuer_id.to_string(),
            })
    }

    async fn wallet_for(&self, owner: &OwnerId) -> Result<WalletRef, EngineError> {
        self.wallets
            .wallet_for(owner)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "wallet",
                key: owner.to_string(),
            })
    }
}

impl std::fmt::Debug for LifecycleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEngine")
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}
