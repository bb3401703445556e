//! # Repositories and Directories
//!
//! Persistence collaborator traits plus thread-safe in-memory
//! implementations backed by `DashMap`. The in-memory forms make the
//! engine usable and testable without a storage backend; a database
//! implementation lives with the embedding service.
//!
//! ## Find-or-Create Contract
//!
//! The at-most-one-open-credential invariant is a repository guarantee:
//! [`CredentialRepository::create`] must atomically reject a second open
//! record for the same (owner, issuer) pair with
//! [`RepositoryError::OpenCredentialExists`]. Without this, two
//! concurrent first-time issuances could double-register status-list
//! slots — the engine itself performs no in-process locking.

use async_trait::async_trait;
use dashmap::DashMap;

use creda_core::{
    CredentialId, CredentialRecord, IdentityRecord, IssuerId, IssuerRecord, OwnerId, WalletRef,
};

use crate::error::RepositoryError;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// CRUD over credential records, keyed by owner + issuer.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// The open (non-`Burned`) credential for the pair, if any.
    async fn find_open(
        &self,
        owner: &OwnerId,
        issuer: &IssuerId,
    ) -> Result<Option<CredentialRecord>, RepositoryError>;

    /// Look a credential up by its record id.
    async fn find_by_id(
        &self,
        id: &CredentialId,
    ) -> Result<Option<CredentialRecord>, RepositoryError>;

    /// All credentials for `owner`, optionally restricted to one issuer.
    async fn find_for_owner(
        &self,
        owner: &OwnerId,
        issuer: Option<&IssuerId>,
    ) -> Result<Vec<CredentialRecord>, RepositoryError>;

    /// Persist a freshly registered credential.
    ///
    /// Must atomically fail with [`RepositoryError::OpenCredentialExists`]
    /// if an open record already exists for the (owner, issuer) pair.
    async fn create(&self, record: CredentialRecord) -> Result<CredentialRecord, RepositoryError>;

    /// Persist an updated credential in place.
    async fn update(&self, record: &CredentialRecord) -> Result<(), RepositoryError>;
}

/// Lookup and creation of per-owner identities.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// The identity for `owner`, if one has been created.
    async fn find_by_owner(
        &self,
        owner: &OwnerId,
    ) -> Result<Option<IdentityRecord>, RepositoryError>;

    /// Persist a newly created identity.
    async fn create(&self, record: IdentityRecord) -> Result<IdentityRecord, RepositoryError>;

    /// Append a credential id to the owner's identity.
    async fn append_credential(
        &self,
        owner: &OwnerId,
        credential: CredentialId,
    ) -> Result<(), RepositoryError>;
}

/// Read-only directory of issuer configurations.
#[async_trait]
pub trait IssuerRepository: Send + Sync {
    /// The issuer configuration owned by `owner`, optionally narrowed to a
    /// specific issuer id.
    async fn find_for_owner(
        &self,
        owner: &OwnerId,
        issuer: Option<&IssuerId>,
    ) -> Result<Option<IssuerRecord>, RepositoryError>;
}

/// Resolves an owner's ledger wallet. Balance and inventory retrieval stay
/// with the wallet service; the engine only needs the account.
#[async_trait]
pub trait WalletDirectory: Send + Sync {
    /// The wallet holding `owner`'s assets, if they have one.
    async fn wallet_for(&self, owner: &OwnerId) -> Result<Option<WalletRef>, RepositoryError>;
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

/// In-memory credential repository.
///
/// The open-slot index is keyed by (owner, issuer); `create` claims the
/// slot under that key's entry lock, which is what makes concurrent
/// first-time issuance safe.
#[derive(Debug, Default)]
pub struct InMemoryCredentialRepository {
    records: DashMap<CredentialId, CredentialRecord>,
    open: DashMap<(OwnerId, IssuerId), CredentialId>,
}

impl InMemoryCredentialRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn find_open(
        &self,
        owner: &OwnerId,
        issuer: &IssuerId,
    ) -> Result<Option<CredentialRecord>, RepositoryError> {
        let Some(id) = self
            .open
            .get(&(owner.clone(), issuer.clone()))
            .map(|entry| *entry.value())
        else {
            return Ok(None);
        };
        Ok(self
            .records
            .get(&id)
            .map(|entry| entry.value().clone())
            .filter(|record| record.internal_status.is_open()))
    }

    async fn find_by_id(
        &self,
        id: &CredentialId,
    ) -> Result<Option<CredentialRecord>, RepositoryError> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_for_owner(
        &self,
        owner: &OwnerId,
        issuer: Option<&IssuerId>,
    ) -> Result<Vec<CredentialRecord>, RepositoryError> {
        let mut matches: Vec<CredentialRecord> = self
            .records
            .iter()
            .filter(|entry| {
                let record = entry.value();
                record.owner == *owner && issuer.map_or(true, |i| record.issuer == *i)
            })
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by_key(|record| record.created_at);
        Ok(matches)
    }

    async fn create(&self, record: CredentialRecord) -> Result<CredentialRecord, RepositoryError> {
        let key = (record.owner.clone(), record.issuer.clone());
        match self.open.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(existing) => {
                // The slot may be stale if its record was burned.
                let still_open = self
                    .records
                    .get(existing.get())
                    .map(|entry| entry.value().internal_status.is_open())
                    .unwrap_or(false);
                if still_open {
                    return Err(RepositoryError::OpenCredentialExists {
                        owner: record.owner.to_string(),
                        issuer: record.issuer.to_string(),
                    });
                }
                let mut existing = existing;
                existing.insert(record.id);
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(record.id);
            }
        }
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, record: &CredentialRecord) -> Result<(), RepositoryError> {
        if !self.records.contains_key(&record.id) {
            return Err(RepositoryError::Storage {
                reason: format!("credential {} does not exist", record.id),
            });
        }
        self.records.insert(record.id, record.clone());
        if !record.internal_status.is_open() {
            let key = (record.owner.clone(), record.issuer.clone());
            self.open.remove_if(&key, |_, id| *id == record.id);
        }
        Ok(())
    }
}

/// In-memory identity repository.
#[derive(Debug, Default)]
pub struct InMemoryIdentityRepository {
    identities: DashMap<OwnerId, IdentityRecord>,
}

impl InMemoryIdentityRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn find_by_owner(
        &self,
        owner: &OwnerId,
    ) -> Result<Option<IdentityRecord>, RepositoryError> {
        Ok(self
            .identities
            .get(owner)
            .map(|entry| entry.value().clone()))
    }

    async fn create(&self, record: IdentityRecord) -> Result<IdentityRecord, RepositoryError> {
        self.identities.insert(record.owner.clone(), record.clone());
        Ok(record)
    }

    async fn append_credential(
        &self,
        owner: &OwnerId,
        credential: CredentialId,
    ) -> Result<(), RepositoryError> {
        let mut entry = self
            .identities
            .get_mut(owner)
            .ok_or_else(|| RepositoryError::Storage {
                reason: format!("identity for owner {owner} does not exist"),
            })?;
        entry.value_mut().credentials.push(credential);
        Ok(())
    }
}

/// In-memory issuer directory. Issuers are provisioned out of band;
/// [`InMemoryIssuerRepository::provision`] stands in for that process.
#[derive(Debug, Default)]
pub struct InMemoryIssuerRepository {
    issuers: DashMap<(OwnerId, IssuerId), IssuerRecord>,
}

impl InMemoryIssuerRepository {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an issuer configuration.
    pub fn provision(&self, record: IssuerRecord) {
        self.issuers
            .insert((record.owner.clone(), record.issuer.clone()), record);
    }
}

#[async_trait]
impl IssuerRepository for InMemoryIssuerRepository {
    async fn find_for_owner(
        &self,
        owner: &OwnerId,
        issuer: Option<&IssuerId>,
    ) -> Result<Option<IssuerRecord>, RepositoryError> {
        match issuer {
            Some(issuer) => Ok(self
                .issuers
                .get(&(owner.clone(), issuer.clone()))
                .map(|entry| entry.value().clone())),
            None => Ok(self
                .issuers
                .iter()
                .find(|entry| entry.key().0 == *owner)
                .map(|entry| entry.value().clone())),
        }
    }
}

/// In-memory wallet directory.
#[derive(Debug, Default)]
pub struct InMemoryWalletDirectory {
    wallets: DashMap<OwnerId, WalletRef>,
}

impl InMemoryWalletDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an owner's wallet.
    pub fn register(&self, owner: OwnerId, wallet: WalletRef) {
        self.wallets.insert(owner, wallet);
    }
}

#[async_trait]
impl WalletDirectory for InMemoryWalletDirectory {
    async fn wallet_for(&self, owner: &OwnerId) -> Result<Option<WalletRef>, RepositoryError> {
        Ok(self.wallets.get(owner).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use creda_core::{FileId, InternalStatus};

    fn owner() -> OwnerId {
        OwnerId::new("user-1").expect("owner")
    }

    fn issuer() -> IssuerId {
        IssuerId::new("acme").expect("issuer")
    }

    fn record() -> CredentialRecord {
        CredentialRecord::registered(
            owner(),
            issuer(),
            FileId::new("0.0.42").expect("file id"),
            0,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn create_then_find_open() {
        let repo = InMemoryCredentialRepository::new();
        let created = repo.create(record()).await.expect("create");
        let found = repo
            .find_open(&owner(), &issuer())
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn second_open_create_is_rejected() {
        let repo = InMemoryCredentialRepository::new();
        repo.create(record()).await.expect("first create");
        let err = repo.create(record()).await.expect_err("second create");
        assert!(matches!(err, RepositoryError::OpenCredentialExists { .. }));
    }

    #[tokio::test]
    async fn burned_record_frees_the_slot() {
        let repo = InMemoryCredentialRepository::new();
        let mut created = repo.create(record()).await.expect("create");
        created.internal_status = InternalStatus::Burned;
        repo.update(&created).await.expect("update");

        assert!(repo
            .find_open(&owner(), &issuer())
            .await
            .expect("find")
            .is_none());
        // A new issuance may now claim the pair again.
        assert!(repo.create(record()).await.is_ok());
    }

    #[tokio::test]
    async fn update_unknown_record_fails() {
        let repo = InMemoryCredentialRepository::new();
        let err = repo.update(&record()).await.expect_err("missing record");
        assert!(matches!(err, RepositoryError::Storage { .. }));
    }

    #[tokio::test]
    async fn find_for_owner_filters_by_issuer() {
        let repo = InMemoryCredentialRepository::new();
        repo.create(record()).await.expect("create");

        let all = repo.find_for_owner(&owner(), None).await.expect("find");
        assert_eq!(all.len(), 1);

        let other = IssuerId::new("someone-else").expect("issuer");
        let none = repo
            .find_for_owner(&owner(), Some(&other))
            .await
            .expect("find");
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn identity_append_requires_existing_identity() {
        let repo = InMemoryIdentityRepository::new();
        let err = repo
            .append_credential(&owner(), CredentialId::new())
            .await
            .expect_err("no identity yet");
        assert!(matches!(err, RepositoryError::Storage { .. }));
    }
}
