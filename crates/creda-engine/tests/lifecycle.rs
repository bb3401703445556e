//! End-to-end lifecycle tests over in-memory repositories and fake
//! ledger collaborators.
//!
//! The fake gateway keeps a call log and a real in-memory status list,
//! so the tests observe both the exact sequence of ledger operations and
//! the engine re-deriving chain status from the (actually updated) list.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Duration, Utc};

use creda_core::{
    AccountId, ChainStatus, CollectionId, DidId, FileId, InternalStatus, IssuerId, IssuerRecord,
    OwnerId, StatusChange, WalletRef,
};
use creda_engine::{
    CredentialRepository, EngineError, InMemoryCredentialRepository, InMemoryIdentityRepository,
    InMemoryIssuerRepository, InMemoryWalletDirectory, LifecycleEngine, Session,
};
use creda_ledger::{
    AuthoritySigner, CipherError, CipherService, CipherText, ContentAddress, ContentStore,
    ContentStoreError, DidInfo, GatewayError, LedgerAction, LedgerGateway, Receipt, ReceiptCode,
    SignedTransaction, StatusListDocument, StatusSlot, TransactionRequest,
};
use creda_statuslist::StatusListBuilder;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Fake gateway with a call log, per-action receipt overrides, and a real
/// in-memory status list behind the list endpoints.
struct FakeGateway {
    calls: Mutex<Vec<String>>,
    receipts: Mutex<HashMap<LedgerAction, Receipt>>,
    list: Mutex<StatusListBuilder>,
    last_action: Mutex<Option<LedgerAction>>,
    next_slot: AtomicU32,
    next_serial: AtomicU64,
    status_list_down: AtomicBool,
}

impl FakeGateway {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            receipts: Mutex::new(HashMap::new()),
            list: Mutex::new(StatusListBuilder::new(64)),
            last_action: Mutex::new(None),
            next_slot: AtomicU32::new(0),
            next_serial: AtomicU64::new(1),
            status_list_down: AtomicBool::new(false),
        }
    }

    fn log(&self, entry: impl Into<String>) {
        self.calls.lock().unwrap().push(entry.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every submission of `action` report `code`.
    fn fail_action(&self, action: LedgerAction, code: ReceiptCode) {
        self.receipts.lock().unwrap().insert(
            action,
            Receipt {
                status: code,
                serials: Vec::new(),
                topic_sequence_number: None,
            },
        );
    }

    fn position(&self, entry: &str) -> usize {
        self.calls()
            .iter()
            .position(|c| c == entry)
            .unwrap_or_else(|| panic!("no {entry} call recorded"))
    }
}

#[async_trait]
impl LedgerGateway for FakeGateway {
    async fn register_did(&self, _public_key_multibase: &str) -> Result<DidInfo, GatewayError> {
        self.log("register_did");
        Ok(DidInfo {
            id: DidId::new("did:hedera:testnet:owner").expect("did"),
        })
    }

    async fn register_status_slot(&self, _issuer_did: &DidId) -> Result<StatusSlot, GatewayError> {
        self.log("register_slot");
        Ok(StatusSlot {
            file_id: FileId::new("0.0.1000").expect("file id"),
            file_index: self.next_slot.fetch_add(2, Ordering::SeqCst),
        })
    }

    async fn request_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<Vec<u8>, GatewayError> {
        self.log(format!("prepare:{}", request.action()));
        *self.last_action.lock().unwrap() = Some(request.action());
        Ok(serde_json::to_vec(request).expect("serialize request"))
    }

    async fn submit(&self, _transaction: &SignedTransaction) -> Result<Receipt, GatewayError> {
        self.log("submit");
        let action = self
            .last_action
            .lock()
            .unwrap()
            .take()
            .expect("submit without a prepared transaction");
        let mut receipt = self
            .receipts
            .lock()
            .unwrap()
            .get(&action)
            .cloned()
            .unwrap_or_else(Receipt::success);
        if action == LedgerAction::Mint
            && receipt.status == ReceiptCode::Success
            && receipt.serials.is_empty()
        {
            receipt.serials = vec![self.next_serial.fetch_add(1, Ordering::SeqCst)];
        }
        Ok(receipt)
    }

    async fn get_status_list(
        &self,
        _file_id: &FileId,
    ) -> Result<StatusListDocument, GatewayError> {
        self.log("get_status_list");
        if self.status_list_down.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable {
                operation: "get_status_list".into(),
                reason: "scripted outage".into(),
            });
        }
        Ok(StatusListDocument {
            encoded_list: self.list.lock().unwrap().encode(),
        })
    }

    async fn update_status(
        &self,
        _file_id: &FileId,
        file_index: u32,
        status: ChainStatus,
    ) -> Result<(), GatewayError> {
        self.log(format!("update_status:{status}"));
        self.list.lock().unwrap().set(file_index, status);
        Ok(())
    }
}

struct FakeCipher;

#[async_trait]
impl CipherService for FakeCipher {
    async fn encrypt(&self, plaintext: &str) -> Result<CipherText, CipherError> {
        Ok(CipherText {
            encrypted_text: format!("enc({plaintext})"),
            iv: "iv-1".into(),
        })
    }

    async fn decrypt(&self, encrypted_text: &str, _iv: &str) -> Result<String, CipherError> {
        Ok(encrypted_text.to_string())
    }
}

struct FakeContentStore {
    pinned: Mutex<Vec<serde_json::Value>>,
}

#[async_trait]
impl ContentStore for FakeContentStore {
    async fn pin(&self, payload: &serde_json::Value) -> Result<ContentAddress, ContentStoreError> {
        self.pinned.lock().unwrap().push(payload.clone());
        Ok(ContentAddress::from_cid("bafy-fake"))
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

struct World {
    engine: LifecycleEngine,
    gateway: Arc<FakeGateway>,
    credentials: Arc<InMemoryCredentialRepository>,
    issuers: Arc<InMemoryIssuerRepository>,
    content: Arc<FakeContentStore>,
}

fn operator() -> OwnerId {
    OwnerId::new("operator-1").expect("owner")
}

fn holder() -> OwnerId {
    OwnerId::new("holder-1").expect("owner")
}

fn issuer_id() -> IssuerId {
    IssuerId::new("acme-university").expect("issuer")
}

fn operator_session() -> Session {
    Session::user(operator())
}

fn metadata() -> String {
    STANDARD.encode(r#"{"given_name":"Ada","degree":"Mathematics"}"#)
}

fn world() -> World {
    let gateway = Arc::new(FakeGateway::new());
    let credentials = Arc::new(InMemoryCredentialRepository::new());
    let identities = Arc::new(InMemoryIdentityRepository::new());
    let content = Arc::new(FakeContentStore {
        pinned: Mutex::new(Vec::new()),
    });

    let issuers = Arc::new(InMemoryIssuerRepository::new());
    issuers.provision(IssuerRecord {
        owner: operator(),
        issuer: issuer_id(),
        did_id: DidId::new("did:hedera:testnet:acme").expect("did"),
        collection_id: CollectionId::new("0.0.500").expect("collection"),
        image_ref: "ipfs://bafy-issuer-image".into(),
    });

    let wallets = Arc::new(InMemoryWalletDirectory::new());
    wallets.register(
        holder(),
        WalletRef {
            account_id: AccountId::new("0.0.777").expect("account"),
        },
    );

    let signer = Arc::new(AuthoritySigner::generate(
        AccountId::new("0.0.2").expect("account"),
    ));

    let engine = LifecycleEngine::new(
        Arc::clone(&credentials) as Arc<dyn CredentialRepository>,
        identities,
        Arc::clone(&issuers) as Arc<dyn creda_engine::IssuerRepository>,
        wallets,
        Arc::clone(&gateway) as Arc<dyn LedgerGateway>,
        Arc::new(FakeCipher),
        Arc::clone(&content) as Arc<dyn ContentStore>,
        signer,
    );

    World {
        engine,
        gateway,
        credentials,
        issuers,
        content,
    }
}

// ---------------------------------------------------------------------------
// Issuance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_issuance_mints_delivers_and_locks() {
    let w = world();
    let record = w
        .engine
        .issue(
            &operator_session(),
            &holder(),
            &issuer_id(),
            &metadata(),
            Utc::now() + Duration::days(365),
        )
        .await
        .expect("issue");

    assert_eq!(record.internal_status, InternalStatus::Active);
    assert_eq!(record.chain_status, ChainStatus::Active);
    assert!(record.serial_number.is_some());
    assert_eq!(record.iv.as_deref(), Some("iv-1"));

    // Steps execute in pipeline order, after registration.
    let mint = w.gateway.position("prepare:mint");
    let unfreeze = w.gateway.position("prepare:unfreeze");
    let transfer = w.gateway.position("prepare:transfer");
    let freeze = w.gateway.position("prepare:freeze");
    assert!(w.gateway.position("register_slot") < mint);
    assert!(mint < unfreeze && unfreeze < transfer && transfer < freeze);
}

#[tokio::test]
async fn mint_pins_the_encrypted_envelope() {
    let w = world();
    w.engine
        .issue(
            &operator_session(),
            &holder(),
            &issuer_id(),
            &metadata(),
            Utc::now() + Duration::days(365),
        )
        .await
        .expect("issue");

    let pinned = w.content.pinned.lock().unwrap();
    assert_eq!(pinned.len(), 1);
    let envelope = &pinned[0];
    assert_eq!(envelope["image"], "ipfs://bafy-issuer-image");
    let encrypted = envelope["properties"]["encryptedText"]
        .as_str()
        .expect("encryptedText");
    assert!(encrypted.starts_with("enc("));
    assert_eq!(envelope["name"], "Identity Credential");
}

#[tokio::test]
async fn issuance_is_idempotent_once_active() {
    let w = world();
    let session = operator_session();
    let expiry = Utc::now() + Duration::days(365);

    let first = w
        .engine
        .issue(&session, &holder(), &issuer_id(), &metadata(), expiry)
        .await
        .expect("first issue");
    let calls_after_first = w.gateway.calls().len();

    let second = w
        .engine
        .issue(&session, &holder(), &issuer_id(), &metadata(), expiry)
        .await
        .expect("second issue");

    assert_eq!(second.id, first.id);
    // No ledger traffic on the repeat call.
    assert_eq!(w.gateway.calls().len(), calls_after_first);
}

#[tokio::test]
async fn reissue_resumes_from_minted_without_reminting() {
    let w = world();
    let session = operator_session();
    let expiry = Utc::now() + Duration::days(365);

    // Deliver fails mid-pipeline; the record is left Minted.
    w.gateway.fail_action(
        LedgerAction::Transfer,
        ReceiptCode::Other("INVALID_SIGNATURE".into()),
    );
    let err = w
        .engine
        .issue(&session, &holder(), &issuer_id(), &metadata(), expiry)
        .await
        .expect_err("delivery fails");
    assert!(matches!(
        err,
        EngineError::LedgerOperationFailed {
            action: LedgerAction::Transfer,
            ..
        }
    ));

    let stuck = w
        .credentials
        .find_open(&holder(), &issuer_id())
        .await
        .expect("find")
        .expect("record");
    assert_eq!(stuck.internal_status, InternalStatus::Minted);
    let serial = stuck.serial_number.expect("serial from first attempt");

    // Retry picks up at delivery and keeps the original serial.
    w.gateway
        .fail_action(LedgerAction::Transfer, ReceiptCode::Success);
    let mints_before = count(&w, "prepare:mint");
    let resumed = w
        .engine
        .issue(&session, &holder(), &issuer_id(), &metadata(), expiry)
        .await
        .expect("resume");

    assert_eq!(resumed.id, stuck.id);
    assert_eq!(resumed.internal_status, InternalStatus::Active);
    assert_eq!(resumed.serial_number, Some(serial));
    assert_eq!(count(&w, "prepare:mint"), mints_before);
    assert_eq!(count(&w, "register_slot"), 1);
}

#[tokio::test]
async fn unfreeze_tolerates_never_frozen_account() {
    let w = world();
    w.gateway
        .fail_action(LedgerAction::Unfreeze, ReceiptCode::TokenNotFrozen);

    let record = w
        .engine
        .issue(
            &operator_session(),
            &holder(),
            &issuer_id(),
            &metadata(),
            Utc::now() + Duration::days(365),
        )
        .await
        .expect("issue despite benign unfreeze code");
    assert_eq!(record.internal_status, InternalStatus::Active);
}

#[tokio::test]
async fn bad_metadata_is_rejected_before_the_mint() {
    let w = world();
    let not_json = STANDARD.encode("definitely not json");

    let err = w
        .engine
        .issue(
            &operator_session(),
            &holder(),
            &issuer_id(),
            &not_json,
            Utc::now() + Duration::days(365),
        )
        .await
        .expect_err("bad metadata");
    assert!(matches!(err, EngineError::InvalidMetadata { .. }));
    assert_eq!(count(&w, "prepare:mint"), 0);
}

// ---------------------------------------------------------------------------
// Status changes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn revocation_wipes_in_order_and_burns_the_record() {
    let w = world();
    let session = operator_session();
    let record = issue_active(&w, &session).await;

    let outcome = w
        .engine
        .change_status(&session, &issuer_id(), &record.id, StatusChange::Revoked, false)
        .await
        .expect("revoke");

    assert_eq!(outcome.internal_status, InternalStatus::Burned);
    // Chain status is decoded from the list the update actually wrote.
    assert_eq!(outcome.chain_status, ChainStatus::Revoked);

    let update = w.gateway.position("update_status:revoked");
    let wipe = w.gateway.position("prepare:wipe");
    let unfreeze_positions: Vec<usize> = positions(&w, "prepare:unfreeze");
    let refreeze = *positions(&w, "prepare:freeze").last().expect("re-freeze");
    let teardown_unfreeze = *unfreeze_positions.last().expect("teardown unfreeze");
    assert!(update < teardown_unfreeze);
    assert!(teardown_unfreeze < wipe && wipe < refreeze);

    // The slot is freed: a fresh issuance may start over.
    assert!(w
        .credentials
        .find_open(&holder(), &issuer_id())
        .await
        .expect("find")
        .is_none());
}

#[tokio::test]
async fn failed_wipe_leaves_internal_status_untouched() {
    let w = world();
    let session = operator_session();
    let record = issue_active(&w, &session).await;

    w.gateway.fail_action(
        LedgerAction::Wipe,
        ReceiptCode::Other("CANNOT_WIPE_TOKEN_TREASURY_ACCOUNT".into()),
    );
    let err = w
        .engine
        .change_status(&session, &issuer_id(), &record.id, StatusChange::Revoked, false)
        .await
        .expect_err("wipe fails");
    assert!(matches!(
        err,
        EngineError::LedgerOperationFailed {
            action: LedgerAction::Wipe,
            ..
        }
    ));

    // The record is still resumable for a retried revocation.
    let stored = w
        .credentials
        .find_by_id(&record.id)
        .await
        .expect("find")
        .expect("record");
    assert_eq!(stored.internal_status, InternalStatus::Active);
}

#[tokio::test]
async fn expiry_revokes_the_slot_but_keeps_the_asset() {
    let w = world();
    let session = operator_session();
    let record = issue_active(&w, &session).await;

    let outcome = w
        .engine
        .change_status(&session, &issuer_id(), &record.id, StatusChange::Expired, false)
        .await
        .expect("expire");

    assert_eq!(outcome.chain_status, ChainStatus::Revoked);
    assert_eq!(outcome.internal_status, InternalStatus::Active);
    assert_eq!(count(&w, "prepare:wipe"), 0);
}

#[tokio::test]
async fn suspend_and_resume_rederive_chain_status_from_the_list() {
    let w = world();
    let session = operator_session();
    let record = issue_active(&w, &session).await;

    let suspended = w
        .engine
        .change_status(&session, &issuer_id(), &record.id, StatusChange::Suspended, false)
        .await
        .expect("suspend");
    assert_eq!(suspended.chain_status, ChainStatus::Suspended);

    let resumed = w
        .engine
        .change_status(&session, &issuer_id(), &record.id, StatusChange::Resumed, false)
        .await
        .expect("resume");
    assert_eq!(resumed.chain_status, ChainStatus::Resumed);
}

#[tokio::test]
async fn skip_chain_update_trusts_the_requested_status() {
    let w = world();
    let session = operator_session();
    let record = issue_active(&w, &session).await;
    let calls_before = w.gateway.calls().len();

    let outcome = w
        .engine
        .change_status(&session, &issuer_id(), &record.id, StatusChange::Suspended, true)
        .await
        .expect("suspend without chain write");

    assert_eq!(outcome.chain_status, ChainStatus::Suspended);
    // Neither the list update nor the readback happened.
    assert_eq!(w.gateway.calls().len(), calls_before);
}

#[tokio::test]
async fn status_change_for_foreign_credential_is_not_found() {
    let w = world();
    let session = operator_session();
    let record = issue_active(&w, &session).await;

    let stranger = Session::user(OwnerId::new("stranger").expect("owner"));
    let err = w
        .engine
        .change_status(&stranger, &issuer_id(), &record.id, StatusChange::Revoked, false)
        .await
        .expect_err("stranger owns no issuer");
    assert!(matches!(err, EngineError::NotFound { entity: "issuer", .. }));
}

// ---------------------------------------------------------------------------
// Retrieval
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_returns_list_and_rederived_status() {
    let w = world();
    let session = operator_session();
    let record = issue_active(&w, &session).await;

    w.engine
        .change_status(&session, &issuer_id(), &record.id, StatusChange::Suspended, false)
        .await
        .expect("suspend");

    let fetched = w
        .engine
        .fetch(&Session::user(holder()), &holder(), None)
        .await
        .expect("fetch own credentials");

    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].credential.id, record.id);
    assert_eq!(fetched[0].credential.chain_status, ChainStatus::Suspended);
    assert!(!fetched[0].status_list.is_empty());
}

#[tokio::test]
async fn fetch_loads_every_credential_in_creation_order() {
    let w = world();
    let session = operator_session();
    let first = issue_active(&w, &session).await;

    // A second issuer under the same operator issues a second credential.
    let second_issuer = IssuerId::new("beta-institute").expect("issuer");
    w.issuers.provision(IssuerRecord {
        owner: operator(),
        issuer: second_issuer.clone(),
        did_id: DidId::new("did:hedera:testnet:beta").expect("did"),
        collection_id: CollectionId::new("0.0.501").expect("collection"),
        image_ref: "ipfs://bafy-beta-image".into(),
    });
    let second = w
        .engine
        .issue(
            &session,
            &holder(),
            &second_issuer,
            &metadata(),
            Utc::now() + Duration::days(365),
        )
        .await
        .expect("second issue");

    let fetched = w
        .engine
        .fetch(&Session::user(holder()), &holder(), None)
        .await
        .expect("fetch");

    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched[0].credential.id, first.id);
    assert_eq!(fetched[1].credential.id, second.id);
    assert_eq!(count(&w, "get_status_list"), 2);
}

#[tokio::test]
async fn fetch_fails_when_any_status_list_is_unavailable() {
    let w = world();
    let session = operator_session();
    issue_active(&w, &session).await;

    w.gateway.status_list_down.store(true, Ordering::SeqCst);
    let err = w
        .engine
        .fetch(&Session::user(holder()), &holder(), None)
        .await
        .expect_err("gateway outage");
    assert!(matches!(err, EngineError::Transport(_)));
}

#[tokio::test]
async fn fetch_authorization_rules() {
    let w = world();
    let session = operator_session();
    issue_active(&w, &session).await;

    // Admins read anyone.
    let admin = Session::admin(OwnerId::new("auditor").expect("owner"));
    assert_eq!(
        w.engine.fetch(&admin, &holder(), None).await.expect("admin").len(),
        1
    );

    // The issuer's operator reads credentials they issued.
    assert_eq!(
        w.engine
            .fetch(&session, &holder(), Some(&issuer_id()))
            .await
            .expect("issuer operator")
            .len(),
        1
    );

    // Strangers are told nothing exists.
    let stranger = Session::user(OwnerId::new("stranger").expect("owner"));
    let err = w
        .engine
        .fetch(&stranger, &holder(), None)
        .await
        .expect_err("denied");
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn operator_fetch_is_pinned_to_their_own_issuer() {
    let w = world();
    let session = operator_session();
    let own = issue_active(&w, &session).await;

    // A rival operator issues to the same holder under their own issuer.
    let rival_operator = OwnerId::new("operator-2").expect("owner");
    let rival_issuer = IssuerId::new("rival-institute").expect("issuer");
    w.issuers.provision(IssuerRecord {
        owner: rival_operator.clone(),
        issuer: rival_issuer.clone(),
        did_id: DidId::new("did:hedera:testnet:rival").expect("did"),
        collection_id: CollectionId::new("0.0.502").expect("collection"),
        image_ref: "ipfs://bafy-rival-image".into(),
    });
    w.engine
        .issue(
            &Session::user(rival_operator),
            &holder(),
            &rival_issuer,
            &metadata(),
            Utc::now() + Duration::days(365),
        )
        .await
        .expect("rival issue");

    // An unrestricted query from operator-1 still only shows what they
    // themselves issued.
    let fetched = w
        .engine
        .fetch(&session, &holder(), None)
        .await
        .expect("operator fetch");
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].credential.id, own.id);
    assert_eq!(fetched[0].credential.issuer, issuer_id());

    // Asking for the rival's issuer outright is denied.
    let err = w
        .engine
        .fetch(&session, &holder(), Some(&rival_issuer))
        .await
        .expect_err("foreign issuer");
    assert!(matches!(err, EngineError::NotFound { .. }));

    // The holder's own view stays unrestricted.
    assert_eq!(
        w.engine
            .fetch(&Session::user(holder()), &holder(), None)
            .await
            .expect("holder fetch")
            .len(),
        2
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn issue_active(w: &World, session: &Session) -> creda_core::CredentialRecord {
    w.engine
        .issue(
            session,
            &holder(),
            &issuer_id(),
            &metadata(),
            Utc::now() + Duration::days(365),
        )
        .await
        .expect("issue")
}

fn count(w: &World, entry: &str) -> usize {
    w.gateway.calls().iter().filter(|c| *c == entry).count()
}

fn positions(w: &World, entry: &str) -> Vec<usize> {
    w.gateway
        .calls()
        .iter()
        .enumerate()
        .filter(|(_, c)| *c == entry)
        .map(|(i, _)| i)
        .collect()
}
