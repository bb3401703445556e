//! # creda-ledger — Collaborator Adapters
//!
//! Object-safe traits and HTTP implementations for the three external
//! collaborators the lifecycle engine depends on:
//!
//! - [`LedgerGateway`] — DID registration, status-list slots and updates,
//!   and the unsigned-transaction / submit / receipt protocol for asset
//!   operations. Implemented by [`HttpLedgerGateway`].
//! - [`CipherService`] — opaque encryption of credential metadata.
//!   Implemented by [`HttpCipherService`].
//! - [`ContentStore`] — content-addressed pinning of asset metadata.
//!   Implemented by [`HttpContentStore`].
//!
//! The [`AuthoritySigner`] holds the issuing service's Ed25519 key and
//! operator account, and turns gateway-provided unsigned payloads into
//! [`SignedTransaction`]s.
//!
//! ## Architecture
//!
//! Each HTTP adapter wraps a `reqwest::Client` with a base URL, bearer
//! authentication, and a per-request timeout. Adapters are `Send + Sync`
//! and designed to be shared via `Arc` across async tasks. Retries are NOT
//! built in — the lifecycle engine's resumable pipeline is the retry
//! mechanism, driven by fresh external calls.

mod cipher;
mod content;
mod error;
mod gateway;
mod http;
mod signer;

pub use cipher::{CipherConfig, CipherService, CipherText, HttpCipherService};
pub use content::{ContentAddress, ContentStore, ContentStoreConfig, HttpContentStore};
pub use error::{CipherError, ContentStoreError, GatewayError};
pub use gateway::{
    DidInfo, LedgerAction, LedgerGateway, Receipt, ReceiptCode, SignedTransaction, StatusListDocument,
    StatusSlot, TransactionRequest,
};
pub use http::{GatewayConfig, HttpLedgerGateway};
pub use signer::{AuthorityConfig, AuthoritySigner};
