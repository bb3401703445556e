//! # creda-statuslist — Status List Codec
//!
//! Pure decoding of the ledger-anchored status list: an opaque bitstring,
//! gzip-compressed and base64url-encoded, in which every credential owns a
//! two-bit slot.
//!
//! ## Slot Encoding
//!
//! A credential registered at `file_index = i` owns bits `i` and `i + 1` of
//! the decompressed bitstring (most-significant-bit-first within each
//! byte). The two bits, read in order and interpreted as a base-2 value,
//! map to a [`ChainStatus`]:
//!
//! ```text
//! 00 → active    01 → resumed    10 → suspended    11 → revoked
//! ```
//!
//! ## Purity
//!
//! [`decode_status`] is deterministic, allocates only for the inflated
//! bitstring, and is safe to call concurrently. The lifecycle engine calls
//! it on every ledger re-derivation; test fakes build lists with
//! [`StatusListBuilder`].

mod codec;

pub use codec::{decode_status, encode_list, inflate_list, DecodeError, StatusListBuilder};
