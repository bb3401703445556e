//! Bitstring inflation and two-bit slot decoding.

use std::io::{Read, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;

use creda_core::ChainStatus;

/// Errors from status-list decoding.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The encoded list is not valid base64url.
    #[error("status list is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The base64-decoded payload could not be gzip-inflated.
    #[error("status list could not be inflated: {0}")]
    Inflate(#[from] std::io::Error),

    /// The slot extends past the end of the bitstring.
    #[error("slot index {index} out of range: list holds {bits} bits")]
    OutOfRange {
        /// The requested bit-pair index.
        index: u32,
        /// Total bits available in the inflated list.
        bits: usize,
    },
}

/// Inflate an encoded status list into its raw bitstring bytes.
///
/// Accepts base64url with or without padding (issuing gateways differ).
pub fn inflate_list(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    let stripped = encoded.trim_end_matches('=');
    let compressed = URL_SAFE_NO_PAD.decode(stripped)?;
    let mut bitstring = Vec::new();
    GzDecoder::new(compressed.as_slice()).read_to_end(&mut bitstring)?;
    Ok(bitstring)
}

/// Read bit `i` of a bitstring, most-significant-bit-first within each byte.
fn bit_at(bitstring: &[u8], i: u32) -> bool {
    let byte = bitstring[(i / 8) as usize];
    (byte >> (7 - (i % 8))) & 1 == 1
}

/// Decode the status of the credential whose slot starts at `index`.
///
/// Reads bits `index` and `index + 1` of the inflated bitstring as
/// independent booleans, concatenates them as a two-digit base-2 value,
/// and maps `0..=3` to [`ChainStatus`]. Fails with
/// [`DecodeError::OutOfRange`] if `index + 1` exceeds the list's bit
/// length, or with [`DecodeError::Base64`] / [`DecodeError::Inflate`] if
/// the list itself is malformed.
pub fn decode_status(encoded: &str, index: u32) -> Result<ChainStatus, DecodeError> {
    let bitstring = inflate_list(encoded)?;
    let bits = bitstring.len() * 8;
    if (index as usize).saturating_add(1) >= bits {
        return Err(DecodeError::OutOfRange { index, bits });
    }

    let high = bit_at(&bitstring, index) as u8;
    let low = bit_at(&bitstring, index + 1) as u8;
    let slot = (high << 1) | low;

    // from_slot covers 0..=3 exhaustively; two bits cannot produce more.
    Ok(ChainStatus::from_slot(slot).unwrap_or(ChainStatus::Active))
}

/// Compress and encode a raw bitstring into the wire form.
pub fn encode_list(bitstring: &[u8]) -> Result<String, std::io::Error> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bitstring)?;
    let compressed = encoder.finish()?;
    Ok(URL_SAFE_NO_PAD.encode(compressed))
}

/// Builder for status lists, used by tests and gateway fakes.
///
/// Starts with every slot `00` (active) and lets callers write individual
/// two-bit slots before encoding.
#[derive(Debug, Clone)]
pub struct StatusListBuilder {
    bitstring: Vec<u8>,
}

impl StatusListBuilder {
    /// Create a list holding `bits` zeroed bits (rounded up to whole bytes).
    pub fn new(bits: usize) -> Self {
        Self {
            bitstring: vec![0u8; bits.div_ceil(8)],
        }
    }

    /// Write the two-bit slot starting at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the slot is out of range; builders are test plumbing and
    /// size their lists up front.
    pub fn set(&mut self, index: u32, status: ChainStatus) -> &mut Self {
        let value = status.slot_value();
        self.write_bit(index, value & 0b10 != 0);
        self.write_bit(index + 1, value & 0b01 != 0);
        self
    }

    fn write_bit(&mut self, i: u32, on: bool) {
        let byte = &mut self.bitstring[(i / 8) as usize];
        let mask = 1u8 << (7 - (i % 8));
        if on {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    /// Encode the list into its gzip + base64url wire form.
    pub fn encode(&self) -> String {
        // Writing to an in-memory Vec cannot fail.
        encode_list(&self.bitstring).expect("in-memory gzip encode")
    }
}
