//! Coinbase OP_RETURN nomination markers.
//!
//! A miner nominates a validator (or a cross-chain monitor) by mining
//! an output whose script is `OP_RETURN <id><ver><pubkey>`, where the
//! identifier is ASCII `sBCH` and the version byte is zero. Validator
//! markers carry a 32-byte pubkey, monitor markers a 33-byte
//! compressed pubkey; the payload length is what tells them apart.

use bchwatch_primitives::{Pubkey32, Pubkey33, TxInfo};

/// ASCII hex of the marker identifier `sBCH`.
pub const IDENTIFIER_HEX: &str = "73424348";

/// Marker version byte, hex encoded.
pub const VERSION_HEX: &str = "00";

/// Full asm prefix of a nomination marker output.
const MARKER_PREFIX: &str = "OP_RETURN 7342434800";

/// Scans a coinbase transaction's outputs for a validator nomination
/// marker. The first well-formed marker wins; malformed markers are
/// skipped without complaint.
pub fn extract_validator_pubkey(coinbase: &TxInfo) -> Option<Pubkey32> {
    for vout in &coinbase.vout {
        let Some(payload) = vout.script_pub_key.asm.strip_prefix(MARKER_PREFIX) else {
            continue;
        };
        if payload.len() != 2 * Pubkey32::LEN {
            continue;
        }
        if let Ok(pubkey) = Pubkey32::from_hex(payload) {
            return Some(pubkey);
        }
    }
    None
}

/// Like [`extract_validator_pubkey`] but for the 33-byte monitor
/// variant of the marker.
pub fn extract_monitor_pubkey(coinbase: &TxInfo) -> Option<Pubkey33> {
    for vout in &coinbase.vout {
        let Some(payload) = vout.script_pub_key.asm.strip_prefix(MARKER_PREFIX) else {
            continue;
        };
        if payload.len() != 2 * Pubkey33::LEN {
            continue;
        }
        if let Ok(pubkey) = Pubkey33::from_hex(payload) {
            return Some(pubkey);
        }
    }
    None
}
