//! Cross-chain bridge types: monitor votes and covenant UTXO
//! transfers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::buf::{Address20, Hash256, Pubkey33};

/// Satoshi amount. BCH node RPC reports floats in BCH; everything
/// downstream of the client works in integer satoshis.
pub type Satoshi = u64;

/// The set of outpoints currently owned by the covenant address,
/// keyed by txid. Maintained by the cross-chain executor and consulted
/// by the parser to recognize redeems and conversions.
pub type UtxoSet = HashMap<Hash256, u32>;

/// A monitor's claim to participate in cross-chain supervision,
/// asserted via a coinbase OP_RETURN marker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CcNomination {
    pub pubkey: Pubkey33,
    pub nominated_count: i64,
}

/// Monitor votes aggregated over one epoch window.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorVoteInfo {
    pub start_height: i64,
    pub end_time: i64,
    #[serde(default)]
    pub nominations: Vec<CcNomination>,
}

impl MonitorVoteInfo {
    /// Same ordering invariant as epoch nominations: count descending,
    /// pubkey ascending on ties.
    pub fn sort_nominations(&mut self) {
        self.nominations.sort_by(|a, b| a.pubkey.cmp(&b.pubkey));
        self.nominations
            .sort_by(|a, b| b.nominated_count.cmp(&a.nominated_count));
    }
}

/// How a transaction moves value relative to the covenant address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CcTransferKind {
    /// A fresh deposit into the covenant P2SH output.
    New = 0,
    /// A covenant-owned outpoint spent back out to a regular script.
    Redeem = 1,
    /// A covenant-owned outpoint re-locked under the current covenant.
    Convert = 2,
}

/// Reference to one transaction output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoRef {
    pub txid: Hash256,
    pub index: u32,
    pub amount: Satoshi,
}

impl UtxoRef {
    /// The amount in the 32-byte big-endian layout the executor's wire
    /// format expects.
    pub fn amount_be32(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&self.amount.to_be_bytes());
        out
    }
}

/// One parsed cross-chain transfer. Fields irrelevant to the kind stay
/// zeroed, matching the wire layout expected by the executor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CcTransferInfo {
    pub kind: CcTransferKind,
    pub prev_utxo: UtxoRef,
    pub utxo: UtxoRef,
    pub receiver: Address20,
    pub covenant_address: Address20,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_be32_layout() {
        let utxo = UtxoRef {
            txid: Hash256::zero(),
            index: 0,
            amount: 0x0102_0304,
        };
        let be = utxo.amount_be32();
        assert_eq!(&be[..28], &[0u8; 28]);
        assert_eq!(&be[28..], &[1, 2, 3, 4]);
    }

    #[test]
    fn transfer_info_serde_round_trip() {
        let info = CcTransferInfo {
            kind: CcTransferKind::New,
            prev_utxo: UtxoRef::default(),
            utxo: UtxoRef {
                txid: Hash256::from_hex(
                    "7ff88192c5a5ee27237880230b4a9fc0c7e97d7dfe979831b23cd104d46160ee",
                )
                .unwrap(),
                index: 0,
                amount: 10_000,
            },
            receiver: Address20::from_hex("c370743331b37d3c6d0ee798b3918f6561af2c92").unwrap(),
            covenant_address: Address20::from_hex("ccf8fb324aebbc9f53a7fb28138a3d703b9e60d0")
                .unwrap(),
        };
        let json = serde_json::to_string(&info).unwrap();
        let back: CcTransferInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(info, back);
    }
}
