//! Cross-chain covenant transfer classification.
//!
//! Every non-coinbase transaction in a finalized block is tested
//! against the rotating covenant P2SH address and the executor's set
//! of covenant-owned outpoints. A transaction yields at most one
//! [`CcTransferInfo`]:
//!
//! - *New*: a vout locks value under the current covenant and a
//!   receiver can be determined (OP_RETURN marker, or a P2PKH-shaped
//!   input as fallback).
//! - *Convert*: a tracked outpoint is spent and exactly one vout
//!   re-locks under the current covenant.
//! - *Redeem*: a tracked outpoint is spent and no vout pays either
//!   covenant address (or a vout pays the burn script).
//!
//! Spending a tracked outpoint dominates, so a transaction that both
//! spends covenant value and creates a fresh covenant output with a
//! receiver marker classifies as Convert, not New. Malformed hex
//! anywhere skips the offending vout/vin rather than aborting the
//! transaction.

use bchwatch_primitives::{
    Address20, CcTransferInfo, CcTransferKind, Hash256, Satoshi, TxInfo, UtxoRef, UtxoSet, Vin,
};
use tracing::trace;

/// ASCII hex of the receiver OP_RETURN identifier `sBCHAddr`.
pub const RECEIVER_IDENTIFIER: &[u8] = b"sBCHAddr";

/// P2PKH lock script of the burn address.
const BURN_SCRIPT_HEX: &str = "76a91404df9d9fede348a5f82337ce87a829be2200aed688ac";

const OP_RETURN_PREFIX: &str = "OP_RETURN ";

/// Classifier state: the two covenant addresses in rotation and a
/// snapshot of the covenant-owned outpoint set.
#[derive(Clone, Debug, Default)]
pub struct CcTxParser {
    prev_covenant_address: Option<Address20>,
    current_covenant_address: Address20,
    utxo_set: UtxoSet,
}

impl CcTxParser {
    pub fn new(current_covenant_address: Address20) -> Self {
        Self {
            prev_covenant_address: None,
            current_covenant_address,
            utxo_set: UtxoSet::new(),
        }
    }

    /// Reloads the rotation state and the outpoint snapshot ahead of a
    /// collection pass.
    pub fn refresh(
        &mut self,
        prev_covenant_address: Option<Address20>,
        current_covenant_address: Address20,
        utxo_set: UtxoSet,
    ) {
        self.prev_covenant_address = prev_covenant_address;
        self.current_covenant_address = current_covenant_address;
        self.utxo_set = utxo_set;
    }

    pub fn current_covenant_address(&self) -> &Address20 {
        &self.current_covenant_address
    }

    /// Classifies every non-coinbase transaction of a block, in tx
    /// order.
    pub fn parse_block_txs(&self, txs: &[TxInfo]) -> Vec<CcTransferInfo> {
        txs.iter()
            .filter(|tx| !tx.is_coinbase())
            .filter_map(|tx| self.parse_tx(tx))
            .collect()
    }

    /// Classifies a single transaction.
    pub fn parse_tx(&self, tx: &TxInfo) -> Option<CcTransferInfo> {
        let tx_hash = tx_hash(tx)?;
        let current_asm = p2sh_asm(&self.current_covenant_address);
        let covenant_vouts: Vec<_> = tx
            .vout
            .iter()
            .filter(|v| v.script_pub_key.asm == current_asm)
            .collect();
        let pays_prev_covenant = self
            .prev_covenant_address
            .as_ref()
            .map(p2sh_asm)
            .is_some_and(|asm| tx.vout.iter().any(|v| v.script_pub_key.asm == asm));

        if let Some((spent_txid, spent_vout)) = self.find_tracked_spend(tx) {
            let prev_utxo = UtxoRef {
                txid: spent_txid,
                index: spent_vout,
                amount: 0,
            };
            if covenant_vouts.len() == 1 {
                let vout = covenant_vouts[0];
                let amount = sat_amount(vout.value)?;
                trace!(txid = %tx_hash, "found covenant convert tx");
                return Some(CcTransferInfo {
                    kind: CcTransferKind::Convert,
                    prev_utxo,
                    utxo: UtxoRef {
                        txid: tx_hash,
                        index: vout.n,
                        amount,
                    },
                    receiver: Address20::zero(),
                    covenant_address: self.current_covenant_address,
                });
            }
            if (covenant_vouts.is_empty() && !pays_prev_covenant) || has_burn_output(tx) {
                trace!(txid = %tx_hash, "found covenant redeem tx");
                return Some(CcTransferInfo {
                    kind: CcTransferKind::Redeem,
                    prev_utxo,
                    utxo: UtxoRef::default(),
                    receiver: Address20::zero(),
                    covenant_address: Address20::zero(),
                });
            }
            return None;
        }

        // No tracked spend: a fresh deposit needs a covenant output
        // and a resolvable receiver.
        let vout = covenant_vouts.first()?;
        let receiver = find_receiver(tx)?;
        let amount = sat_amount(vout.value)?;
        trace!(txid = %tx_hash, %receiver, "found new covenant utxo");
        Some(CcTransferInfo {
            kind: CcTransferKind::New,
            prev_utxo: UtxoRef::default(),
            utxo: UtxoRef {
                txid: tx_hash,
                index: vout.n,
                amount,
            },
            receiver,
            covenant_address: self.current_covenant_address,
        })
    }

    /// Finds the first input spending an outpoint recorded in the
    /// covenant UTXO set.
    fn find_tracked_spend(&self, tx: &TxInfo) -> Option<(Hash256, u32)> {
        for vin in &tx.vin {
            let (Some(txid), Some(vout)) = (vin.txid.as_deref(), vin.vout) else {
                continue;
            };
            let Ok(txid) = Hash256::from_hex(txid) else {
                continue;
            };
            if self.utxo_set.get(&txid) == Some(&vout) {
                return Some((txid, vout));
            }
        }
        None
    }
}

/// Extracts the side-chain receiver from an OP_RETURN script, if the
/// payload is one of the accepted encodings:
///
/// - ASCII hex of an address string, `"<40-hex>"` or `"0x<40-hex>"`;
/// - the `sBCHAddr` identifier followed by the raw 20-byte address.
pub fn find_receiver_in_op_return(asm: &str) -> Option<Address20> {
    let payload = hex::decode(asm.strip_prefix(OP_RETURN_PREFIX)?).ok()?;

    if payload.len() == RECEIVER_IDENTIFIER.len() + Address20::LEN
        && payload.starts_with(RECEIVER_IDENTIFIER)
    {
        return Address20::from_slice(&payload[RECEIVER_IDENTIFIER.len()..]).ok();
    }

    let s = std::str::from_utf8(&payload).ok()?;
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() != 2 * Address20::LEN {
        return None;
    }
    Address20::from_hex(s).ok()
}

/// Receiver discovery: OP_RETURN markers take precedence, then the
/// input-derived fallback over P2PKH-shaped unlock scripts.
fn find_receiver(tx: &TxInfo) -> Option<Address20> {
    for vout in &tx.vout {
        if let Some(receiver) = find_receiver_in_op_return(&vout.script_pub_key.asm) {
            return Some(receiver);
        }
    }
    tx.vin.iter().find_map(receiver_from_p2pkh_input)
}

/// Accepts an input whose scriptSig hex is the exact 25-byte P2PKH
/// lock-script form `76a914<20-byte-hash>..` with the trailing marker
/// bytes `0x88`, `0xa9`; the embedded hash is the receiver.
fn receiver_from_p2pkh_input(vin: &Vin) -> Option<Address20> {
    let bytes = hex::decode(&vin.script_sig.as_ref()?.hex).ok()?;
    if bytes.len() != 25 || bytes[..3] != [0x76, 0xa9, 0x14] {
        return None;
    }
    if bytes[23] != 0x88 || bytes[24] != 0xa9 {
        return None;
    }
    Address20::from_slice(&bytes[3..23]).ok()
}

fn has_burn_output(tx: &TxInfo) -> bool {
    tx.vout
        .iter()
        .any(|v| v.script_pub_key.hex == BURN_SCRIPT_HEX)
}

fn p2sh_asm(addr: &Address20) -> String {
    format!("OP_HASH160 {addr} OP_EQUAL")
}

/// Converts a node-reported BCH float amount to satoshis, truncating.
/// Negative amounts are rejected.
fn sat_amount(value: f64) -> Option<Satoshi> {
    let sat = (value * 1e8) as i64;
    (sat >= 0).then_some(sat as Satoshi)
}

fn tx_hash(tx: &TxInfo) -> Option<Hash256> {
    let s = if tx.hash.is_empty() { &tx.txid } else { &tx.hash };
    Hash256::from_hex(s).ok()
}

#[cfg(test)]
mod tests {
    use bchwatch_primitives::{BlockInfo, ScriptPubKey, ScriptSig, Vout};

    use super::*;

    // https://www.blockchain.com/bch-testnet/block/1508978
    const TESTNET_BLOCK_1508978: &str = r#"
 {
    "hash": "00000000000000c8d02f76b19ee228ff14eefc1fd00ff85d9837c023da232503",
    "confirmations": 6911,
    "size": 484,
    "height": 1508978,
    "version": 549453824,
    "versionHex": "20c00000",
    "merkleroot": "90ccadacbfd7d90107e31acb21d43c7ec4e2d5fd80472a527698dc79901a9e96",
    "tx": [
      {
        "hash": "80de78e76bc26b901d9d1156b3f0369f350170117ea005421dd8723a2dd46333",
        "txid": "80de78e76bc26b901d9d1156b3f0369f350170117ea005421dd8723a2dd46333",
        "version": 1,
        "locktime": 0,
        "vin": [
          {
            "coinbase": "03720617",
            "sequence": 4294967295
          }
        ],
        "vout": [
          {
            "value": 0.37114125,
            "n": 0,
            "scriptPubKey": {
              "asm": "OP_DUP OP_HASH160 f60e91e018a0f963a21129aa7427357b1653d172 OP_EQUALVERIFY OP_CHECKSIG",
              "hex": "76a914f60e91e018a0f963a21129aa7427357b1653d17288ac",
              "type": "pubkeyhash"
            }
          },
          {
            "value": 0,
            "n": 1,
            "scriptPubKey": {
              "asm": "OP_RETURN 8ab89e331cb2e163133de3c1c4a016f8655cac4ca1fb363a9a823cb741e243f89c0b000025000000",
              "hex": "6a288ab89e331cb2e163133de3c1c4a016f8655cac4ca1fb363a9a823cb741e243f89c0b000025000000",
              "type": "nulldata"
            }
          }
        ],
        "time": 1657866426,
        "blocktime": 1657866426
      },
      {
        "hash": "7ff88192c5a5ee27237880230b4a9fc0c7e97d7dfe979831b23cd104d46160ee",
        "txid": "7ff88192c5a5ee27237880230b4a9fc0c7e97d7dfe979831b23cd104d46160ee",
        "version": 2,
        "locktime": 0,
        "vin": [
          {
            "txid": "84afb6667a7094cad6283fb9303a76b26ae846ec0c3f8370433dee5f75d3b1c3",
            "vout": 0,
            "scriptSig": {
              "asm": "3045022100ac5165cccc65fc104523bee1979c498116f5becdd06614808b41a2f4222ad13b022016d107fe4784a772d7d293281592af59d72fe3c5fe7c6a349b736c107c3b520341 02d27c31afad03f4a300868165b5aff09babe6bb3fdc14048ecb3e1de1457c4b3e",
              "hex": "483045022100ac5165cccc65fc104523bee1979c498116f5becdd06614808b41a2f4222ad13b022016d107fe4784a772d7d293281592af59d72fe3c5fe7c6a349b736c107c3b5203412102d27c31afad03f4a300868165b5aff09babe6bb3fdc14048ecb3e1de1457c4b3e"
            },
            "sequence": 4294967295
          }
        ],
        "vout": [
          {
            "value": 0.0001,
            "n": 0,
            "scriptPubKey": {
              "asm": "OP_HASH160 ccf8fb324aebbc9f53a7fb28138a3d703b9e60d0 OP_EQUAL",
              "hex": "a914ccf8fb324aebbc9f53a7fb28138a3d703b9e60d087",
              "type": "scripthash"
            }
          },
          {
            "value": 0.00085,
            "n": 1,
            "scriptPubKey": {
              "asm": "OP_DUP OP_HASH160 68ccb0e4918444bddb05dccb313d8c979e8e25f2 OP_EQUALVERIFY OP_CHECKSIG",
              "hex": "76a91468ccb0e4918444bddb05dccb313d8c979e8e25f288ac",
              "type": "pubkeyhash"
            }
          },
          {
            "value": 0,
            "n": 2,
            "scriptPubKey": {
              "asm": "OP_RETURN 7342434841646472c370743331b37d3c6d0ee798b3918f6561af2c92",
              "hex": "6a1c7342434841646472c370743331b37d3c6d0ee798b3918f6561af2c92",
              "type": "nulldata"
            }
          }
        ],
        "time": 1657866426,
        "blocktime": 1657866426
      }
    ],
    "time": 1657866426,
    "nonce": 1741380489,
    "bits": "1a05c74e",
    "difficulty": 2903324.64724242,
    "previousblockhash": "0000000000000123229171002dc6d67dd34fc6241166624334e343201e480251"
  }
"#;

    fn addr(s: &str) -> Address20 {
        Address20::from_hex(s).unwrap()
    }

    fn hash(s: &str) -> Hash256 {
        Hash256::from_hex(s).unwrap()
    }

    fn p2sh_vout(n: u32, value: f64, covenant: &Address20) -> Vout {
        Vout {
            value,
            n,
            script_pub_key: ScriptPubKey {
                asm: format!("OP_HASH160 {covenant} OP_EQUAL"),
                hex: String::new(),
            },
        }
    }

    fn p2pkh_vout(n: u32, value: f64) -> Vout {
        Vout {
            value,
            n,
            script_pub_key: ScriptPubKey {
                asm: "OP_DUP OP_HASH160 68ccb0e4918444bddb05dccb313d8c979e8e25f2 OP_EQUALVERIFY OP_CHECKSIG".to_owned(),
                hex: "76a91468ccb0e4918444bddb05dccb313d8c979e8e25f288ac".to_owned(),
            },
        }
    }

    fn op_return_vout(n: u32, payload_hex: &str) -> Vout {
        Vout {
            value: 0.0,
            n,
            script_pub_key: ScriptPubKey {
                asm: format!("OP_RETURN {payload_hex}"),
                hex: String::new(),
            },
        }
    }

    fn spend_vin(txid: &str, vout: u32) -> Vin {
        Vin {
            coinbase: None,
            txid: Some(txid.to_owned()),
            vout: Some(vout),
            script_sig: Some(ScriptSig::default()),
        }
    }

    fn tx(txid: &str, vin: Vec<Vin>, vout: Vec<Vout>) -> TxInfo {
        TxInfo {
            txid: txid.to_owned(),
            hash: txid.to_owned(),
            vin,
            vout,
        }
    }

    #[test]
    fn new_utxo_from_testnet_block() {
        let bi: BlockInfo = serde_json::from_str(TESTNET_BLOCK_1508978).unwrap();
        let parser = CcTxParser::new(addr("ccf8fb324aebbc9f53a7fb28138a3d703b9e60d0"));

        let infos = parser.parse_block_txs(&bi.tx);
        assert_eq!(infos.len(), 1);
        let info = &infos[0];
        assert_eq!(info.kind, CcTransferKind::New);
        assert_eq!(info.prev_utxo, UtxoRef::default());
        assert_eq!(
            info.utxo.txid,
            hash("7ff88192c5a5ee27237880230b4a9fc0c7e97d7dfe979831b23cd104d46160ee")
        );
        assert_eq!(info.utxo.index, 0);
        assert_eq!(info.utxo.amount, 10_000);
        assert_eq!(
            info.receiver,
            addr("c370743331b37d3c6d0ee798b3918f6561af2c92")
        );
        assert_eq!(
            info.covenant_address,
            addr("ccf8fb324aebbc9f53a7fb28138a3d703b9e60d0")
        );
    }

    #[test]
    fn op_return_receiver_accepts_ascii_hex_forms() {
        let a = "c370743331b37d3c6d0ee798b3918f6561af2c92";
        let bare = hex::encode(a.as_bytes());
        let prefixed = hex::encode(format!("0x{a}").as_bytes());
        assert_eq!(
            find_receiver_in_op_return(&format!("OP_RETURN {bare}")),
            Some(addr(a))
        );
        assert_eq!(
            find_receiver_in_op_return(&format!("OP_RETURN {prefixed}")),
            Some(addr(a))
        );
        // Tagged raw-address form.
        assert_eq!(
            find_receiver_in_op_return(&format!(
                "OP_RETURN {}{a}",
                hex::encode(RECEIVER_IDENTIFIER)
            )),
            Some(addr(a))
        );
        assert_eq!(find_receiver_in_op_return("OP_RETURN 8ab89e33"), None);
        assert_eq!(find_receiver_in_op_return("OP_DUP OP_HASH160"), None);
    }

    #[test]
    fn new_utxo_receiver_falls_back_to_p2pkh_input() {
        let covenant = addr("6ad3f81523c87aa17f1dfa08271cf57b6277c98e");
        let receiver = "c370743331b37d3c6d0ee798b3918f6561af2c92";
        let mut vin = spend_vin(&"11".repeat(32), 0);
        vin.script_sig = Some(ScriptSig {
            asm: String::new(),
            hex: format!("76a914{receiver}88a9"),
        });
        let t = tx(
            &"22".repeat(32),
            vec![vin],
            vec![p2sh_vout(0, 0.5, &covenant), p2pkh_vout(1, 0.1)],
        );

        let parser = CcTxParser::new(covenant);
        let info = parser.parse_tx(&t).unwrap();
        assert_eq!(info.kind, CcTransferKind::New);
        assert_eq!(info.receiver, addr(receiver));
        assert_eq!(info.utxo.amount, 50_000_000);
    }

    #[test]
    fn new_utxo_without_receiver_is_ignored() {
        let covenant = addr("6ad3f81523c87aa17f1dfa08271cf57b6277c98e");
        let t = tx(
            &"22".repeat(32),
            vec![spend_vin(&"11".repeat(32), 0)],
            vec![p2sh_vout(0, 0.5, &covenant)],
        );
        assert!(CcTxParser::new(covenant).parse_tx(&t).is_none());
    }

    #[test]
    fn redeem_spends_tracked_outpoint() {
        let covenant = addr("6ad3f81523c87aa17f1dfa08271cf57b6277c98e");
        let spent = "4794c4a56bc0b2e2544159b017e90ee64a8544cdaf1a9828d4412e783c5bda53";
        let mut parser = CcTxParser::new(covenant);
        parser.refresh(None, covenant, UtxoSet::from([(hash(spent), 0u32)]));

        let t = tx(
            &"33".repeat(32),
            vec![spend_vin(spent, 0)],
            vec![p2pkh_vout(0, 0.2)],
        );
        let info = parser.parse_tx(&t).unwrap();
        assert_eq!(info.kind, CcTransferKind::Redeem);
        assert_eq!(info.prev_utxo, UtxoRef { txid: hash(spent), index: 0, amount: 0 });
        assert_eq!(info.utxo, UtxoRef::default());
        assert!(info.receiver.is_zero());
        assert!(info.covenant_address.is_zero());
    }

    #[test]
    fn redeem_needs_matching_outpoint_index() {
        let covenant = addr("6ad3f81523c87aa17f1dfa08271cf57b6277c98e");
        let spent = "4794c4a56bc0b2e2544159b017e90ee64a8544cdaf1a9828d4412e783c5bda53";
        let mut parser = CcTxParser::new(covenant);
        parser.refresh(None, covenant, UtxoSet::from([(hash(spent), 1u32)]));

        let t = tx(
            &"33".repeat(32),
            vec![spend_vin(spent, 0)],
            vec![p2pkh_vout(0, 0.2)],
        );
        assert!(parser.parse_tx(&t).is_none());
    }

    #[test]
    fn redeem_suppressed_when_prev_covenant_paid() {
        let current = addr("ae2c75b69475fe48a15f1a838b5238f4cc54bd58");
        let prev = addr("6ad3f81523c87aa17f1dfa08271cf57b6277c98e");
        let spent = "4794c4a56bc0b2e2544159b017e90ee64a8544cdaf1a9828d4412e783c5bda53";
        let mut parser = CcTxParser::new(current);
        parser.refresh(Some(prev), current, UtxoSet::from([(hash(spent), 0u32)]));

        let t = tx(
            &"33".repeat(32),
            vec![spend_vin(spent, 0)],
            vec![p2sh_vout(0, 0.2, &prev)],
        );
        assert!(parser.parse_tx(&t).is_none());
    }

    #[test]
    fn convert_relocks_under_current_covenant() {
        let current = addr("ae2c75b69475fe48a15f1a838b5238f4cc54bd58");
        let spent = "ba9f3cd9c4bb1d2c4eb95da7a491a809ca4a57fbeb847eff4e2d4ba82300191b";
        let txid = "7106656d2d1c0a87dd3551f0f7e651e705b56b070a4fe1e0a2e8a07a6e09e99c";
        let mut parser = CcTxParser::new(current);
        parser.refresh(None, current, UtxoSet::from([(hash(spent), 0u32)]));

        let t = tx(txid, vec![spend_vin(spent, 0)], vec![p2sh_vout(0, 0.8, &current)]);
        let info = parser.parse_tx(&t).unwrap();
        assert_eq!(info.kind, CcTransferKind::Convert);
        assert_eq!(info.prev_utxo, UtxoRef { txid: hash(spent), index: 0, amount: 0 });
        assert_eq!(info.utxo, UtxoRef { txid: hash(txid), index: 0, amount: 80_000_000 });
        assert_eq!(info.covenant_address, current);
        assert!(info.receiver.is_zero());
    }

    #[test]
    fn convert_wins_over_new() {
        // Spends a tracked outpoint *and* creates a covenant output
        // with a receiver marker; the tracked spend dominates.
        let current = addr("ae2c75b69475fe48a15f1a838b5238f4cc54bd58");
        let spent = "ba9f3cd9c4bb1d2c4eb95da7a491a809ca4a57fbeb847eff4e2d4ba82300191b";
        let receiver_hex = hex::encode("0xc370743331b37d3c6d0ee798b3918f6561af2c92".as_bytes());
        let mut parser = CcTxParser::new(current);
        parser.refresh(None, current, UtxoSet::from([(hash(spent), 0u32)]));

        let t = tx(
            &"44".repeat(32),
            vec![spend_vin(spent, 0)],
            vec![p2sh_vout(0, 0.8, &current), op_return_vout(1, &receiver_hex)],
        );
        let info = parser.parse_tx(&t).unwrap();
        assert_eq!(info.kind, CcTransferKind::Convert);
    }

    #[test]
    fn burn_output_counts_as_redeem() {
        let current = addr("ae2c75b69475fe48a15f1a838b5238f4cc54bd58");
        let spent = "ba9f3cd9c4bb1d2c4eb95da7a491a809ca4a57fbeb847eff4e2d4ba82300191b";
        let mut parser = CcTxParser::new(current);
        parser.refresh(None, current, UtxoSet::from([(hash(spent), 0u32)]));

        let mut burn = p2pkh_vout(0, 0.2);
        burn.script_pub_key.hex = BURN_SCRIPT_HEX.to_owned();
        let t = tx(&"55".repeat(32), vec![spend_vin(spent, 0)], vec![burn]);
        let info = parser.parse_tx(&t).unwrap();
        assert_eq!(info.kind, CcTransferKind::Redeem);
    }

    #[test]
    fn unrelated_tx_is_ignored() {
        let parser = CcTxParser::new(addr("ae2c75b69475fe48a15f1a838b5238f4cc54bd58"));
        let t = tx(
            &"66".repeat(32),
            vec![spend_vin(&"11".repeat(32), 0)],
            vec![p2pkh_vout(0, 0.1)],
        );
        assert!(parser.parse_tx(&t).is_none());
    }
}
