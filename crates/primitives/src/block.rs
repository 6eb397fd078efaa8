//! Block and transaction structures: the JSON shapes returned by a BCH
//! full node's `getblock` (verbosity 2) and `getrawtransaction`, plus
//! the distilled [`BchBlock`] the watcher keeps around.

use serde::{Deserialize, Serialize};

use crate::{
    buf::Hash256,
    cc::CcNomination,
    staking::Nomination,
};

/// A transaction input's unlock script.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScriptSig {
    #[serde(default)]
    pub asm: String,
    #[serde(default)]
    pub hex: String,
}

/// A transaction output's lock script.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScriptPubKey {
    #[serde(default)]
    pub asm: String,
    #[serde(default)]
    pub hex: String,
}

/// Transaction input as inlined by `getblock` verbosity 2. Coinbase
/// inputs carry `coinbase` instead of an outpoint.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Vin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinbase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vout: Option<u32>,
    #[serde(default, rename = "scriptSig", skip_serializing_if = "Option::is_none")]
    pub script_sig: Option<ScriptSig>,
}

impl Vin {
    pub fn is_coinbase(&self) -> bool {
        self.coinbase.is_some()
    }
}

/// Transaction output. The node reports `value` in BCH as a float.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Vout {
    #[serde(default)]
    pub value: f64,
    pub n: u32,
    #[serde(default, rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

/// A transaction with its inputs and outputs inlined.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TxInfo {
    pub txid: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub vin: Vec<Vin>,
    #[serde(default)]
    pub vout: Vec<Vout>,
}

impl TxInfo {
    pub fn is_coinbase(&self) -> bool {
        self.vin.first().is_some_and(Vin::is_coinbase)
    }
}

/// `getblock` verbosity 2 result. Some node implementations return the
/// inlined transactions under `rawtx` instead of `tx`; the client
/// normalizes that before handing the block onward.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BlockInfo {
    pub hash: String,
    pub height: i64,
    pub time: i64,
    #[serde(default)]
    pub tx: Vec<TxInfo>,
    #[serde(default)]
    pub rawtx: Vec<TxInfo>,
    #[serde(default)]
    pub previousblockhash: String,
}

/// The watcher's view of one BCH block: identity, parent link, the
/// nominations mined into its coinbase, and the full transaction list
/// (retained only while cross-chain parsing may still need it).
#[derive(Clone, Debug, Default)]
pub struct BchBlock {
    pub height: i64,
    pub timestamp: i64,
    pub hash: Hash256,
    pub parent: Hash256,
    pub validator_nominations: Vec<Nomination>,
    pub cc_nominations: Vec<CcNomination>,
    pub txs: Vec<TxInfo>,
}
