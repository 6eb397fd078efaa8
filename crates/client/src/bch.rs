//! BCH full node client: `getblockcount`, `getblockhash`,
//! `getblock` verbosity 2 and `getrawtransaction` over raw JSON-RPC,
//! distilled into the watcher's [`BchBlock`] view.

use async_trait::async_trait;
use bchwatch_primitives::{BchBlock, BlockInfo, CcNomination, Hash256, Nomination, TxInfo};
use bchwatch_txfilter::{extract_monitor_pubkey, extract_validator_pubkey};
use tracing::debug;

use crate::{
    error::ClientResult,
    jsonrpc::{self, HttpTransport, CONTENT_TYPE_BCH},
    traits::ChainSource,
};

/// Client for a BCH full node speaking the bitcoind JSON-RPC dialect
/// (BCHN, BU, BCHD).
#[derive(Clone, Debug)]
pub struct BchClient {
    transport: HttpTransport,
    /// First mainnet height at which monitor nominations count.
    cc_start_height: i64,
}

impl BchClient {
    pub fn new(url: &str, username: &str, password: &str, cc_start_height: i64) -> Self {
        Self {
            transport: HttpTransport::new(url, username, password, CONTENT_TYPE_BCH),
            cc_start_height,
        }
    }

    async fn block_hash_of_height(&self, height: i64) -> ClientResult<String> {
        self.transport.call(jsonrpc::req_block_hash(height)).await
    }

    /// Raw `getblock` result with the BCHD shape normalized.
    pub async fn block_info(&self, hash: &str) -> ClientResult<BlockInfo> {
        let mut info: BlockInfo = self.transport.call(jsonrpc::req_block(hash)).await?;
        adapt_rawtx(&mut info);
        Ok(info)
    }

    pub async fn block_info_by_height(&self, height: i64) -> ClientResult<BlockInfo> {
        let hash = self.block_hash_of_height(height).await?;
        self.block_info(&hash).await
    }
}

#[async_trait]
impl ChainSource for BchClient {
    async fn latest_height(&self) -> ClientResult<i64> {
        self.transport
            .call(jsonrpc::REQ_BLOCK_COUNT.to_owned())
            .await
    }

    async fn block_by_height(&self, height: i64) -> ClientResult<BchBlock> {
        let info = self.block_info_by_height(height).await?;
        to_bch_block(info, self.cc_start_height)
    }

    async fn block_by_hash(&self, hash: &Hash256) -> ClientResult<BchBlock> {
        let info = self.block_info(&hash.to_string()).await?;
        to_bch_block(info, self.cc_start_height)
    }

    async fn tx_by_id(&self, txid: &str, blockhash: &str) -> ClientResult<TxInfo> {
        self.transport
            .call(jsonrpc::req_raw_tx(txid, blockhash))
            .await
    }
}

/// BCHD inlines transactions under `rawtx` and omits per-tx `hash`;
/// normalize to the bitcoind shape.
pub(crate) fn adapt_rawtx(info: &mut BlockInfo) {
    if info.tx.is_empty() && !info.rawtx.is_empty() {
        info.tx = std::mem::take(&mut info.rawtx);
        for tx in &mut info.tx {
            tx.hash = tx.txid.clone();
        }
    }
}

/// Distills a `getblock` result: decode identity hashes and pull the
/// coinbase nominations. Monitor nominations only count from the
/// cross-chain activation height on; genesis never nominates.
pub(crate) fn to_bch_block(info: BlockInfo, cc_start_height: i64) -> ClientResult<BchBlock> {
    let hash = Hash256::from_hex(&info.hash)?;
    let parent = if info.previousblockhash.is_empty() {
        Hash256::zero()
    } else {
        Hash256::from_hex(&info.previousblockhash)?
    };

    let mut block = BchBlock {
        height: info.height,
        timestamp: info.time,
        hash,
        parent,
        validator_nominations: Vec::new(),
        cc_nominations: Vec::new(),
        txs: Vec::new(),
    };
    if info.height > 0 {
        if let Some(coinbase) = info.tx.first() {
            if let Some(pubkey) = extract_validator_pubkey(coinbase) {
                block.validator_nominations.push(Nomination {
                    pubkey,
                    nominated_count: 1,
                });
            }
            if info.height >= cc_start_height {
                if let Some(pubkey) = extract_monitor_pubkey(coinbase) {
                    debug!(%pubkey, "found monitor nomination");
                    block.cc_nominations.push(CcNomination {
                        pubkey,
                        nominated_count: 1,
                    });
                }
            }
        }
    }
    block.txs = info.tx;
    Ok(block)
}
