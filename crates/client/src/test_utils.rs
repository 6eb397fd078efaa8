//! In-memory chain and side-chain sources for tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI64, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use bchwatch_primitives::{
    BchBlock, CcNomination, Hash256, Nomination, Pubkey32, Pubkey33, TxInfo, VoteInfo,
};

use crate::{
    error::{ClientError, ClientResult},
    traits::{ChainSource, SpeedupSource},
};

/// Deterministic per-height block hash for mock chains.
pub fn height_hash(height: i64) -> Hash256 {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&height.to_be_bytes());
    Hash256::new(bytes)
}

/// A canned BCH node: a height-indexed block map and a movable tip.
#[derive(Debug, Default)]
pub struct MockChain {
    tip: AtomicI64,
    blocks: Mutex<HashMap<i64, BchBlock>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// A chain of `n` blocks at heights `1..=n`, every coinbase
    /// nominating `validator`.
    pub fn linear(n: i64, validator: Pubkey32) -> Self {
        let chain = Self::new();
        for height in 1..=n {
            chain.insert(mock_block(height, validator));
        }
        chain
    }

    /// Inserts a block, advancing the tip if it extends the chain.
    pub fn insert(&self, block: BchBlock) {
        self.tip.fetch_max(block.height, Ordering::SeqCst);
        self.blocks
            .lock()
            .unwrap()
            .insert(block.height, block);
    }

    pub fn set_tip(&self, height: i64) {
        self.tip.store(height, Ordering::SeqCst);
    }

    pub fn tip(&self) -> i64 {
        self.tip.load(Ordering::SeqCst)
    }
}

/// A block whose coinbase nominates `validator` once.
pub fn mock_block(height: i64, validator: Pubkey32) -> BchBlock {
    BchBlock {
        height,
        timestamp: 1_600_000_000 + height * 600,
        hash: height_hash(height),
        parent: height_hash(height - 1),
        validator_nominations: vec![Nomination {
            pubkey: validator,
            nominated_count: 1,
        }],
        cc_nominations: Vec::new(),
        txs: Vec::new(),
    }
}

/// Adds a monitor nomination to a mock block.
pub fn with_monitor(mut block: BchBlock, monitor: Pubkey33) -> BchBlock {
    block.cc_nominations.push(CcNomination {
        pubkey: monitor,
        nominated_count: 1,
    });
    block
}

#[async_trait]
impl ChainSource for MockChain {
    async fn latest_height(&self) -> ClientResult<i64> {
        Ok(self.tip())
    }

    async fn block_by_height(&self, height: i64) -> ClientResult<BchBlock> {
        self.blocks
            .lock()
            .unwrap()
            .get(&height)
            .cloned()
            .ok_or(ClientError::MissingResult)
    }

    async fn block_by_hash(&self, hash: &Hash256) -> ClientResult<BchBlock> {
        self.blocks
            .lock()
            .unwrap()
            .values()
            .find(|b| b.hash == *hash)
            .cloned()
            .ok_or(ClientError::MissingResult)
    }

    async fn tx_by_id(&self, txid: &str, _blockhash: &str) -> ClientResult<TxInfo> {
        self.blocks
            .lock()
            .unwrap()
            .values()
            .flat_map(|b| b.txs.iter())
            .find(|tx| tx.txid == txid)
            .cloned()
            .ok_or(ClientError::MissingResult)
    }
}

/// A canned side-chain peer returning pre-built vote infos.
#[derive(Debug, Default)]
pub struct MockSpeedup {
    pub infos: Vec<VoteInfo>,
}

impl MockSpeedup {
    pub fn new(infos: Vec<VoteInfo>) -> Self {
        Self { infos }
    }
}

#[async_trait]
impl SpeedupSource for MockSpeedup {
    async fn vote_infos(&self, start: u64, end: u64) -> ClientResult<Vec<VoteInfo>> {
        Ok(self
            .infos
            .iter()
            .filter(|info| {
                let n = info.epoch.number;
                n >= 0 && (n as u64) >= start && (n as u64) < end
            })
            .cloned()
            .collect())
    }
}
