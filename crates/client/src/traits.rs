//! Capability traits for the two upstream nodes. The watcher only ever
//! talks to these, so tests can substitute mocks and the prefetcher
//! composes over any implementation.

use std::time::Duration;

use async_trait::async_trait;
use bchwatch_primitives::{BchBlock, Hash256, TxInfo, VoteInfo};
use tracing::warn;

use crate::error::ClientResult;

/// Fixed backoff between attempts on retrying call sites.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(10);

/// Read access to the canonical BCH chain view. Calls may be issued
/// concurrently from multiple worker tasks. Ordering across calls is
/// not guaranteed; callers handle reorgs by staying below the finality
/// depth.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Current tip height of the node's best chain.
    async fn latest_height(&self) -> ClientResult<i64>;

    /// Fetches a block with inlined transactions, nominations already
    /// extracted from its coinbase.
    async fn block_by_height(&self, height: i64) -> ClientResult<BchBlock>;

    async fn block_by_hash(&self, hash: &Hash256) -> ClientResult<BchBlock>;

    async fn tx_by_id(&self, txid: &str, blockhash: &str) -> ClientResult<TxInfo>;

    /// Like [`latest_height`](Self::latest_height) but loops with a
    /// fixed backoff until the node answers.
    async fn latest_height_retry(&self) -> i64 {
        loop {
            match self.latest_height().await {
                Ok(height) => return height,
                Err(err) => {
                    warn!(%err, "failed to poll tip height, retrying");
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
            }
        }
    }

    /// Like [`block_by_height`](Self::block_by_height) but loops with
    /// a fixed backoff until the node answers.
    async fn block_by_height_retry(&self, height: i64) -> BchBlock {
        loop {
            match self.block_by_height(height).await {
                Ok(block) => return block,
                Err(err) => {
                    warn!(%height, %err, "failed to fetch block, retrying");
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
            }
        }
    }
}

/// Side-chain peer serving already-computed vote infos, consulted only
/// during the startup fast-forward.
#[async_trait]
pub trait SpeedupSource: Send + Sync {
    /// Vote infos for epoch numbers in `[start, end)`. An empty vector
    /// means the peer has nothing past `start`.
    async fn vote_infos(&self, start: u64, end: u64) -> ClientResult<Vec<VoteInfo>>;

    /// Retrying variant of [`vote_infos`](Self::vote_infos).
    async fn vote_infos_retry(&self, start: u64, end: u64) -> Vec<VoteInfo> {
        loop {
            match self.vote_infos(start, end).await {
                Ok(infos) => return infos,
                Err(err) => {
                    warn!(%start, %end, %err, "failed to fetch vote infos, retrying");
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
            }
        }
    }
}
