//! Bounded parallel block prefetch: a shared atomic index over a
//! contiguous height range, N worker tasks, results merged back in
//! height order.

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use bchwatch_primitives::BchBlock;
use tracing::debug;

use crate::{error::ClientResult, traits::ChainSource};

/// Fetches the inclusive height range `[start, end]` with up to
/// `width` concurrent workers. The returned vector covers the range
/// gapless in ascending height order. Workers retry transient node
/// failures with the fixed backoff, so the only error here is a worker
/// task failing to join.
pub async fn fetch_blocks_parallel<C>(
    client: &Arc<C>,
    start: i64,
    end: i64,
    width: i64,
) -> ClientResult<Vec<BchBlock>>
where
    C: ChainSource + ?Sized + 'static,
{
    let count = end - start + 1;
    if count <= 0 {
        return Ok(Vec::new());
    }
    debug!(%start, %end, "prefetching blocks");

    let width = width.clamp(1, count) as usize;
    let next = Arc::new(AtomicI64::new(0));
    let mut workers = Vec::with_capacity(width);
    for _ in 0..width {
        let client = Arc::clone(client);
        let next = Arc::clone(&next);
        workers.push(tokio::spawn(async move {
            let mut fetched = Vec::new();
            loop {
                let idx = next.fetch_add(1, Ordering::SeqCst);
                if idx >= count {
                    break;
                }
                let block = client.block_by_height_retry(start + idx).await;
                fetched.push((idx, block));
            }
            fetched
        }));
    }

    // Every index in 0..count is claimed by exactly one worker, so
    // once all workers joined, every slot is filled.
    let mut slots: Vec<Option<BchBlock>> = (0..count).map(|_| None).collect();
    for worker in workers {
        for (idx, block) in worker.await? {
            slots[idx as usize] = Some(block);
        }
    }
    Ok(slots.into_iter().flatten().collect())
}
