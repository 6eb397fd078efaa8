//! The watcher controller: optional speedup fast-forward, catchup
//! detection, then the live loop feeding finalized blocks into the
//! buffer and emitting epochs and monitor votes to the sinks.

use std::{fmt, sync::Arc};

use anyhow::Context;
use bchwatch_client::{fetch_blocks_parallel, ChainSource, SpeedupSource};
use bchwatch_config::WatcherConfig;
use bchwatch_primitives::{BchBlock, Epoch, MonitorVoteInfo, VoteInfo};
use tokio::{
    sync::{mpsc, oneshot},
    time::{sleep, Duration},
};
use tracing::{debug, info};

use crate::{
    error::{WatcherError, WatcherResult},
    state::WatcherState,
    status::{StatusChannel, WatcherStatus},
};

/// Epoch sink capacity; the controller blocks when downstream lags
/// this far behind.
pub const EPOCH_CHANNEL_SIZE: usize = 10_000;

/// Monitor vote sink capacity.
pub const MONITOR_CHANNEL_SIZE: usize = 5_000;

/// Epochs requested per speedup round trip.
const SPEEDUP_BATCH: u64 = 100;

/// Receiving ends handed to the host when a watcher is built.
#[derive(Debug)]
pub struct WatcherHandles {
    pub epochs: mpsc::Receiver<Epoch>,
    pub monitor_votes: mpsc::Receiver<MonitorVoteInfo>,
    pub status: StatusChannel,
}

/// Drives the whole pipeline. Single-threaded with respect to the
/// buffer; only the prefetcher fans out.
pub struct Watcher {
    config: Arc<WatcherConfig>,
    chain: Arc<dyn ChainSource>,
    speedup_source: Option<Arc<dyn SpeedupSource>>,
    state: WatcherState,
    epoch_tx: mpsc::Sender<Epoch>,
    monitor_tx: mpsc::Sender<MonitorVoteInfo>,
    status: StatusChannel,
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher").field("state", &self.state).finish_non_exhaustive()
    }
}

impl Watcher {
    /// Builds a watcher resuming from a checkpoint
    /// `(latest_finalized_height, last_known_epoch_num)`.
    pub fn new(
        config: Arc<WatcherConfig>,
        chain: Arc<dyn ChainSource>,
        speedup_source: Option<Arc<dyn SpeedupSource>>,
        latest_finalized_height: i64,
        last_known_epoch_num: i64,
    ) -> (Self, WatcherHandles) {
        let (epoch_tx, epochs) = mpsc::channel(EPOCH_CHANNEL_SIZE);
        let (monitor_tx, monitor_votes) = mpsc::channel(MONITOR_CHANNEL_SIZE);
        let state = WatcherState::new(
            latest_finalized_height,
            last_known_epoch_num,
            config.num_blocks_in_epoch,
            config.start_mainnet_height_for_cc,
        );
        let status = StatusChannel::new(WatcherStatus {
            latest_finalized_height,
            last_epoch_end_height: latest_finalized_height,
            epochs_emitted: 0,
        });
        let watcher = Self {
            config,
            chain,
            speedup_source,
            state,
            epoch_tx,
            monitor_tx,
            status: status.clone(),
        };
        (
            watcher,
            WatcherHandles {
                epochs,
                monitor_votes,
                status,
            },
        )
    }

    pub fn state(&self) -> &WatcherState {
        &self.state
    }

    /// Boot-time check that the node is reachable and reports a sane
    /// chain.
    pub async fn check_sanity(&self, skip: bool) -> WatcherResult<()> {
        if skip {
            return Ok(());
        }
        let tip = self
            .chain
            .latest_height()
            .await
            .map_err(|err| WatcherError::SanityCheck(format!("tip poll failed: {err}")))?;
        if tip <= 0 {
            return Err(WatcherError::SanityCheck(format!(
                "node reports tip height {tip}"
            )));
        }
        self.chain
            .block_by_height(tip)
            .await
            .map_err(|err| WatcherError::SanityCheck(format!("tip block fetch failed: {err}")))?;
        Ok(())
    }

    /// Main loop. `catchup_tx` is closed exactly once, the first time
    /// the buffer reaches the finality boundary of the node's tip.
    /// Never returns under healthy operation; an `Err` means an
    /// invariant broke or a sink hung up.
    pub async fn run(mut self, catchup_tx: oneshot::Sender<()>) -> anyhow::Result<()> {
        if self.config.speedup {
            self.speedup().await.context("speedup fast-forward")?;
        }
        let mut catchup_tx = Some(catchup_tx);
        loop {
            let tip = self.chain.latest_height_retry().await;
            if tip <= self.state.latest_finalized_height() + self.config.block_finalize_depth {
                if let Some(tx) = catchup_tx.take() {
                    info!(
                        height = self.state.latest_finalized_height(),
                        "caught up with the mainnet tip"
                    );
                    let _ = tx.send(());
                }
            }
            if !self.step(tip).await? {
                sleep(Duration::from_secs(
                    self.config.waiting_block_delay_time.max(0) as u64,
                ))
                .await;
            }
        }
    }

    /// Ingests every block currently past the finality depth, in
    /// bounded prefetch rounds. Returns false when the tip is not far
    /// enough ahead to yield anything.
    async fn step(&mut self, tip: i64) -> WatcherResult<bool> {
        let depth = self.config.block_finalize_depth;
        let mut want = self.state.latest_finalized_height() + 1;
        if tip < want + depth {
            return Ok(false);
        }
        while want + depth <= tip {
            if want + depth + self.config.parallel_num <= tip {
                let end = (tip - depth).min(want + self.config.parallel_num - 1);
                let blocks =
                    fetch_blocks_parallel(&self.chain, want, end, self.config.parallel_num)
                        .await?;
                for block in blocks {
                    self.ingest(block).await?;
                }
            } else {
                let block = self.chain.block_by_height_retry(want).await;
                self.ingest(block).await?;
            }
            want = self.state.latest_finalized_height() + 1;
        }
        Ok(true)
    }

    async fn ingest(&mut self, block: BchBlock) -> WatcherResult<()> {
        debug!(height = block.height, "accepted finalized block");
        if let Some(info) = self.state.add_finalized(block)? {
            info!(
                number = info.epoch.number,
                start_height = info.epoch.start_height,
                nominations = info.epoch.nominations.len(),
                "epoch cut"
            );
            self.emit(info).await?;
        }
        self.publish_status();
        Ok(())
    }

    async fn emit(&self, info: VoteInfo) -> WatcherResult<()> {
        self.epoch_tx
            .send(info.epoch)
            .await
            .map_err(|_| WatcherError::SinkClosed("epoch"))?;
        // A zero start height marks a window before cross-chain
        // activation; nothing to vote on.
        if !self.config.is_amber && info.monitor_vote.start_height > 0 {
            self.monitor_tx
                .send(info.monitor_vote)
                .await
                .map_err(|_| WatcherError::SinkClosed("monitor vote"))?;
        }
        Ok(())
    }

    /// Pulls already-computed vote infos from the side-chain peer in
    /// batches, fast-forwarding the buffer past the covered heights.
    /// Stops when the peer runs dry or when the next window would
    /// reach past the local node's tip; the peer may be ahead of the
    /// node we watch, and the buffer must never be.
    async fn speedup(&mut self) -> WatcherResult<()> {
        let Some(source) = self.speedup_source.clone() else {
            return Ok(());
        };
        let mut start = self.state.next_epoch_number().max(0) as u64;
        loop {
            let tip = self.chain.latest_height_retry().await;
            let room = (tip - self.state.latest_finalized_height())
                / self.config.num_blocks_in_epoch;
            if room <= 0 {
                break;
            }
            let mut infos = source.vote_infos_retry(start, start + SPEEDUP_BATCH).await;
            if infos.is_empty() {
                break;
            }
            infos.truncate(room as usize);
            for info in &infos {
                if !info.epoch.nominations.is_empty() {
                    self.epoch_tx
                        .send(info.epoch.clone())
                        .await
                        .map_err(|_| WatcherError::SinkClosed("epoch"))?;
                }
                if !self.config.is_amber && !info.monitor_vote.nominations.is_empty() {
                    self.monitor_tx
                        .send(info.monitor_vote.clone())
                        .await
                        .map_err(|_| WatcherError::SinkClosed("monitor vote"))?;
                }
            }
            start += infos.len() as u64;
            self.state.fast_forward(&infos);
            self.publish_status();
        }
        info!(
            height = self.state.latest_finalized_height(),
            "speedup fast-forward done"
        );
        Ok(())
    }

    fn publish_status(&self) {
        self.status.update(WatcherStatus {
            latest_finalized_height: self.state.latest_finalized_height(),
            last_epoch_end_height: self.state.last_epoch_end_height(),
            epochs_emitted: self.state.epochs_emitted(),
        });
    }
}
