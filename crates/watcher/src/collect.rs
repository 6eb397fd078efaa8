//! Demand-driven cross-chain collection. The executor asks for the
//! transfers in a height range `(begin, end]` against a covenant
//! rotation; the collector waits for finality, re-fetches the blocks
//! and rebuilds the executor's transfer list under its lock.

use std::{fmt, sync::Arc};

use bchwatch_client::{fetch_blocks_parallel, ChainSource};
use bchwatch_config::WatcherConfig;
use bchwatch_primitives::{Address20, CcTransferInfo, UtxoSet};
use bchwatch_txfilter::CcTxParser;
use tokio::{
    sync::{mpsc, Mutex, MutexGuard},
    time::{sleep, Duration},
};
use tracing::{debug, info};

use crate::{error::WatcherResult, status::StatusChannel};

/// Fetch width for collection rounds.
pub const COLLECT_PARALLEL: i64 = 10;

/// Pause before re-checking when cross-chain is not active yet.
const CC_GATE_DELAY: Duration = Duration::from_secs(5);

/// Pause between tip polls while waiting for the range to finalize.
const TIP_POLL_DELAY: Duration = Duration::from_secs(30);

/// One collection demand from the cross-chain executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectRequest {
    /// Exclusive lower bound of the height range.
    pub begin_height: i64,
    /// Inclusive upper bound.
    pub end_height: i64,
    pub prev_covenant: Option<Address20>,
    pub current_covenant: Address20,
}

/// The executor-owned state the collector rewrites: the transfer list
/// and the covenant outpoint set the parser classifies against.
#[derive(Debug, Default)]
pub struct CcExecutorState {
    pub infos: Vec<CcTransferInfo>,
    pub utxo_set: UtxoSet,
}

/// Mutex-guarded handle shared between the side-chain executor and the
/// collection task.
#[derive(Debug, Default)]
pub struct CcExecutor {
    state: Mutex<CcExecutorState>,
}

impl CcExecutor {
    pub fn new(utxo_set: UtxoSet) -> Self {
        Self {
            state: Mutex::new(CcExecutorState {
                infos: Vec::new(),
                utxo_set,
            }),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, CcExecutorState> {
        self.state.lock().await
    }
}

/// The collection loop. Reads demands off a channel and serves them
/// one at a time; it shares nothing with the controller beyond the
/// status snapshot and the chain source.
pub struct CcCollector {
    config: Arc<WatcherConfig>,
    chain: Arc<dyn ChainSource>,
    executor: Arc<CcExecutor>,
    status: StatusChannel,
    requests: mpsc::Receiver<CollectRequest>,
    parser: CcTxParser,
    last_end_height: i64,
}

impl fmt::Debug for CcCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CcCollector")
            .field("last_end_height", &self.last_end_height)
            .finish_non_exhaustive()
    }
}

impl CcCollector {
    pub fn new(
        config: Arc<WatcherConfig>,
        chain: Arc<dyn ChainSource>,
        executor: Arc<CcExecutor>,
        status: StatusChannel,
        requests: mpsc::Receiver<CollectRequest>,
    ) -> Self {
        Self {
            config,
            chain,
            executor,
            status,
            requests,
            parser: CcTxParser::default(),
            last_end_height: 0,
        }
    }

    /// Serves demands until the request channel closes.
    pub async fn run(mut self) -> anyhow::Result<()> {
        while let Some(request) = self.requests.recv().await {
            self.handle(request).await?;
        }
        Ok(())
    }

    async fn handle(&mut self, request: CollectRequest) -> WatcherResult<()> {
        if self.status.get().latest_finalized_height < self.config.start_mainnet_height_for_cc {
            debug!("cross-chain not active yet, skipping collect request");
            sleep(CC_GATE_DELAY).await;
            return Ok(());
        }
        if request.end_height == self.last_end_height {
            debug!(end_height = request.end_height, "duplicate collect request");
            return Ok(());
        }

        loop {
            let tip = self.chain.latest_height_retry().await;
            if tip >= request.end_height + self.config.block_finalize_depth {
                break;
            }
            debug!(
                %tip,
                end_height = request.end_height,
                "waiting for collection range to finalize"
            );
            sleep(TIP_POLL_DELAY).await;
        }

        let mut state = self.executor.lock().await;
        state.infos.clear();
        let blocks = fetch_blocks_parallel(
            &self.chain,
            request.begin_height + 1,
            request.end_height,
            COLLECT_PARALLEL,
        )
        .await?;
        self.parser.refresh(
            request.prev_covenant,
            request.current_covenant,
            state.utxo_set.clone(),
        );
        for block in &blocks {
            state.infos.extend(self.parser.parse_block_txs(&block.txs));
        }
        info!(
            begin_height = request.begin_height,
            end_height = request.end_height,
            transfers = state.infos.len(),
            "collected cross-chain transfers"
        );
        self.last_end_height = request.end_height;
        Ok(())
    }
}
