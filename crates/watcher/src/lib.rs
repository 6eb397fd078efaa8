//! The BCH mainnet watcher: finality buffer, epoch aggregation and
//! cross-chain transfer collection, feeding the side-chain's staking
//! and bridge machinery.

pub mod collect;
pub mod controller;
pub mod error;
pub mod state;
pub mod status;

pub use collect::{CcCollector, CcExecutor, CcExecutorState, CollectRequest, COLLECT_PARALLEL};
pub use controller::{Watcher, WatcherHandles, EPOCH_CHANNEL_SIZE, MONITOR_CHANNEL_SIZE};
pub use error::{WatcherError, WatcherResult};
pub use state::{WatcherState, MONITOR_INFO_CLEAN_THRESHOLD};
pub use status::{StatusChannel, WatcherStatus};
