//! Watcher configuration.

use serde::{Deserialize, Serialize};

/// Default number of BCH blocks per validator epoch (one difficulty
/// period on mainnet).
const DEFAULT_NUM_BLOCKS_IN_EPOCH: i64 = 2016;

/// Default confirmations before a block is considered immutable.
const DEFAULT_BLOCK_FINALIZE_DEPTH: i64 = 9;

/// Default seconds to wait before re-polling the tip.
const DEFAULT_WAITING_BLOCK_DELAY_TIME: i64 = 2;

/// Default parallel fetch width.
const DEFAULT_PARALLEL_NUM: i64 = 10;

/// Static configuration for the watcher and its collection sibling.
/// Immutable after construction; both tasks share it read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// BCH full node JSON-RPC endpoint.
    pub mainnet_rpc_url: String,

    /// HTTP basic auth user for the BCH node.
    #[serde(default)]
    pub mainnet_rpc_username: String,

    /// HTTP basic auth password for the BCH node.
    #[serde(default)]
    pub mainnet_rpc_password: String,

    /// Side-chain JSON-RPC endpoint, used only for the startup
    /// speedup fast-forward.
    #[serde(default)]
    pub sbch_rpc_url: String,

    /// Whether to pull already-computed vote infos from the side-chain
    /// peer at startup instead of re-deriving them from BCH blocks.
    #[serde(default)]
    pub speedup: bool,

    #[serde(default = "default_num_blocks_in_epoch")]
    pub num_blocks_in_epoch: i64,

    /// Confirmations required before a block enters the finality
    /// buffer. 9 in production, 1 in tests.
    #[serde(default = "default_block_finalize_depth")]
    pub block_finalize_depth: i64,

    /// Seconds to sleep when the tip is not far enough ahead.
    #[serde(default = "default_waiting_block_delay_time")]
    pub waiting_block_delay_time: i64,

    #[serde(default = "default_parallel_num")]
    pub parallel_num: i64,

    /// First mainnet height at which cross-chain processing applies.
    #[serde(default)]
    pub start_mainnet_height_for_cc: i64,

    /// The amber profile disables monitor-vote emission.
    #[serde(default)]
    pub is_amber: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            mainnet_rpc_url: String::new(),
            mainnet_rpc_username: String::new(),
            mainnet_rpc_password: String::new(),
            sbch_rpc_url: String::new(),
            speedup: false,
            num_blocks_in_epoch: DEFAULT_NUM_BLOCKS_IN_EPOCH,
            block_finalize_depth: DEFAULT_BLOCK_FINALIZE_DEPTH,
            waiting_block_delay_time: DEFAULT_WAITING_BLOCK_DELAY_TIME,
            parallel_num: DEFAULT_PARALLEL_NUM,
            start_mainnet_height_for_cc: 0,
            is_amber: false,
        }
    }
}

fn default_num_blocks_in_epoch() -> i64 {
    DEFAULT_NUM_BLOCKS_IN_EPOCH
}

fn default_block_finalize_depth() -> i64 {
    DEFAULT_BLOCK_FINALIZE_DEPTH
}

fn default_waiting_block_delay_time() -> i64 {
    DEFAULT_WAITING_BLOCK_DELAY_TIME
}

fn default_parallel_num() -> i64 {
    DEFAULT_PARALLEL_NUM
}
