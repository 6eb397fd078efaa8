//! JSON-RPC clients for the BCH full node and the side-chain peer,
//! plus the bounded parallel block prefetcher used by the watcher.

pub mod bch;
pub mod error;
pub mod jsonrpc;
pub mod parallel;
pub mod sbch;
pub mod traits;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use bch::BchClient;
pub use error::{ClientError, ClientResult};
pub use jsonrpc::HttpTransport;
pub use parallel::fetch_blocks_parallel;
pub use sbch::SbchClient;
pub use traits::{ChainSource, SpeedupSource, RETRY_BACKOFF};
