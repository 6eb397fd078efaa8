use thiserror::Error;

/// Errors raised by the watcher and collection tasks. Invariant
/// violations are fatal; continuing past them would corrupt the epoch
/// stream.
#[derive(Debug, Error)]
pub enum WatcherError {
    /// A block arrived out of order at the finality buffer. Upstream
    /// is expected to be linear below the finality depth.
    #[error("non-contiguous block {got} after finalized height {have}")]
    NonContiguousBlock { have: i64, got: i64 },

    /// A block inside the epoch window is missing from the buffer.
    #[error("finalized block at height {0} missing during aggregation")]
    MissingFinalizedBlock(i64),

    /// Startup sanity check against the node failed.
    #[error("sanity check failed: {0}")]
    SanityCheck(String),

    /// A downstream sink hung up.
    #[error("{0} sink closed")]
    SinkClosed(&'static str),

    #[error(transparent)]
    Client(#[from] bchwatch_client::ClientError),
}

pub type WatcherResult<T> = Result<T, WatcherError>;
