//! Side-chain JSON-RPC client, used only for the startup speedup
//! fast-forward.

use async_trait::async_trait;
use bchwatch_primitives::VoteInfo;

use crate::{
    error::ClientResult,
    jsonrpc::{self, HttpTransport, CONTENT_TYPE_SBCH},
    traits::SpeedupSource,
};

/// Client for a trusted side-chain peer's `sbch_*` namespace.
#[derive(Clone, Debug)]
pub struct SbchClient {
    transport: HttpTransport,
}

impl SbchClient {
    pub fn new(url: &str, username: &str, password: &str) -> Self {
        Self {
            transport: HttpTransport::new(url, username, password, CONTENT_TYPE_SBCH),
        }
    }
}

#[async_trait]
impl SpeedupSource for SbchClient {
    async fn vote_infos(&self, start: u64, end: u64) -> ClientResult<Vec<VoteInfo>> {
        self.transport
            .call(jsonrpc::req_vote_infos(start, end))
            .await
    }
}
