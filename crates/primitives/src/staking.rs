//! Validator epochs and nominations derived from coinbase markers.

use serde::{Deserialize, Serialize};

use crate::{buf::Pubkey32, cc::MonitorVoteInfo};

/// A validator's claim to participate in the next epoch, asserted by a
/// BCH miner via a coinbase OP_RETURN marker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nomination {
    pub pubkey: Pubkey32,
    pub nominated_count: i64,
}

/// A fixed window of consecutive finalized BCH blocks over which
/// validator nominations are aggregated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epoch {
    pub number: i64,
    pub start_height: i64,
    pub end_time: i64,
    #[serde(default)]
    pub nominations: Vec<Nomination>,
}

impl Epoch {
    /// Orders nominations by `nominated_count` descending, breaking
    /// ties by pubkey ascending. Done as an ascending pubkey sort
    /// followed by a stable sort on the count.
    pub fn sort_nominations(&mut self) {
        self.nominations.sort_by(|a, b| a.pubkey.cmp(&b.pubkey));
        self.nominations
            .sort_by(|a, b| b.nominated_count.cmp(&a.nominated_count));
    }
}

/// One epoch paired with the monitor votes observed over the same
/// block window. This is the unit the speedup RPC returns and the unit
/// the watcher retains for local lookups.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteInfo {
    pub epoch: Epoch,
    #[serde(default)]
    pub monitor_vote: MonitorVoteInfo,
}
