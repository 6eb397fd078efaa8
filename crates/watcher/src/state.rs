//! Finality buffer and epoch aggregation. Single writer (the
//! controller); blocks are appended in strictly ascending, gapless
//! height order and folded into epochs at each window boundary.

use std::collections::HashMap;

use bchwatch_primitives::{BchBlock, CcNomination, Epoch, MonitorVoteInfo, Nomination, VoteInfo};

use crate::error::{WatcherError, WatcherResult};

/// How many recent epochs / vote infos the watcher keeps for local
/// lookups; everything older lives only in the sinks.
pub const MONITOR_INFO_CLEAN_THRESHOLD: usize = 5;

/// State owned by the controller: the buffer of recent finalized
/// blocks plus the bookkeeping needed to cut epoch windows.
#[derive(Debug)]
pub struct WatcherState {
    latest_finalized_height: i64,
    last_epoch_end_height: i64,
    /// Number of the last epoch emitted or known from the checkpoint.
    last_epoch_number: i64,
    epochs_emitted: i64,
    current_timestamp: i64,
    height_to_finalized_block: HashMap<i64, BchBlock>,
    epoch_history: Vec<Epoch>,
    vote_info_list: Vec<VoteInfo>,
    num_blocks_in_epoch: i64,
    start_mainnet_height_for_cc: i64,
}

impl WatcherState {
    pub fn new(
        latest_finalized_height: i64,
        last_known_epoch_num: i64,
        num_blocks_in_epoch: i64,
        start_mainnet_height_for_cc: i64,
    ) -> Self {
        Self {
            latest_finalized_height,
            last_epoch_end_height: latest_finalized_height,
            last_epoch_number: last_known_epoch_num,
            epochs_emitted: 0,
            current_timestamp: 0,
            height_to_finalized_block: HashMap::new(),
            epoch_history: Vec::new(),
            vote_info_list: Vec::new(),
            num_blocks_in_epoch,
            start_mainnet_height_for_cc,
        }
    }

    pub fn latest_finalized_height(&self) -> i64 {
        self.latest_finalized_height
    }

    pub fn last_epoch_end_height(&self) -> i64 {
        self.last_epoch_end_height
    }

    pub fn epochs_emitted(&self) -> i64 {
        self.epochs_emitted
    }

    /// Number the next derived epoch will get.
    pub fn next_epoch_number(&self) -> i64 {
        self.last_epoch_number + 1
    }

    pub fn current_timestamp(&self) -> i64 {
        self.current_timestamp
    }

    pub fn buffered_block_count(&self) -> usize {
        self.height_to_finalized_block.len()
    }

    pub fn epoch_history(&self) -> &[Epoch] {
        &self.epoch_history
    }

    pub fn vote_info_list(&self) -> &[VoteInfo] {
        &self.vote_info_list
    }

    /// Appends the next finalized block. Returns the vote info cut at
    /// the window boundary, if this block completed one.
    pub fn add_finalized(&mut self, block: BchBlock) -> WatcherResult<Option<VoteInfo>> {
        if block.height != self.latest_finalized_height + 1 {
            return Err(WatcherError::NonContiguousBlock {
                have: self.latest_finalized_height,
                got: block.height,
            });
        }
        self.latest_finalized_height = block.height;
        self.current_timestamp = block.timestamp;
        self.height_to_finalized_block.insert(block.height, block);

        if self.latest_finalized_height - self.last_epoch_end_height != self.num_blocks_in_epoch {
            return Ok(None);
        }
        let info = self.build_vote_info()?;
        self.last_epoch_number += 1;
        self.epochs_emitted += 1;
        self.last_epoch_end_height += self.num_blocks_in_epoch;
        self.epoch_history.push(info.epoch.clone());
        self.vote_info_list.push(info.clone());
        self.clear_old_data();
        Ok(Some(info))
    }

    /// Folds the completed window into an epoch plus the monitor votes
    /// over the same blocks.
    fn build_vote_info(&self) -> WatcherResult<VoteInfo> {
        let start_height = self.last_epoch_end_height + 1;

        let mut epoch = Epoch {
            number: self.next_epoch_number(),
            start_height,
            end_time: 0,
            nominations: Vec::new(),
        };
        let mut monitor_vote = MonitorVoteInfo::default();
        let mut validator_counts = HashMap::new();
        let mut monitor_counts = HashMap::new();

        for height in start_height..=self.latest_finalized_height {
            let block = self
                .height_to_finalized_block
                .get(&height)
                .ok_or(WatcherError::MissingFinalizedBlock(height))?;
            if block.timestamp > epoch.end_time {
                epoch.end_time = block.timestamp;
            }
            for nomination in &block.validator_nominations {
                *validator_counts.entry(nomination.pubkey).or_insert(0) +=
                    nomination.nominated_count;
            }
            for nomination in &block.cc_nominations {
                *monitor_counts.entry(nomination.pubkey).or_insert(0) +=
                    nomination.nominated_count;
            }
        }

        epoch.nominations = validator_counts
            .into_iter()
            .map(|(pubkey, nominated_count)| Nomination {
                pubkey,
                nominated_count,
            })
            .collect();
        epoch.sort_nominations();

        if start_height >= self.start_mainnet_height_for_cc {
            monitor_vote.start_height = start_height;
            monitor_vote.end_time = epoch.end_time;
            monitor_vote.nominations = monitor_counts
                .into_iter()
                .map(|(pubkey, nominated_count)| CcNomination {
                    pubkey,
                    nominated_count,
                })
                .collect();
            monitor_vote.sort_nominations();
        }

        Ok(VoteInfo {
            epoch,
            monitor_vote,
        })
    }

    /// Drops blocks far behind the newest epoch window and truncates
    /// the local epoch / vote tails.
    fn clear_old_data(&mut self) {
        if self.vote_info_list.len() > MONITOR_INFO_CLEAN_THRESHOLD {
            let excess = self.vote_info_list.len() - MONITOR_INFO_CLEAN_THRESHOLD;
            self.vote_info_list.drain(..excess);
        }
        if self.epoch_history.len() > MONITOR_INFO_CLEAN_THRESHOLD {
            let excess = self.epoch_history.len() - MONITOR_INFO_CLEAN_THRESHOLD;
            self.epoch_history.drain(..excess);
        }
        let Some(last) = self.vote_info_list.last() else {
            return;
        };
        let mut height =
            last.epoch.start_height - MONITOR_INFO_CLEAN_THRESHOLD as i64 * self.num_blocks_in_epoch;
        while self.height_to_finalized_block.remove(&height).is_some() {
            height -= 1;
        }
    }

    /// Applies a batch of vote infos pulled from a side-chain peer,
    /// jumping the buffer forward without fetching the blocks.
    pub fn fast_forward(&mut self, infos: &[VoteInfo]) {
        let Some(last) = infos.last() else {
            return;
        };
        self.latest_finalized_height += infos.len() as i64 * self.num_blocks_in_epoch;
        self.last_epoch_end_height = self.latest_finalized_height;
        self.last_epoch_number = last.epoch.number;
        self.epochs_emitted += infos.len() as i64;
        self.current_timestamp = last.epoch.end_time;
        for info in infos {
            self.epoch_history.push(info.epoch.clone());
            self.vote_info_list.push(info.clone());
        }
        self.clear_old_data();
    }
}
