//! Transaction filtering for the BCH watcher: coinbase nomination
//! markers and cross-chain covenant transfer classification.

pub mod cc;
pub mod coinbase;

pub use cc::{find_receiver_in_op_return, CcTxParser};
pub use coinbase::{extract_monitor_pubkey, extract_validator_pubkey};
