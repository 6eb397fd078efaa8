//! Primitive types shared across the BCH mainnet watcher: fixed-size
//! byte buffers, block/transaction wire structures, staking epochs and
//! cross-chain transfer records.

pub mod block;
pub mod buf;
pub mod cc;
pub mod errors;
pub mod staking;

pub use block::{BchBlock, BlockInfo, ScriptPubKey, ScriptSig, TxInfo, Vin, Vout};
pub use buf::{Address20, Hash256, Pubkey32, Pubkey33};
pub use cc::{
    CcNomination, CcTransferInfo, CcTransferKind, MonitorVoteInfo, Satoshi, UtxoRef, UtxoSet,
};
pub use errors::ParseError;
pub use staking::{Epoch, Nomination, VoteInfo};
