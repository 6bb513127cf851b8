//! Core types for the LightChain shard simulator.
//!
//! Everything that is shared between the ledger view, the nodes and the
//! simulation orchestrator lives here: fixed-width overlay identifiers,
//! the blake3 hashing seam, the shard-affine identifier assigner, and the
//! Block/Transaction data types.

mod assigner;
mod block;
mod hash;
mod identifiers;
mod identity;
mod transaction;

pub use assigner::{compute_identifier, AssignerError};
pub use block::{Block, PrevAddress, SignedBytes};
pub use hash::{Blake3Hasher, Hash, Hasher};
pub use identifiers::{Identifier, ShardId, GENESIS_PREV};
pub use identity::NetworkIdentity;
pub use transaction::Transaction;
