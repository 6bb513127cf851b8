//! Blocks and the opaque signature envelope.

use crate::{
    compute_identifier, AssignerError, Hasher, Identifier, NetworkIdentity, ShardId, Transaction,
    GENESIS_PREV,
};
use serde::{Deserialize, Serialize};

/// Opaque signature bytes, stored and forwarded but never inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBytes(pub Vec<u8>);

/// Address of the block preceding this one in its shard chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrevAddress {
    /// No predecessor: this is the first block of the shard.
    Genesis,
    /// Identifier of the previous block.
    Block(Identifier),
}

impl PrevAddress {
    /// Bytes fed into the content hash for this predecessor.
    pub fn content_bytes(&self) -> Vec<u8> {
        match self {
            PrevAddress::Genesis => GENESIS_PREV.to_vec(),
            PrevAddress::Block(id) => id.to_content_bytes().to_vec(),
        }
    }

    pub(crate) fn name(&self) -> String {
        match self {
            PrevAddress::Genesis => "genesis".to_owned(),
            PrevAddress::Block(id) => id.to_bit_string(),
        }
    }
}

/// A block in one shard's chain.
///
/// The identifier is computed over the predecessor, the owner and the
/// transaction payloads at construction time; the shard always matches
/// the owner's shard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Overlay identity (address, identifier, name, shard).
    pub identity: NetworkIdentity,
    /// Predecessor in this shard's chain.
    pub prev: PrevAddress,
    /// numID of the node that mined the block.
    pub owner: u64,
    transactions: Vec<Transaction>,
    signatures: Vec<SignedBytes>,
    /// Position in the shard chain.
    pub index: u64,
    /// Identifier width in bits.
    pub levels: u32,
}

impl Block {
    /// Create a block over an ordered transaction list.
    pub fn new(
        prev: PrevAddress,
        owner: u64,
        address: impl Into<String>,
        transactions: Vec<Transaction>,
        index: u64,
        levels: u32,
        max_shards: u64,
        hasher: &dyn Hasher,
    ) -> Result<Self, AssignerError> {
        let mut content = prev.content_bytes();
        content.extend_from_slice(&owner.to_be_bytes());
        for tx in &transactions {
            content.extend_from_slice(&tx.payload_bytes());
        }

        let num_id = compute_identifier(hasher, &content, owner, levels, max_shards)?;
        let shard = num_id.shard(max_shards);
        debug_assert_eq!(shard, ShardId(owner % max_shards));

        Ok(Self {
            identity: NetworkIdentity::new(address, num_id, prev.name(), shard),
            prev,
            owner,
            transactions,
            signatures: Vec::new(),
            index,
            levels,
        })
    }

    /// Create the first block of `owner`'s shard chain.
    pub fn genesis(
        owner: u64,
        address: impl Into<String>,
        levels: u32,
        max_shards: u64,
        hasher: &dyn Hasher,
    ) -> Result<Self, AssignerError> {
        Self::new(
            PrevAddress::Genesis,
            owner,
            address,
            Vec::new(),
            0,
            levels,
            max_shards,
            hasher,
        )
    }

    /// The block's fixed-width identifier.
    pub fn num_id(&self) -> Identifier {
        self.identity.num_id
    }

    /// Shard the block belongs to.
    pub fn shard_id(&self) -> ShardId {
        self.identity.shard
    }

    /// Ordered transaction list.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Accumulated signatures, append-only.
    pub fn signatures(&self) -> &[SignedBytes] {
        &self.signatures
    }

    /// Append a validator signature.
    pub fn add_signature(&mut self, signature: SignedBytes) {
        self.signatures.push(signature);
    }

    /// Replace the transaction list prior to finalization.
    ///
    /// The identifier is **not** recomputed: it reflects the transaction
    /// set the block was constructed with.
    pub fn replace_transactions(&mut self, transactions: Vec<Transaction>) {
        self.transactions = transactions;
    }
}
