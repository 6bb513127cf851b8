//! Transactions.

use crate::block::PrevAddress;
use crate::{
    compute_identifier, AssignerError, Hasher, Identifier, NetworkIdentity, ShardId, SignedBytes,
};
use serde::{Deserialize, Serialize};

/// A transaction anchored to its owner's shard.
///
/// Shares the block's identifier scheme: the content digest's shard
/// residue is replaced with the owner's, so the transaction is stored on
/// the same shard as the node that issued it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Overlay identity (address, identifier, name, shard).
    pub identity: NetworkIdentity,
    /// Address of the owner's latest block when the transaction was made.
    pub prev: PrevAddress,
    /// numID of the issuing node.
    pub owner: u64,
    /// Opaque content payload.
    pub content: Vec<u8>,
    signatures: Vec<SignedBytes>,
    /// Identifier width in bits.
    pub levels: u32,
}

impl Transaction {
    /// Create a transaction, computing its shard-affine identifier.
    pub fn new(
        prev: PrevAddress,
        owner: u64,
        content: Vec<u8>,
        address: impl Into<String>,
        levels: u32,
        max_shards: u64,
        hasher: &dyn Hasher,
    ) -> Result<Self, AssignerError> {
        let mut hashed = prev.content_bytes();
        hashed.extend_from_slice(&owner.to_be_bytes());
        hashed.extend_from_slice(&content);

        let num_id = compute_identifier(hasher, &hashed, owner, levels, max_shards)?;
        let shard = num_id.shard(max_shards);

        Ok(Self {
            identity: NetworkIdentity::new(address, num_id, prev.name(), shard),
            prev,
            owner,
            content,
            signatures: Vec::new(),
            levels,
        })
    }

    /// The transaction's fixed-width identifier.
    pub fn num_id(&self) -> Identifier {
        self.identity.num_id
    }

    /// Shard the transaction belongs to.
    pub fn shard_id(&self) -> ShardId {
        self.identity.shard
    }

    /// Accumulated validator signatures, append-only.
    pub fn signatures(&self) -> &[SignedBytes] {
        &self.signatures
    }

    /// Append a validator signature.
    pub fn add_signature(&mut self, signature: SignedBytes) {
        self.signatures.push(signature);
    }

    /// Bytes contributed to an enclosing block's content hash.
    pub fn payload_bytes(&self) -> Vec<u8> {
        let mut bytes = self.prev.content_bytes();
        bytes.extend_from_slice(&self.owner.to_be_bytes());
        bytes.extend_from_slice(&self.content);
        bytes
    }
}
