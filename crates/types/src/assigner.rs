//! Shard-affine identifier assignment.
//!
//! Every block and transaction is placed in the same shard as its owning
//! node while keeping the high-order bits of the content digest for
//! overlay placement entropy: the digest's low-order residue modulo the
//! shard count is forced to the owner's residue, which gives O(1) shard
//! co-location without a routing hop.

use crate::{Hasher, Identifier};
use thiserror::Error;

/// Errors from identifier assignment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignerError {
    /// Identifier width outside the supported `1..=63` range.
    #[error("identifier width {levels} is outside 1..=63")]
    InvalidLevels {
        /// Requested width in bits.
        levels: u32,
    },

    /// Shard count must be at least 1.
    #[error("shard count must be at least 1")]
    ZeroShards,

    /// The shard-adjusted value needs more than `levels` bits.
    ///
    /// Masking instead would break the shard residue whenever the shard
    /// count does not divide `2^levels`, so the overflow is rejected.
    #[error("identifier {value} does not fit in {levels} bits")]
    IdentifierOverflow {
        /// The adjusted value that overflowed.
        value: u64,
        /// Requested width in bits.
        levels: u32,
    },

    /// A bit string contained characters other than `0`/`1`.
    #[error("invalid identifier bit string {bits:?}")]
    InvalidBitString {
        /// The offending string.
        bits: String,
    },
}

/// Compute the shard-affine identifier for `content` owned by `owner`.
///
/// The digest's high-order bits are preserved and its low-order residue
/// modulo `max_shards` is replaced with the owner's residue, so the
/// result always satisfies
/// `identifier.value() % max_shards == owner % max_shards`.
///
/// Pure: identical inputs with the same hasher always yield the same
/// identifier.
pub fn compute_identifier(
    hasher: &dyn Hasher,
    content: &[u8],
    owner: u64,
    levels: u32,
    max_shards: u64,
) -> Result<Identifier, AssignerError> {
    if levels == 0 || levels > Identifier::MAX_LEVELS {
        return Err(AssignerError::InvalidLevels { levels });
    }
    if max_shards == 0 {
        return Err(AssignerError::ZeroShards);
    }

    let base = hasher.digest(content, levels);
    let owner_shard = owner % max_shards;
    let adjusted = (base / max_shards) * max_shards + owner_shard;

    // Rare: the digest sat in the top partial residue window and the
    // shard substitution pushed it past 2^levels.
    Identifier::new(adjusted, levels)
}
