//! Domain-specific identifier types.

use crate::AssignerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shard identifier, an integer in `[0, max_shards)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ShardId(pub u64);

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shard({})", self.0)
    }
}

/// Sentinel previous-address content used when hashing a genesis block.
pub const GENESIS_PREV: &[u8] = b"genesis";

/// Fixed-width overlay identifier.
///
/// Exactly `levels` bits wide: the value is always strictly less than
/// `2^levels`, and the bit-string rendering is zero-padded to exactly
/// `levels` characters. The low-order residue modulo the shard count
/// selects the shard the identified entity lives on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Identifier {
    value: u64,
    levels: u32,
}

impl Identifier {
    /// Maximum supported identifier width in bits.
    pub const MAX_LEVELS: u32 = 63;

    /// Create an identifier, checking that `value` fits in `levels` bits.
    pub fn new(value: u64, levels: u32) -> Result<Self, AssignerError> {
        if levels == 0 || levels > Self::MAX_LEVELS {
            return Err(AssignerError::InvalidLevels { levels });
        }
        if value >> levels != 0 {
            return Err(AssignerError::IdentifierOverflow { value, levels });
        }
        Ok(Self { value, levels })
    }

    /// Numeric value, strictly less than `2^levels`.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Identifier width in bits.
    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// Shard this identifier belongs to.
    pub fn shard(&self, max_shards: u64) -> ShardId {
        ShardId(self.value % max_shards)
    }

    /// Render as a binary string of exactly `levels` characters.
    pub fn to_bit_string(&self) -> String {
        format!("{:0width$b}", self.value, width = self.levels as usize)
    }

    /// Parse a binary string back into an identifier.
    ///
    /// The string length gives the width, so leading zeros are significant.
    pub fn from_bit_string(bits: &str) -> Result<Self, AssignerError> {
        let levels = bits.len() as u32;
        if levels == 0 || levels > Self::MAX_LEVELS {
            return Err(AssignerError::InvalidLevels { levels });
        }
        let value = u64::from_str_radix(bits, 2)
            .map_err(|_| AssignerError::InvalidBitString { bits: bits.to_owned() })?;
        Self::new(value, levels)
    }

    /// The identifier's bytes as hashed into child content (big-endian).
    pub fn to_content_bytes(&self) -> [u8; 8] {
        self.value.to_be_bytes()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bit_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_string_width() {
        let id = Identifier::new(5, 8).unwrap();
        assert_eq!(id.to_bit_string(), "00000101");
        assert_eq!(id.to_bit_string().len(), 8);
    }

    #[test]
    fn test_bit_string_roundtrip() {
        let id = Identifier::new(0b1011, 8).unwrap();
        let parsed = Identifier::from_bit_string(&id.to_bit_string()).unwrap();
        assert_eq!(id, parsed);
        assert_eq!(parsed.levels(), 8);
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(matches!(
            Identifier::new(256, 8),
            Err(AssignerError::IdentifierOverflow { value: 256, levels: 8 })
        ));
        assert!(Identifier::new(255, 8).is_ok());
    }

    #[test]
    fn test_invalid_levels() {
        assert!(Identifier::new(0, 0).is_err());
        assert!(Identifier::new(0, 64).is_err());
        assert!(Identifier::new(0, 63).is_ok());
    }

    #[test]
    fn test_shard() {
        let id = Identifier::new(13, 8).unwrap();
        assert_eq!(id.shard(4), ShardId(1));
    }
}
