//! Cryptographic hash type and the hashing seam.

use std::fmt;

/// A 32-byte cryptographic hash using Blake3.
///
/// Deterministic; safe to use as a HashMap key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Size of hash in bytes.
    pub const BYTES: usize = 32;

    /// Zero hash (all bytes are 0x00).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create hash from bytes using Blake3.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let hash = blake3::hash(bytes);
        Self(*hash.as_bytes())
    }

    /// Create hash from multiple byte slices.
    pub fn from_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Convert hash to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Interpret the first 8 bytes as u64 (big-endian), so truncating
    /// keeps the high-order bits of the digest.
    pub fn prefix_u64(&self) -> u64 {
        u64::from_be_bytes(self.0[0..8].try_into().unwrap())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Hash({}..{})", &hex[..8], &hex[56..])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// The hashing collaborator used for identifier assignment.
///
/// `digest` returns the top `levels` bits of the content hash as an
/// unsigned integer. Implementations must be deterministic; tests inject
/// fixed digests through this trait.
pub trait Hasher: Send + Sync {
    /// Hash `content` down to a `levels`-bit unsigned value.
    fn digest(&self, content: &[u8], levels: u32) -> u64;
}

/// Production hasher backed by Blake3.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl Hasher for Blake3Hasher {
    fn digest(&self, content: &[u8], levels: u32) -> u64 {
        debug_assert!(levels >= 1 && levels <= 63);
        Hash::from_bytes(content).prefix_u64() >> (64 - levels)
    }
}
