//! Best-effort port registry for node registration.

use dashmap::DashMap;

/// Claimed-port registry shared by every node of a run.
///
/// Port probing is unsynchronized best-effort: nodes pick random ports
/// and collisions are recovered by the bootstrap retry loop, not
/// prevented up front.
#[derive(Debug, Default)]
pub struct PortRegistry {
    claimed: DashMap<u16, ()>,
}

impl PortRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `port`. Returns false if it was already taken.
    pub fn claim(&self, port: u16) -> bool {
        self.claimed.insert(port, ()).is_none()
    }

    /// Release `port` back to the pool.
    pub fn release(&self, port: u16) {
        self.claimed.remove(&port);
    }

    /// Number of claimed ports.
    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    /// Whether no port is claimed.
    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
