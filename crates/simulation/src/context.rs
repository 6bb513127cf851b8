//! Per-run shared registries.

use dashmap::DashMap;
use lightchain_node::PortRegistry;
use lightchain_types::ShardId;
use std::sync::Arc;

/// Registries shared across one simulation run.
///
/// Constructed once per run and passed explicitly to every orchestrator
/// operation, so nothing leaks between runs.
#[derive(Debug, Default)]
pub struct SimulationContext {
    introducers: DashMap<ShardId, String>,
    inserted: DashMap<ShardId, ()>,
    ports: Arc<PortRegistry>,
}

impl SimulationContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `address` as `shard`'s introducer.
    pub fn set_introducer(&self, shard: ShardId, address: String) {
        self.introducers.insert(shard, address);
    }

    /// Address of `shard`'s introducer, if one registered.
    pub fn introducer(&self, shard: ShardId) -> Option<String> {
        self.introducers.get(&shard).map(|entry| entry.clone())
    }

    /// Mark `shard` as inserted into the overlay.
    pub fn mark_inserted(&self, shard: ShardId) {
        self.inserted.insert(shard, ());
    }

    /// Whether `shard` has been inserted.
    pub fn is_inserted(&self, shard: ShardId) -> bool {
        self.inserted.contains_key(&shard)
    }

    /// The run's shared port registry.
    pub fn ports(&self) -> Arc<PortRegistry> {
        Arc::clone(&self.ports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_introducer_registry() {
        let ctx = SimulationContext::new();
        assert_eq!(ctx.introducer(ShardId(0)), None);

        ctx.set_introducer(ShardId(0), "127.0.0.1:4000".to_owned());
        assert_eq!(
            ctx.introducer(ShardId(0)).as_deref(),
            Some("127.0.0.1:4000")
        );
    }

    #[test]
    fn test_inserted_flags() {
        let ctx = SimulationContext::new();
        assert!(!ctx.is_inserted(ShardId(1)));
        ctx.mark_inserted(ShardId(1));
        assert!(ctx.is_inserted(ShardId(1)));
    }
}
