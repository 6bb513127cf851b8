//! Shared network identity embedded in overlay entities.

use crate::{Identifier, ShardId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overlay identity shared by nodes, blocks and transactions.
///
/// Plain data, embedded by value: blocks and transactions carry one of
/// these instead of inheriting from a common node type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkIdentity {
    /// Transport address (`host:port`) of the owning endpoint.
    pub address: String,
    /// Fixed-width numeric identifier used for overlay placement.
    pub num_id: Identifier,
    /// Name identifier used for overlay level placement.
    pub name: String,
    /// Shard the entity lives on.
    pub shard: ShardId,
}

impl NetworkIdentity {
    /// Create an identity.
    pub fn new(
        address: impl Into<String>,
        num_id: Identifier,
        name: impl Into<String>,
        shard: ShardId,
    ) -> Self {
        Self {
            address: address.into(),
            num_id,
            name: name.into(),
            shard,
        }
    }
}

impl fmt::Display for NetworkIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} ({})",
            self.num_id.value(),
            self.address,
            self.shard
        )
    }
}
