//! Node collaborator for the LightChain simulator.
//!
//! The orchestrator only ever talks to nodes through the [`LedgerNode`]
//! trait: a small opaque capability set covering genesis creation, shard
//! head registration and one synchronous simulation run. Routing,
//! consensus and signature internals stay behind the trait.
//!
//! [`LocalNode`] is the in-process implementation used by the simulator
//! binary and the tests.

mod local;
mod log;
mod registry;

pub use local::{LocalNode, NodeParams};
pub use log::{MineAttemptLog, SimLog, TransactionLog};
pub use registry::PortRegistry;

use lightchain_types::{AssignerError, Block, NetworkIdentity, ShardId};
use lightchain_view::ViewError;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// How a node enters the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRole {
    /// Bootstrap node for `shard`; its identifier is pinned to that
    /// shard's residue.
    Introducer {
        /// Shard this node introduces.
        shard: ShardId,
    },
    /// Regular node joining through an introducer.
    Member {
        /// Address of the introducer joined through.
        introducer: String,
    },
}

/// Errors from node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Registration failed because the chosen port is already claimed.
    #[error("port {0} is already in use")]
    PortInUse(u16),

    /// A genesis operation was requested on a non-introducer node.
    #[error("node {num_id} is not a shard introducer")]
    NotIntroducer {
        /// numID of the node.
        num_id: u64,
    },

    /// Identifier assignment failed.
    #[error(transparent)]
    Assigner(#[from] AssignerError),

    /// A required ledger view entry was missing.
    #[error(transparent)]
    View(#[from] ViewError),

    /// The simulation run was cancelled before completing.
    #[error("simulation run cancelled")]
    Cancelled,
}

/// The opaque node collaborator.
///
/// All methods are synchronous: the orchestrator owns every suspension
/// point and drives node work on its worker pool.
pub trait LedgerNode: Send + Sync {
    /// Create the genesis block of this node's shard.
    ///
    /// Only shard introducers may create genesis blocks.
    fn insert_genesis(&self) -> Result<Block, NodeError>;

    /// Set the node's log verbosity.
    fn log_level(&self, level: u32);

    /// Register `block` as the head of `shard`'s chain.
    fn insert_flag_node(&self, block: &Block, shard: ShardId) -> Result<(), NodeError>;

    /// Run `iterations` simulated mining/validation rounds, pacing with
    /// `pace` between rounds.
    ///
    /// Implementations must observe `cancel` between rounds and bail out
    /// with [`NodeError::Cancelled`] once it fires.
    fn run_simulation(
        &self,
        iterations: u64,
        pace: Duration,
        cancel: &CancellationToken,
    ) -> Result<SimLog, NodeError>;

    /// The node's numeric identifier.
    fn num_id(&self) -> u64;

    /// The shard this node belongs to.
    fn shard_id(&self) -> ShardId;

    /// The node's transport address.
    fn address(&self) -> String;

    /// The node's overlay identity.
    fn peer(&self) -> NetworkIdentity;
}
