//! Error types for the simulation orchestrator.

use lightchain_node::NodeError;
use lightchain_types::ShardId;
use std::time::Duration;
use thiserror::Error;

/// Errors from orchestrating a simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Node construction exhausted its retry budget.
    ///
    /// Fatal: no partial network is usable, so the run aborts.
    #[error("node registration failed after {attempts} attempts")]
    Bootstrap {
        /// Registration attempts made.
        attempts: u32,
        /// The last registration error.
        #[source]
        source: NodeError,
    },

    /// A member tried to join before its shard's introducer registered.
    #[error("no introducer registered for {shard}")]
    MissingIntroducer {
        /// Shard missing an introducer.
        shard: ShardId,
    },

    /// A shard batch did not resolve within the bounded wait.
    #[error("shard {shard} batch timed out after {timeout:?}")]
    BatchTimeout {
        /// Shard index of the batch.
        shard: u64,
        /// The bounded wait that expired.
        timeout: Duration,
    },

    /// A node operation outside the batch boundary failed.
    #[error(transparent)]
    Node(#[from] NodeError),
}
