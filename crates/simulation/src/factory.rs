//! Node construction seam.

use crate::SimulationContext;
use lightchain_node::{LedgerNode, LocalNode, NodeError, NodeParams, NodeRole};
use lightchain_types::Hasher;
use lightchain_view::{LedgerView, Mode};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// Builds nodes for the orchestrator.
///
/// A trait so tests can inject nodes with scripted behavior; production
/// runs use [`LocalNodeFactory`].
pub trait NodeFactory: Send + Sync {
    /// The node type this factory produces.
    type Node: LedgerNode + 'static;

    /// Try to register a node on `port`. `index` is the node's position
    /// in the bootstrap sequence.
    fn build(&self, index: u64, port: u16, role: NodeRole) -> Result<Self::Node, NodeError>;
}

/// Factory wiring [`LocalNode`] to the run's shared state.
pub struct LocalNodeFactory {
    params: NodeParams,
    view: Arc<LedgerView>,
    ctx: Arc<SimulationContext>,
    hasher: Arc<dyn Hasher>,
    seed: u64,
    adversary_ratio: f64,
}

impl LocalNodeFactory {
    /// Create a factory.
    ///
    /// `adversary_ratio` is the probability that a node runs in
    /// adversarial mode, drawn deterministically from `seed` and the
    /// node's bootstrap index.
    pub fn new(
        params: NodeParams,
        view: Arc<LedgerView>,
        ctx: Arc<SimulationContext>,
        hasher: Arc<dyn Hasher>,
        seed: u64,
        adversary_ratio: f64,
    ) -> Self {
        Self {
            params,
            view,
            ctx,
            hasher,
            seed,
            adversary_ratio: adversary_ratio.clamp(0.0, 1.0),
        }
    }

    fn mode_for(&self, index: u64) -> Mode {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ index.rotate_left(17));
        if rng.gen_bool(self.adversary_ratio) {
            Mode::Adversarial
        } else {
            Mode::Honest
        }
    }
}

impl NodeFactory for LocalNodeFactory {
    type Node = LocalNode;

    fn build(&self, index: u64, port: u16, role: NodeRole) -> Result<LocalNode, NodeError> {
        LocalNode::register(
            self.params,
            port,
            role,
            self.mode_for(index),
            self.seed.wrapping_add(index),
            Arc::clone(&self.view),
            self.ctx.ports(),
            Arc::clone(&self.hasher),
        )
    }
}
