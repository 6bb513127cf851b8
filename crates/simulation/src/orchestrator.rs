//! Bootstrap, genesis seeding and shard-batched execution.

use crate::{NodeFactory, SimulationContext, SimulationError};
use lightchain_node::{LedgerNode, NodeRole, SimLog};
use lightchain_types::{Block, NetworkIdentity, ShardId};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Registration attempts before bootstrap gives up.
const MAX_BUILD_ATTEMPTS: u32 = 15;

/// Result of one simulation run.
#[derive(Debug)]
pub struct SimulationRun {
    /// Per-node outcome logs, keyed by the node's overlay identity.
    /// Nodes whose task failed contribute no entry.
    pub logs: HashMap<NetworkIdentity, SimLog>,
    /// Size of the bootstrapped population, failed tasks included.
    pub node_count: u64,
    /// Wall time of the execution phase.
    pub elapsed: Duration,
}

/// Drives one simulation run end to end.
pub struct SimulationOrchestrator<F: NodeFactory> {
    factory: F,
    ctx: Arc<SimulationContext>,
    max_shards: u64,
    node_count: u64,
    nodes: Vec<Arc<F::Node>>,
    introducers: Vec<Arc<F::Node>>,
}

impl<F: NodeFactory> SimulationOrchestrator<F> {
    /// Create an orchestrator for a population of `node_count` nodes
    /// over `max_shards` shards.
    pub fn new(
        factory: F,
        ctx: Arc<SimulationContext>,
        max_shards: u64,
        node_count: u64,
    ) -> Self {
        Self {
            factory,
            ctx,
            max_shards,
            node_count,
            nodes: Vec::new(),
            introducers: Vec::new(),
        }
    }

    /// The bootstrapped population.
    pub fn nodes(&self) -> &[Arc<F::Node>] {
        &self.nodes
    }

    /// The shard introducers, in shard order.
    pub fn introducers(&self) -> &[Arc<F::Node>] {
        &self.introducers
    }

    /// Build the node population.
    ///
    /// The first `max_shards` nodes become shard introducers (one per
    /// shard, recorded in the context); the rest join through shard 0's
    /// introducer. Exhausting a node's registration retries aborts the
    /// whole bootstrap.
    pub async fn bootstrap(&mut self) -> Result<(), SimulationError> {
        for index in 0..self.node_count {
            if index < self.max_shards {
                let shard = ShardId(index);
                let node = self.build_node(index, NodeRole::Introducer { shard }).await?;
                self.ctx.set_introducer(node.shard_id(), node.address());
                self.ctx.mark_inserted(node.shard_id());
                self.introducers.push(Arc::clone(&node));
                self.nodes.push(node);
            } else {
                let introducer = self
                    .ctx
                    .introducer(ShardId(0))
                    .ok_or(SimulationError::MissingIntroducer { shard: ShardId(0) })?;
                let node = self
                    .build_node(index, NodeRole::Member { introducer })
                    .await?;
                self.nodes.push(node);
            }
        }
        info!(
            nodes = self.nodes.len(),
            introducers = self.introducers.len(),
            "bootstrap complete"
        );
        Ok(())
    }

    /// Register one node, probing random ports with a jittered backoff.
    async fn build_node(
        &self,
        index: u64,
        role: NodeRole,
    ) -> Result<Arc<F::Node>, SimulationError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let port = rand::thread_rng().gen_range(1024u16..65535);
            match self.factory.build(index, port, role.clone()) {
                Ok(node) => return Ok(Arc::new(node)),
                Err(source) if attempts >= MAX_BUILD_ATTEMPTS => {
                    return Err(SimulationError::Bootstrap { attempts, source });
                }
                Err(err) => {
                    debug!(index, port, attempts, %err, "node registration failed, retrying");
                    let backoff = rand::thread_rng().gen_range(5u64..25);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
            }
        }
    }

    /// Seed one genesis block per shard through its introducer.
    pub fn seed_genesis(&self) -> Result<Vec<Block>, SimulationError> {
        let mut blocks = Vec::with_capacity(self.introducers.len());
        for introducer in &self.introducers {
            let block = introducer.insert_genesis()?;
            introducer.log_level(0);
            introducer.insert_flag_node(&block, block.shard_id())?;
            debug!(shard = %block.shard_id(), id = %block.num_id(), "genesis seeded");
            blocks.push(block);
        }
        Ok(blocks)
    }

    /// Execute the run: shard batches in strict sequence, nodes within a
    /// batch fully parallel, per-task failures isolated.
    pub async fn run(
        &self,
        iterations: u64,
        pace: Duration,
    ) -> Result<SimulationRun, SimulationError> {
        self.run_inner(iterations, pace, None).await
    }

    /// Bounded-wait variant of [`run`](Self::run): each shard batch must
    /// resolve within `batch_timeout`, otherwise every outstanding task
    /// in the batch is cancelled and one aggregated failure surfaces.
    pub async fn run_bounded(
        &self,
        iterations: u64,
        pace: Duration,
        batch_timeout: Duration,
    ) -> Result<SimulationRun, SimulationError> {
        self.run_inner(iterations, pace, Some(batch_timeout)).await
    }

    async fn run_inner(
        &self,
        iterations: u64,
        pace: Duration,
        batch_timeout: Option<Duration>,
    ) -> Result<SimulationRun, SimulationError> {
        let mut groups: HashMap<u64, Vec<Arc<F::Node>>> = HashMap::new();
        for node in &self.nodes {
            groups
                .entry(node.shard_id().0)
                .or_default()
                .push(Arc::clone(node));
        }

        let mut logs = HashMap::new();
        let started = Instant::now();

        // One index past the last real shard: a catch-all bucket so a
        // node grouped outside [0, max_shards) is joined rather than
        // silently dropped.
        for shard in 0..=self.max_shards {
            let group = groups.remove(&shard).unwrap_or_default();
            if shard == self.max_shards && !group.is_empty() {
                debug!(shard, nodes = group.len(), "catch-all shard bucket is non-empty");
            }
            self.run_batch(shard, group, iterations, pace, batch_timeout, &mut logs)
                .await?;
        }

        let elapsed = started.elapsed();
        info!(
            nodes = logs.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "simulation done"
        );
        Ok(SimulationRun {
            logs,
            node_count: self.node_count,
            elapsed,
        })
    }

    /// Launch one batch and block until every task resolves.
    async fn run_batch(
        &self,
        shard: u64,
        group: Vec<Arc<F::Node>>,
        iterations: u64,
        pace: Duration,
        batch_timeout: Option<Duration>,
        logs: &mut HashMap<NetworkIdentity, SimLog>,
    ) -> Result<(), SimulationError> {
        if group.is_empty() {
            return Ok(());
        }
        debug!(shard, nodes = group.len(), "launching shard batch");

        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        for node in group {
            let cancel = cancel.clone();
            tasks.spawn_blocking(move || {
                let peer = node.peer();
                let outcome = node.run_simulation(iterations, pace, &cancel);
                (peer, outcome)
            });
        }

        let drain = async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((peer, Ok(log))) => {
                        logs.insert(peer, log);
                    }
                    Ok((peer, Err(err))) => {
                        warn!(%peer, %err, "node simulation failed");
                    }
                    Err(err) => {
                        warn!(%err, "simulation task panicked");
                    }
                }
            }
        };

        match batch_timeout {
            None => {
                drain.await;
                Ok(())
            }
            Some(timeout) => match tokio::time::timeout(timeout, drain).await {
                Ok(()) => Ok(()),
                Err(_) => {
                    cancel.cancel();
                    tasks.abort_all();
                    Err(SimulationError::BatchTimeout { shard, timeout })
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalNodeFactory;
    use lightchain_node::{NodeError, NodeParams};
    use lightchain_types::{Blake3Hasher, Identifier};
    use lightchain_view::{LedgerView, Mode};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn local_setup(
        max_shards: u64,
        node_count: u64,
    ) -> SimulationOrchestrator<LocalNodeFactory> {
        let view = Arc::new(LedgerView::new());
        let ctx = Arc::new(SimulationContext::new());
        let params = NodeParams {
            levels: 16,
            max_shards,
            ..NodeParams::default()
        };
        let factory = LocalNodeFactory::new(
            params,
            view,
            Arc::clone(&ctx),
            Arc::new(Blake3Hasher),
            42,
            0.0,
        );
        SimulationOrchestrator::new(factory, ctx, max_shards, node_count)
    }

    #[tokio::test]
    async fn test_bootstrap_all_introducers() {
        // node_count == max_shards: every node introduces a distinct
        // shard and there are no members.
        let mut orch = local_setup(4, 4);
        orch.bootstrap().await.unwrap();

        assert_eq!(orch.introducers().len(), 4);
        assert_eq!(orch.nodes().len(), 4);

        let shards: HashSet<_> = orch.introducers().iter().map(|n| n.shard_id()).collect();
        assert_eq!(shards, (0..4).map(ShardId).collect());
        assert!(orch.nodes().iter().all(|n| n.is_introducer()));
    }

    #[tokio::test]
    async fn test_genesis_one_block_per_shard() {
        let mut orch = local_setup(4, 4);
        orch.bootstrap().await.unwrap();
        let blocks = orch.seed_genesis().unwrap();

        assert_eq!(blocks.len(), 4);
        for (introducer, block) in orch.introducers().iter().zip(&blocks) {
            assert_eq!(block.shard_id(), introducer.shard_id());
            assert_eq!(block.owner, introducer.num_id());
        }
    }

    #[tokio::test]
    async fn test_members_join_via_shard_zero() {
        let mut orch = local_setup(2, 6);
        orch.bootstrap().await.unwrap();

        let shard0 = orch.ctx.introducer(ShardId(0)).unwrap();
        let members: Vec<_> = orch
            .nodes()
            .iter()
            .filter(|n| !n.is_introducer())
            .collect();
        assert_eq!(members.len(), 4);
        assert!(members.iter().all(|n| n.joined_via() == Some(shard0.as_str())));
    }

    #[tokio::test]
    async fn test_full_run_collects_all_logs() {
        let mut orch = local_setup(2, 5);
        orch.bootstrap().await.unwrap();
        orch.seed_genesis().unwrap();

        let run = orch.run(3, Duration::ZERO).await.unwrap();
        assert_eq!(run.logs.len(), 5);
        assert_eq!(run.node_count, 5);
        for log in run.logs.values() {
            assert_eq!(log.total_transaction_trials(), 3);
        }
    }

    // Scripted node for failure-path tests.
    struct ScriptedNode {
        identity: NetworkIdentity,
        behavior: Behavior,
    }

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail,
        HangUntilCancelled,
    }

    impl ScriptedNode {
        fn new(index: u64, shard: ShardId, behavior: Behavior) -> Self {
            let num_id = Identifier::new(index, 8).unwrap();
            Self {
                identity: NetworkIdentity::new(
                    format!("127.0.0.1:{}", 5000 + index),
                    num_id,
                    num_id.to_bit_string(),
                    shard,
                ),
                behavior,
            }
        }
    }

    impl LedgerNode for ScriptedNode {
        fn insert_genesis(&self) -> Result<Block, NodeError> {
            unimplemented!("not used by these tests")
        }

        fn log_level(&self, _level: u32) {}

        fn insert_flag_node(&self, _block: &Block, _shard: ShardId) -> Result<(), NodeError> {
            Ok(())
        }

        fn run_simulation(
            &self,
            _iterations: u64,
            _pace: Duration,
            cancel: &CancellationToken,
        ) -> Result<SimLog, NodeError> {
            match self.behavior {
                Behavior::Succeed => Ok(SimLog::new(Mode::Honest)),
                Behavior::Fail => Err(NodeError::NotIntroducer {
                    num_id: self.identity.num_id.value(),
                }),
                Behavior::HangUntilCancelled => loop {
                    if cancel.is_cancelled() {
                        return Err(NodeError::Cancelled);
                    }
                    std::thread::sleep(Duration::from_millis(5));
                },
            }
        }

        fn num_id(&self) -> u64 {
            self.identity.num_id.value()
        }

        fn shard_id(&self) -> ShardId {
            self.identity.shard
        }

        fn address(&self) -> String {
            self.identity.address.clone()
        }

        fn peer(&self) -> NetworkIdentity {
            self.identity.clone()
        }
    }

    struct ScriptedFactory {
        behaviors: Vec<Behavior>,
        shard: ShardId,
        fail_builds: u32,
        builds: AtomicU32,
    }

    impl NodeFactory for ScriptedFactory {
        type Node = ScriptedNode;

        fn build(&self, index: u64, port: u16, _role: NodeRole) -> Result<ScriptedNode, NodeError> {
            let attempt = self.builds.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_builds {
                return Err(NodeError::PortInUse(port));
            }
            Ok(ScriptedNode::new(
                index,
                self.shard,
                self.behaviors[index as usize % self.behaviors.len()],
            ))
        }
    }

    fn scripted(behaviors: Vec<Behavior>, fail_builds: u32) -> SimulationOrchestrator<ScriptedFactory> {
        let node_count = behaviors.len() as u64;
        let factory = ScriptedFactory {
            behaviors,
            shard: ShardId(0),
            fail_builds,
            builds: AtomicU32::new(0),
        };
        SimulationOrchestrator::new(factory, Arc::new(SimulationContext::new()), 1, node_count)
    }

    #[tokio::test]
    async fn test_batch_failure_isolation() {
        // One failing node in a batch of three: two entries survive and
        // the batch itself still succeeds.
        let mut orch = scripted(
            vec![Behavior::Succeed, Behavior::Fail, Behavior::Succeed],
            0,
        );
        orch.bootstrap().await.unwrap();

        let run = orch.run(1, Duration::ZERO).await.unwrap();
        assert_eq!(run.logs.len(), 2);
        assert_eq!(run.node_count, 3);
    }

    #[tokio::test]
    async fn test_bootstrap_retries_port_collisions() {
        // First three registrations collide; the retry loop absorbs them.
        let mut orch = scripted(vec![Behavior::Succeed], 3);
        orch.bootstrap().await.unwrap();
        assert_eq!(orch.nodes().len(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_exhaustion_is_fatal() {
        let mut orch = scripted(vec![Behavior::Succeed], u32::MAX);
        let err = orch.bootstrap().await.unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Bootstrap { attempts: 15, .. }
        ));
        assert!(orch.nodes().is_empty());
    }

    #[tokio::test]
    async fn test_bounded_run_times_out() {
        let mut orch = scripted(vec![Behavior::Succeed, Behavior::HangUntilCancelled], 0);
        orch.bootstrap().await.unwrap();

        let err = orch
            .run_bounded(1, Duration::ZERO, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::BatchTimeout { shard: 0, .. }));
    }

    #[tokio::test]
    async fn test_unbounded_run_waits_out_slow_batches() {
        // Without a bound the orchestrator just waits; nothing times out.
        let mut orch = scripted(vec![Behavior::Succeed], 0);
        orch.bootstrap().await.unwrap();
        let run = orch.run(1, Duration::from_millis(1)).await.unwrap();
        assert_eq!(run.logs.len(), 1);
    }
}
