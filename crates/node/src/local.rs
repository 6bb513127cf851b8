//! In-process node implementation.

use crate::{LedgerNode, MineAttemptLog, NodeError, NodeRole, PortRegistry, SimLog, TransactionLog};
use lightchain_types::{
    Block, Hasher, Identifier, NetworkIdentity, PrevAddress, ShardId, SignedBytes, Transaction,
};
use lightchain_view::{LedgerView, Mode};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// Parameters shared by every node of a run.
#[derive(Debug, Clone, Copy)]
pub struct NodeParams {
    /// Identifier width in bits.
    pub levels: u32,
    /// Number of shards.
    pub max_shards: u64,
    /// Balance each node starts with.
    pub initial_balance: i64,
    /// Validators consulted per transaction trial.
    pub validators: u32,
}

impl Default for NodeParams {
    fn default() -> Self {
        Self {
            levels: 16,
            max_shards: 2,
            initial_balance: 20,
            validators: 3,
        }
    }
}

/// Chain head owned by one node.
#[derive(Debug, Default)]
struct ChainHead {
    id: Option<Identifier>,
    next_index: u64,
}

/// In-process node running simulated mining and validation rounds
/// against the shared ledger view.
///
/// Stands in for a full overlay node: routing and lookups are out of
/// scope, so every interaction goes through the shared [`LedgerView`].
pub struct LocalNode {
    params: NodeParams,
    identity: NetworkIdentity,
    port: u16,
    role: NodeRole,
    mode: Mode,
    seed: u64,
    view: Arc<LedgerView>,
    ports: Arc<PortRegistry>,
    hasher: Arc<dyn Hasher>,
    head: Mutex<ChainHead>,
    log_level: AtomicU32,
}

impl LocalNode {
    /// Register a node on `port`.
    ///
    /// Claims the port in the shared registry; a taken port fails with
    /// [`NodeError::PortInUse`] and is recovered by the bootstrap retry
    /// loop. An introducer's identifier is pinned to its shard's residue
    /// so every shard gets exactly one bootstrap node; a member's shard
    /// falls wherever its hash-derived identifier lands.
    #[allow(clippy::too_many_arguments)]
    pub fn register(
        params: NodeParams,
        port: u16,
        role: NodeRole,
        mode: Mode,
        seed: u64,
        view: Arc<LedgerView>,
        ports: Arc<PortRegistry>,
        hasher: Arc<dyn Hasher>,
    ) -> Result<Self, NodeError> {
        if !ports.claim(port) {
            return Err(NodeError::PortInUse(port));
        }

        let address = format!("127.0.0.1:{port}");
        let raw = hasher.digest(address.as_bytes(), params.levels);
        let value = match role {
            NodeRole::Introducer { shard } => {
                (raw / params.max_shards) * params.max_shards + shard.0
            }
            NodeRole::Member { .. } => raw,
        };
        let num_id = match Identifier::new(value, params.levels) {
            Ok(num_id) => num_id,
            Err(err) => {
                // Registration failed; hand the port back for the retry.
                ports.release(port);
                return Err(err.into());
            }
        };
        let shard = num_id.shard(params.max_shards);
        let identity = NetworkIdentity::new(&address, num_id, num_id.to_bit_string(), shard);

        view.update_mode(num_id.value(), mode);
        view.update_balance(num_id.value(), params.initial_balance);
        view.update_state(num_id.value(), 0);

        Ok(Self {
            params,
            identity,
            port,
            role,
            mode,
            seed,
            view,
            ports,
            hasher,
            head: Mutex::new(ChainHead::default()),
            log_level: AtomicU32::new(0),
        })
    }

    /// Whether this node bootstraps its shard.
    pub fn is_introducer(&self) -> bool {
        matches!(self.role, NodeRole::Introducer { .. })
    }

    /// Address of the introducer this node joined through, if any.
    pub fn joined_via(&self) -> Option<&str> {
        match &self.role {
            NodeRole::Member { introducer } => Some(introducer),
            NodeRole::Introducer { .. } => None,
        }
    }

    fn prev_address(&self) -> PrevAddress {
        match self.head.lock().id {
            Some(id) => PrevAddress::Block(id),
            None => PrevAddress::Genesis,
        }
    }

    /// One transaction validation trial.
    fn try_transaction(&self, rng: &mut ChaCha8Rng) -> Result<(TransactionLog, Option<Transaction>), NodeError> {
        let prev = self.prev_address();
        let mut content = [0u8; 16];
        rng.fill(&mut content);

        let started = Instant::now();
        let tx = match Transaction::new(
            prev,
            self.num_id(),
            content.to_vec(),
            self.identity.address.clone(),
            self.params.levels,
            self.params.max_shards,
            self.hasher.as_ref(),
        ) {
            Ok(tx) => tx,
            Err(err) => {
                // Top-of-range digest; count the trial as failed.
                warn!(node = self.num_id(), %err, "transaction identifier rejected");
                let trial = TransactionLog {
                    authenticated: false,
                    sound: false,
                    correct: false,
                    has_balance: false,
                    successful: false,
                    per_validator: started.elapsed(),
                };
                return Ok((trial, None));
            }
        };

        let authenticated = true;
        let sound = tx.shard_id() == ShardId(self.num_id() % self.params.max_shards);
        // Adversarial nodes issue payloads that fail the content check.
        let correct = self.mode == Mode::Honest;
        let has_balance = self.view.balance(self.num_id())? > 0;
        let successful = authenticated && sound && correct && has_balance;

        let elapsed = started.elapsed();
        let per_validator = elapsed / self.params.validators.max(1);

        Ok((
            TransactionLog {
                authenticated,
                sound,
                correct,
                has_balance,
                successful,
                per_validator,
            },
            successful.then_some(tx),
        ))
    }

    /// One mining attempt over the round's candidate set.
    fn try_mine(
        &self,
        candidates: Vec<Transaction>,
        round_started: Instant,
        found_tx_in: Duration,
        rng: &mut ChaCha8Rng,
    ) -> MineAttemptLog {
        let validation_started = Instant::now();

        if candidates.is_empty() {
            return MineAttemptLog {
                total: round_started.elapsed(),
                found_tx_in,
                validation: validation_started.elapsed(),
                successful: false,
            };
        }

        let (prev, index) = {
            let head = self.head.lock();
            (
                head.id.map(PrevAddress::Block).unwrap_or(PrevAddress::Genesis),
                head.next_index,
            )
        };

        let block = Block::new(
            prev,
            self.num_id(),
            self.identity.address.clone(),
            candidates,
            index,
            self.params.levels,
            self.params.max_shards,
            self.hasher.as_ref(),
        );

        let successful = match block {
            Ok(mut block) => {
                let mut sig = [0u8; 8];
                rng.fill(&mut sig);
                block.add_signature(SignedBytes(sig.to_vec()));

                let mut head = self.head.lock();
                head.id = Some(block.num_id());
                head.next_index = index + 1;
                drop(head);

                self.view
                    .update_last_block(self.num_id(), block.num_id(), self.shard_id());
                true
            }
            Err(err) => {
                warn!(node = self.num_id(), %err, "block identifier rejected");
                false
            }
        };

        MineAttemptLog {
            total: round_started.elapsed(),
            found_tx_in,
            validation: validation_started.elapsed(),
            successful,
        }
    }
}

impl LedgerNode for LocalNode {
    fn insert_genesis(&self) -> Result<Block, NodeError> {
        if !self.is_introducer() {
            return Err(NodeError::NotIntroducer {
                num_id: self.num_id(),
            });
        }
        let block = Block::genesis(
            self.num_id(),
            self.identity.address.clone(),
            self.params.levels,
            self.params.max_shards,
            self.hasher.as_ref(),
        )?;
        Ok(block)
    }

    fn log_level(&self, level: u32) {
        self.log_level.store(level, Ordering::Relaxed);
    }

    fn insert_flag_node(&self, block: &Block, shard: ShardId) -> Result<(), NodeError> {
        let mut head = self.head.lock();
        head.id = Some(block.num_id());
        head.next_index = block.index + 1;
        drop(head);

        self.view
            .update_last_block(self.num_id(), block.num_id(), shard);
        Ok(())
    }

    fn run_simulation(
        &self,
        iterations: u64,
        pace: Duration,
        cancel: &CancellationToken,
    ) -> Result<SimLog, NodeError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut log = SimLog::new(self.mode);

        for round in 0..iterations {
            if cancel.is_cancelled() {
                return Err(NodeError::Cancelled);
            }

            let round_started = Instant::now();

            let (trial, candidate) = self.try_transaction(&mut rng)?;
            log.record_transaction(trial);
            let found_tx_in = round_started.elapsed();

            let attempt = self.try_mine(
                candidate.into_iter().collect(),
                round_started,
                found_tx_in,
                &mut rng,
            );
            if attempt.successful {
                self.view.update_state(self.num_id(), round as i64 + 1);
            }
            log.record_mine_attempt(attempt);

            if self.log_level.load(Ordering::Relaxed) > 0 {
                trace!(node = self.num_id(), round, "round complete");
            }

            if !pace.is_zero() && round + 1 < iterations {
                std::thread::sleep(pace);
            }
        }

        Ok(log)
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

impl Drop for LocalNode {
    fn drop(&mut self) {
        self.ports.release(self.port);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightchain_types::Blake3Hasher;

    fn node(port: u16, mode: Mode, ports: &Arc<PortRegistry>) -> LocalNode {
        LocalNode::register(
            NodeParams::default(),
            port,
            NodeRole::Introducer { shard: ShardId(0) },
            mode,
            port as u64,
            Arc::new(LedgerView::new()),
            Arc::clone(ports),
            Arc::new(Blake3Hasher),
        )
        .unwrap()
    }

    #[test]
    fn test_register_claims_port() {
        let ports = Arc::new(PortRegistry::new());
        let _node = node(4100, Mode::Honest, &ports);

        let err = LocalNode::register(
            NodeParams::default(),
            4100,
            NodeRole::Introducer { shard: ShardId(1) },
            Mode::Honest,
            1,
            Arc::new(LedgerView::new()),
            Arc::clone(&ports),
            Arc::new(Blake3Hasher),
        )
        .err()
        .unwrap();
        assert!(matches!(err, NodeError::PortInUse(4100)));
    }

    #[test]
    fn test_introducer_pinned_to_shard() {
        let ports = Arc::new(PortRegistry::new());
        for shard in 0u64..2 {
            let n = LocalNode::register(
                NodeParams::default(),
                4200 + shard as u16,
                NodeRole::Introducer { shard: ShardId(shard) },
                Mode::Honest,
                shard,
                Arc::new(LedgerView::new()),
                Arc::clone(&ports),
                Arc::new(Blake3Hasher),
            )
            .unwrap();
            assert_eq!(n.shard_id(), ShardId(shard));
            assert!(n.is_introducer());
        }
    }

    #[test]
    fn test_drop_releases_port() {
        let ports = Arc::new(PortRegistry::new());
        {
            let _node = node(4101, Mode::Honest, &ports);
            assert_eq!(ports.len(), 1);
        }
        assert!(ports.is_empty());
    }

    #[test]
    fn test_member_cannot_insert_genesis() {
        let ports = Arc::new(PortRegistry::new());
        let member = LocalNode::register(
            NodeParams::default(),
            4102,
            NodeRole::Member {
                introducer: "127.0.0.1:4100".to_owned(),
            },
            Mode::Honest,
            1,
            Arc::new(LedgerView::new()),
            ports,
            Arc::new(Blake3Hasher),
        )
        .unwrap();
        assert!(matches!(
            member.insert_genesis(),
            Err(NodeError::NotIntroducer { .. })
        ));
    }

    #[test]
    fn test_genesis_lands_on_own_shard() {
        let ports = Arc::new(PortRegistry::new());
        let introducer = node(4103, Mode::Honest, &ports);
        let block = introducer.insert_genesis().unwrap();
        assert_eq!(block.shard_id(), introducer.shard_id());
        assert_eq!(block.owner, introducer.num_id());
    }

    #[test]
    fn test_honest_run_records_every_round() {
        let ports = Arc::new(PortRegistry::new());
        let n = node(4104, Mode::Honest, &ports);
        let genesis = n.insert_genesis().unwrap();
        n.insert_flag_node(&genesis, n.shard_id()).unwrap();

        let cancel = CancellationToken::new();
        let log = n.run_simulation(5, Duration::ZERO, &cancel).unwrap();

        assert_eq!(log.total_transaction_trials(), 5);
        assert_eq!(log.valid_transaction_trials(), 5);
        assert_eq!(log.valid_mine_attempts().len(), 5);
        assert!(log.failed_mine_attempts().is_empty());
    }

    #[test]
    fn test_adversarial_run_fails_validation() {
        let ports = Arc::new(PortRegistry::new());
        let n = node(4105, Mode::Adversarial, &ports);

        let cancel = CancellationToken::new();
        let log = n.run_simulation(4, Duration::ZERO, &cancel).unwrap();

        assert_eq!(log.total_transaction_trials(), 4);
        assert_eq!(log.valid_transaction_trials(), 0);
        assert!(log.failed_transactions().iter().all(|t| !t.correct));
        // No valid candidates means no block is ever mined.
        assert!(log.valid_mine_attempts().is_empty());
    }

    #[test]
    fn test_cancelled_run_bails_out() {
        let ports = Arc::new(PortRegistry::new());
        let n = node(4106, Mode::Honest, &ports);

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            n.run_simulation(10, Duration::ZERO, &cancel),
            Err(NodeError::Cancelled)
        ));
    }

    #[test]
    fn test_mining_advances_view_head() {
        let ports = Arc::new(PortRegistry::new());
        let view = Arc::new(LedgerView::new());
        let n = LocalNode::register(
            NodeParams::default(),
            4107,
            NodeRole::Introducer { shard: ShardId(0) },
            Mode::Honest,
            7,
            Arc::clone(&view),
            ports,
            Arc::new(Blake3Hasher),
        )
        .unwrap();

        let cancel = CancellationToken::new();
        n.run_simulation(3, Duration::ZERO, &cancel).unwrap();
        assert!(view.last_block(n.num_id(), n.shard_id()).is_ok());
    }
}
