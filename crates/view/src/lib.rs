//! Shared concurrent ledger view.
//!
//! One `LedgerView` is shared by every node task in a run. It is the
//! single source of truth for node-visible chain state: the latest block
//! per node per shard, and each node's consensus state, balance and mode.
//!
//! The four maps are logically independent. Different protocol phases
//! update different fields at different times, so there is no cross-map
//! transaction: each operation is individually atomic and nothing more.

use dashmap::DashMap;
use lightchain_types::{Identifier, ShardId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Whether a node follows the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Follows the protocol.
    Honest,
    /// Issues transactions that fail validation.
    Adversarial,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Honest => f.write_str("honest"),
            Mode::Adversarial => f.write_str("adversarial"),
        }
    }
}

/// Errors from ledger view reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    /// The requested entry was never written.
    ///
    /// Reads never default: use the `has_*_entry` probes to test for
    /// presence without failing.
    #[error("no view entry for node {num_id}")]
    NotFound {
        /// numID of the missing entry.
        num_id: u64,
    },
}

/// Concurrent per-node state store.
#[derive(Debug, Default)]
pub struct LedgerView {
    /// Latest block per node, partitioned by shard.
    last_block: DashMap<(ShardId, u64), Identifier>,
    /// Nodes with at least one last-block entry in any shard, so the
    /// presence probe stays O(1) instead of scanning the partitions.
    last_block_nodes: DashMap<u64, ()>,
    state: DashMap<u64, i64>,
    balance: DashMap<u64, i64>,
    mode: DashMap<u64, Mode>,
}

impl LedgerView {
    /// Create an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the latest block of `num_id` in `shard`'s partition.
    pub fn update_last_block(&self, num_id: u64, block_id: Identifier, shard: ShardId) {
        self.last_block.insert((shard, num_id), block_id);
        self.last_block_nodes.insert(num_id, ());
    }

    /// Latest block of `num_id` in `shard`'s partition.
    pub fn last_block(&self, num_id: u64, shard: ShardId) -> Result<Identifier, ViewError> {
        self.last_block
            .get(&(shard, num_id))
            .map(|entry| *entry)
            .ok_or(ViewError::NotFound { num_id })
    }

    /// Upsert the consensus state of `num_id`.
    pub fn update_state(&self, num_id: u64, state: i64) {
        self.state.insert(num_id, state);
    }

    /// Consensus state of `num_id`.
    pub fn state(&self, num_id: u64) -> Result<i64, ViewError> {
        self.state
            .get(&num_id)
            .map(|entry| *entry)
            .ok_or(ViewError::NotFound { num_id })
    }

    /// Upsert the balance of `num_id`.
    pub fn update_balance(&self, num_id: u64, balance: i64) {
        self.balance.insert(num_id, balance);
    }

    /// Balance of `num_id`.
    pub fn balance(&self, num_id: u64) -> Result<i64, ViewError> {
        self.balance
            .get(&num_id)
            .map(|entry| *entry)
            .ok_or(ViewError::NotFound { num_id })
    }

    /// Upsert the mode of `num_id`.
    pub fn update_mode(&self, num_id: u64, mode: Mode) {
        self.mode.insert(num_id, mode);
    }

    /// Mode of `num_id`.
    pub fn mode(&self, num_id: u64) -> Result<Mode, ViewError> {
        self.mode
            .get(&num_id)
            .map(|entry| *entry)
            .ok_or(ViewError::NotFound { num_id })
    }

    /// Whether any shard partition holds a last-block entry for `num_id`.
    pub fn has_last_block_entry(&self, num_id: u64) -> bool {
        self.last_block_nodes.contains_key(&num_id)
    }

    /// Whether a consensus-state entry exists for `num_id`.
    pub fn has_state_entry(&self, num_id: u64) -> bool {
        self.state.contains_key(&num_id)
    }

    /// Whether a balance entry exists for `num_id`.
    pub fn has_balance_entry(&self, num_id: u64) -> bool {
        self.balance.contains_key(&num_id)
    }

    /// Whether a mode entry exists for `num_id`.
    pub fn has_mode_entry(&self, num_id: u64) -> bool {
        self.mode.contains_key(&num_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn id(value: u64) -> Identifier {
        Identifier::new(value, 8).unwrap()
    }

    #[test]
    fn test_read_after_write() {
        let view = LedgerView::new();
        view.update_last_block(7, id(42), ShardId(1));
        view.update_state(7, 3);
        view.update_balance(7, 100);
        view.update_mode(7, Mode::Honest);

        assert_eq!(view.last_block(7, ShardId(1)).unwrap(), id(42));
        assert_eq!(view.state(7).unwrap(), 3);
        assert_eq!(view.balance(7).unwrap(), 100);
        assert_eq!(view.mode(7).unwrap(), Mode::Honest);
    }

    #[test]
    fn test_unwritten_reads_fail() {
        let view = LedgerView::new();
        assert_eq!(
            view.last_block(7, ShardId(0)),
            Err(ViewError::NotFound { num_id: 7 })
        );
        assert_eq!(view.state(7), Err(ViewError::NotFound { num_id: 7 }));
        assert_eq!(view.balance(7), Err(ViewError::NotFound { num_id: 7 }));
        assert_eq!(view.mode(7), Err(ViewError::NotFound { num_id: 7 }));
    }

    #[test]
    fn test_last_block_partitioned_by_shard() {
        let view = LedgerView::new();
        view.update_last_block(7, id(42), ShardId(1));
        // Same numID, different shard partition: still absent.
        assert!(view.last_block(7, ShardId(0)).is_err());
    }

    #[test]
    fn test_probes_never_fail() {
        let view = LedgerView::new();
        assert!(!view.has_last_block_entry(7));
        assert!(!view.has_state_entry(7));
        assert!(!view.has_balance_entry(7));
        assert!(!view.has_mode_entry(7));

        view.update_last_block(7, id(42), ShardId(2));
        view.update_mode(7, Mode::Adversarial);
        assert!(view.has_last_block_entry(7));
        assert!(view.has_mode_entry(7));
    }

    #[test]
    fn test_last_block_probe_sees_every_shard_partition() {
        let view = LedgerView::new();
        view.update_last_block(1, id(10), ShardId(0));
        view.update_last_block(2, id(20), ShardId(3));
        view.update_last_block(2, id(21), ShardId(5));

        assert!(view.has_last_block_entry(1));
        assert!(view.has_last_block_entry(2));
        assert!(!view.has_last_block_entry(3));
        // The probe tracks nodes, not partitions: a second shard entry
        // for the same node changes nothing.
        assert_eq!(view.last_block(2, ShardId(5)).unwrap(), id(21));
    }

    #[test]
    fn test_upsert_overwrites() {
        let view = LedgerView::new();
        view.update_balance(7, 100);
        view.update_balance(7, 50);
        assert_eq!(view.balance(7).unwrap(), 50);
    }

    #[test]
    fn test_concurrent_disjoint_updates_all_persist() {
        let view = Arc::new(LedgerView::new());
        let mut handles = Vec::new();

        for worker in 0u64..8 {
            let view = Arc::clone(&view);
            handles.push(std::thread::spawn(move || {
                for i in 0..100u64 {
                    let num_id = worker * 100 + i;
                    view.update_balance(num_id, num_id as i64);
                    view.update_state(num_id, 1);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        for num_id in 0u64..800 {
            assert_eq!(view.balance(num_id).unwrap(), num_id as i64);
            assert_eq!(view.state(num_id).unwrap(), 1);
        }
    }
}
