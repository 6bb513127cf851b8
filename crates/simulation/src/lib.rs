//! Simulation orchestrator.
//!
//! Drives a full run: bootstrap the node population (introducers first),
//! seed per-shard genesis blocks, then execute shard-batched concurrent
//! simulation rounds and collect per-node logs.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                 SimulationOrchestrator                    │
//! │                                                           │
//! │  bootstrap ──► introducers (one per shard) + members      │
//! │  seed_genesis ──► one genesis block per shard             │
//! │  run ──► for shard 0..=max_shards:                        │
//! │            spawn one blocking task per node in the shard  │
//! │            join the whole batch before the next shard     │
//! │          collect {peer → SimLog}                          │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Failures inside one node task are isolated at the task boundary:
//! logged, excluded from the result map, never propagated to siblings.

mod context;
mod error;
mod factory;
mod orchestrator;

pub use context::SimulationContext;
pub use error::SimulationError;
pub use factory::{LocalNodeFactory, NodeFactory};
pub use orchestrator::{SimulationOrchestrator, SimulationRun};
