//! Configuration types for the simulator.

use lightchain_node::NodeParams;
use lightchain_types::Identifier;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors caught before a run starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `levels` outside the supported identifier width range.
    #[error("levels must be in 1..=63, got {levels}")]
    InvalidLevels {
        /// Configured width.
        levels: u32,
    },

    /// Shard count must be at least 1.
    #[error("max_shards must be at least 1")]
    ZeroShards,

    /// The identifier space cannot distinguish the shards.
    #[error("2^{levels} identifiers cannot cover {max_shards} shards")]
    ShardsExceedIdentifierSpace {
        /// Configured shard count.
        max_shards: u64,
        /// Configured width.
        levels: u32,
    },

    /// Every shard needs an introducer.
    #[error("node_count {node_count} is less than max_shards {max_shards}")]
    NotEnoughNodes {
        /// Configured population size.
        node_count: u64,
        /// Configured shard count.
        max_shards: u64,
    },
}

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Number of shards in the network.
    pub max_shards: u64,

    /// Identifier width in bits.
    pub levels: u32,

    /// Total node population (introducers included).
    pub node_count: u64,

    /// Simulated mining/validation rounds per node.
    pub iterations: u64,

    /// Delay between a node's rounds.
    pub pace: Duration,

    /// Probability that a node runs in adversarial mode.
    pub adversary_ratio: f64,

    /// Random seed for deterministic node behavior.
    pub seed: u64,
}

impl SimulatorConfig {
    /// Create a configuration for `max_shards` shards and `levels`-bit
    /// identifiers.
    pub fn new(max_shards: u64, levels: u32) -> Self {
        Self {
            max_shards,
            levels,
            node_count: max_shards * 4,
            iterations: 10,
            pace: Duration::from_millis(10),
            adversary_ratio: 0.0,
            seed: 12345,
        }
    }

    /// Set the total node population.
    pub fn with_node_count(mut self, node_count: u64) -> Self {
        self.node_count = node_count;
        self
    }

    /// Set the number of rounds per node.
    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the delay between rounds.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// Set the adversarial-node probability.
    pub fn with_adversary_ratio(mut self, ratio: f64) -> Self {
        self.adversary_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check the configuration is runnable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.levels == 0 || self.levels > Identifier::MAX_LEVELS {
            return Err(ConfigError::InvalidLevels { levels: self.levels });
        }
        if self.max_shards == 0 {
            return Err(ConfigError::ZeroShards);
        }
        if self.max_shards >= 1u64 << self.levels {
            return Err(ConfigError::ShardsExceedIdentifierSpace {
                max_shards: self.max_shards,
                levels: self.levels,
            });
        }
        if self.node_count < self.max_shards {
            return Err(ConfigError::NotEnoughNodes {
                node_count: self.node_count,
                max_shards: self.max_shards,
            });
        }
        Ok(())
    }

    /// Per-node parameters for this configuration.
    pub fn node_params(&self) -> NodeParams {
        NodeParams {
            levels: self.levels,
            max_shards: self.max_shards,
            ..NodeParams::default()
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::new(2, 16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        SimulatorConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_widths() {
        assert!(matches!(
            SimulatorConfig::new(2, 0).validate(),
            Err(ConfigError::InvalidLevels { levels: 0 })
        ));
        assert!(matches!(
            SimulatorConfig::new(2, 64).validate(),
            Err(ConfigError::InvalidLevels { levels: 64 })
        ));
    }

    #[test]
    fn test_rejects_shards_exceeding_space() {
        // 2^3 = 8 identifiers cannot cover 8 shards and leave entropy.
        assert!(matches!(
            SimulatorConfig::new(8, 3).validate(),
            Err(ConfigError::ShardsExceedIdentifierSpace { .. })
        ));
    }

    #[test]
    fn test_rejects_too_few_nodes() {
        let config = SimulatorConfig::new(4, 16).with_node_count(3);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotEnoughNodes { .. })
        ));
    }

    #[test]
    fn test_adversary_ratio_clamped() {
        let config = SimulatorConfig::default().with_adversary_ratio(2.0);
        assert_eq!(config.adversary_ratio, 1.0);
    }
}
