//! LightChain Simulator
//!
//! Ties the pieces together for a full run: configuration, the
//! bootstrap/genesis/execution orchestration from
//! `lightchain-simulation`, and the metrics reporter that turns the
//! collected per-node logs into the two CSV report tables.
//!
//! # Example
//!
//! ```ignore
//! use lightchain_simulator::{MetricsReporter, SimulatorConfig};
//! use std::time::Duration;
//!
//! let config = SimulatorConfig::new(4, 16)
//!     .with_node_count(12)
//!     .with_iterations(20)
//!     .with_pace(Duration::from_millis(5));
//! config.validate()?;
//! # Ok::<(), lightchain_simulator::ConfigError>(())
//! ```

pub mod config;
pub mod report;

pub use config::{ConfigError, SimulatorConfig};
pub use report::{MetricsReporter, ReportError, ReportPaths};
