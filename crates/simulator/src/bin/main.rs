//! LightChain Simulator CLI
//!
//! Bootstraps a sharded node population, seeds per-shard genesis
//! blocks, runs the mining/validation rounds shard by shard, and
//! writes the two CSV report tables.

use clap::Parser;
use lightchain_simulation::{LocalNodeFactory, SimulationContext, SimulationOrchestrator};
use lightchain_simulator::{MetricsReporter, SimulatorConfig};
use lightchain_types::Blake3Hasher;
use lightchain_view::LedgerView;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lightchain-sim")]
#[command(about = "Sharded LightChain simulator")]
#[command(version)]
struct Cli {
    /// Number of shards
    #[arg(long, default_value = "2")]
    shards: u64,

    /// Identifier width in bits
    #[arg(long, default_value = "16")]
    levels: u32,

    /// Total node population (the first `shards` nodes become introducers)
    #[arg(long, default_value = "8")]
    nodes: u64,

    /// Mining/validation rounds per node
    #[arg(long, default_value = "10")]
    iterations: u64,

    /// Delay between a node's rounds (e.g. "10ms", "1s")
    #[arg(long, default_value = "10ms")]
    pace: humantime::Duration,

    /// Probability that a node runs in adversarial mode (0.0 to 1.0)
    #[arg(long, default_value = "0.0")]
    adversary_ratio: f64,

    /// Random seed for deterministic node behavior
    #[arg(long, default_value = "12345")]
    seed: u64,

    /// Directory the report tables are written to
    #[arg(long, default_value = "reports")]
    reports_dir: PathBuf,

    /// Abort a shard batch that does not resolve within this bound
    /// (e.g. "30s"); unbounded when absent
    #[arg(long)]
    batch_timeout: Option<humantime::Duration>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let config = SimulatorConfig::new(cli.shards, cli.levels)
        .with_node_count(cli.nodes)
        .with_iterations(cli.iterations)
        .with_pace(*cli.pace)
        .with_adversary_ratio(cli.adversary_ratio)
        .with_seed(cli.seed);
    config.validate()?;

    let view = Arc::new(LedgerView::new());
    let ctx = Arc::new(SimulationContext::new());
    let factory = LocalNodeFactory::new(
        config.node_params(),
        Arc::clone(&view),
        Arc::clone(&ctx),
        Arc::new(Blake3Hasher),
        config.seed,
        config.adversary_ratio,
    );

    let mut orchestrator =
        SimulationOrchestrator::new(factory, ctx, config.max_shards, config.node_count);
    orchestrator.bootstrap().await?;

    let genesis = orchestrator.seed_genesis()?;
    info!(shards = genesis.len(), "genesis blocks seeded");

    let run = match cli.batch_timeout {
        Some(timeout) => {
            orchestrator
                .run_bounded(config.iterations, config.pace, *timeout)
                .await?
        }
        None => orchestrator.run(config.iterations, config.pace).await?,
    };

    let reporter = MetricsReporter::new(&cli.reports_dir);
    let paths = reporter.write_reports(&run.logs, config.iterations, run.node_count)?;

    info!(
        nodes = run.node_count,
        surviving = run.logs.len(),
        elapsed_ms = run.elapsed.as_millis() as u64,
        mine_report = %paths.mine_attempts.display(),
        tx_report = %paths.transactions.display(),
        "run complete"
    );
    Ok(())
}
