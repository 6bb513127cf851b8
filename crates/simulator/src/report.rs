//! Metrics reporter.
//!
//! Aggregates the per-node outcome logs of a run into two CSV tables,
//! written under a fixed reports directory. Writing the files is this
//! component's only externally observable effect; the tables are built
//! fully in memory first, so an I/O failure never invalidates computed
//! metrics.

use hdrhistogram::Histogram;
use lightchain_node::SimLog;
use lightchain_types::NetworkIdentity;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Mining-attempts report file name.
pub const MINE_ATTEMPTS_FILE: &str = "MineAttempts.csv";

/// Transaction-validation report file name.
pub const TRANSACTIONS_FILE: &str = "TransactionValidationAttempts.csv";

/// Errors from report writing.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Writing a report file failed.
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the two reports were written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// Path of the mining-attempts table.
    pub mine_attempts: PathBuf,
    /// Path of the transaction-validation table.
    pub transactions: PathBuf,
}

/// Turns collected `{node → SimLog}` maps into the two report tables.
pub struct MetricsReporter {
    dir: PathBuf,
}

impl MetricsReporter {
    /// Create a reporter writing under `dir` (created if absent,
    /// existing files overwritten).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write both report tables.
    ///
    /// `node_count` is the full bootstrapped population: nodes whose
    /// task failed are absent from `logs` but still count in the
    /// success-rate denominator.
    pub fn write_reports(
        &self,
        logs: &HashMap<NetworkIdentity, SimLog>,
        iterations: u64,
        node_count: u64,
    ) -> Result<ReportPaths, ReportError> {
        let mine = format_mine_attempts(logs, iterations, node_count);
        let transactions = format_transactions(logs, iterations, node_count);
        self.log_latency_summary(logs);

        fs::create_dir_all(&self.dir)?;
        let paths = ReportPaths {
            mine_attempts: self.dir.join(MINE_ATTEMPTS_FILE),
            transactions: self.dir.join(TRANSACTIONS_FILE),
        };
        fs::write(&paths.mine_attempts, mine)?;
        fs::write(&paths.transactions, transactions)?;
        info!(dir = %self.dir.display(), "reports written");
        Ok(paths)
    }

    fn log_latency_summary(&self, logs: &HashMap<NetworkIdentity, SimLog>) {
        let Ok(mut histogram) = Histogram::<u64>::new(3) else {
            return;
        };
        for log in logs.values() {
            for attempt in log
                .valid_mine_attempts()
                .iter()
                .chain(log.failed_mine_attempts())
            {
                histogram.saturating_record(attempt.total.as_micros() as u64);
            }
        }
        if histogram.is_empty() {
            return;
        }
        info!(
            attempts = histogram.len(),
            p50_us = histogram.value_at_quantile(0.5),
            p99_us = histogram.value_at_quantile(0.99),
            max_us = histogram.max(),
            "mining attempt latency"
        );
    }
}

fn sorted<'a>(
    logs: &'a HashMap<NetworkIdentity, SimLog>,
) -> Vec<(&'a NetworkIdentity, &'a SimLog)> {
    let mut entries: Vec<_> = logs.iter().collect();
    entries.sort_by_key(|(peer, _)| peer.num_id.value());
    entries
}

fn ms(duration: Duration) -> String {
    format!("{:.3}", duration.as_secs_f64() * 1000.0)
}

fn success_rate(successes: u64, iterations: u64, node_count: u64) -> f64 {
    let denominator = iterations * node_count;
    if denominator == 0 {
        return 0.0;
    }
    successes as f64 * 100.0 / denominator as f64
}

fn format_mine_attempts(
    logs: &HashMap<NetworkIdentity, SimLog>,
    iterations: u64,
    node_count: u64,
) -> String {
    let mut out = String::new();
    writeln!(out, "NumID,Mode,Total Time(ms),Found Tx In(ms),Validation Time(ms),Successful")
        .unwrap();

    let mut successes = 0u64;
    for (peer, log) in sorted(logs) {
        write!(out, "{},{}", peer.num_id.value(), log.mode()).unwrap();
        for attempt in log
            .valid_mine_attempts()
            .iter()
            .chain(log.failed_mine_attempts())
        {
            write!(
                out,
                ",{},{},{},{}",
                ms(attempt.total),
                ms(attempt.found_tx_in),
                ms(attempt.validation),
                attempt.successful
            )
            .unwrap();
        }
        writeln!(out).unwrap();
        successes += log.valid_mine_attempts().len() as u64;
    }

    writeln!(
        out,
        "Success Rate = {:.2}",
        success_rate(successes, iterations, node_count)
    )
    .unwrap();
    out
}

fn format_transactions(
    logs: &HashMap<NetworkIdentity, SimLog>,
    iterations: u64,
    node_count: u64,
) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "NumID,Mode,Trials,Successes,Authenticated,Sound,Correct,Has Balance,Successful,Timer Per Validator(ms)"
    )
    .unwrap();

    let mut successes = 0u64;
    for (peer, log) in sorted(logs) {
        write!(
            out,
            "{},{},{},{}",
            peer.num_id.value(),
            log.mode(),
            log.total_transaction_trials(),
            log.valid_transaction_trials()
        )
        .unwrap();
        for trial in log
            .valid_transactions()
            .iter()
            .chain(log.failed_transactions())
        {
            write!(
                out,
                ",{},{},{},{},{},{}",
                trial.authenticated,
                trial.sound,
                trial.correct,
                trial.has_balance,
                trial.successful,
                ms(trial.per_validator)
            )
            .unwrap();
        }
        writeln!(out).unwrap();
        successes += log.valid_transactions().len() as u64;
    }

    writeln!(
        out,
        "Success Rate = {:.2}",
        success_rate(successes, iterations, node_count)
    )
    .unwrap();
    out
}
