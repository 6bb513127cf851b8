//! Per-node simulation outcome records.

use lightchain_view::Mode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One mining attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MineAttemptLog {
    /// Wall time of the whole attempt.
    pub total: Duration,
    /// Time until a candidate transaction set was found.
    pub found_tx_in: Duration,
    /// Time spent validating the candidate set.
    pub validation: Duration,
    /// Whether the attempt produced a block.
    pub successful: bool,
}

/// One transaction validation trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLog {
    /// Signature check passed.
    pub authenticated: bool,
    /// The transaction sits on its owner's shard.
    pub sound: bool,
    /// The content payload checks out.
    pub correct: bool,
    /// The owner had balance to spend.
    pub has_balance: bool,
    /// All checks passed.
    pub successful: bool,
    /// Time each validator spent on the trial.
    pub per_validator: Duration,
}

/// Everything one node recorded over a simulation run.
///
/// Produced once per run by the node task and handed to the metrics
/// reporter, which takes ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimLog {
    valid_mine_attempts: Vec<MineAttemptLog>,
    failed_mine_attempts: Vec<MineAttemptLog>,
    valid_transactions: Vec<TransactionLog>,
    failed_transactions: Vec<TransactionLog>,
    total_transaction_trials: u64,
    valid_transaction_trials: u64,
    mode: Mode,
}

impl SimLog {
    /// Create an empty log for a node running in `mode`.
    pub fn new(mode: Mode) -> Self {
        Self {
            valid_mine_attempts: Vec::new(),
            failed_mine_attempts: Vec::new(),
            valid_transactions: Vec::new(),
            failed_transactions: Vec::new(),
            total_transaction_trials: 0,
            valid_transaction_trials: 0,
            mode,
        }
    }

    /// Record a mining attempt.
    pub fn record_mine_attempt(&mut self, attempt: MineAttemptLog) {
        if attempt.successful {
            self.valid_mine_attempts.push(attempt);
        } else {
            self.failed_mine_attempts.push(attempt);
        }
    }

    /// Record a transaction validation trial.
    pub fn record_transaction(&mut self, trial: TransactionLog) {
        self.total_transaction_trials += 1;
        if trial.successful {
            self.valid_transaction_trials += 1;
            self.valid_transactions.push(trial);
        } else {
            self.failed_transactions.push(trial);
        }
    }

    /// Successful mining attempts.
    pub fn valid_mine_attempts(&self) -> &[MineAttemptLog] {
        &self.valid_mine_attempts
    }

    /// Failed mining attempts.
    pub fn failed_mine_attempts(&self) -> &[MineAttemptLog] {
        &self.failed_mine_attempts
    }

    /// Successful transaction trials.
    pub fn valid_transactions(&self) -> &[TransactionLog] {
        &self.valid_transactions
    }

    /// Failed transaction trials.
    pub fn failed_transactions(&self) -> &[TransactionLog] {
        &self.failed_transactions
    }

    /// Total transaction trials attempted.
    pub fn total_transaction_trials(&self) -> u64 {
        self.total_transaction_trials
    }

    /// Transaction trials that validated.
    pub fn valid_transaction_trials(&self) -> u64 {
        self.valid_transaction_trials
    }

    /// The node's mode for the run.
    pub fn mode(&self) -> Mode {
        self.mode
    }
}
