//! Public and CLI-facing types.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::cancel::CancelReason;
use crate::engine::tasks::TaskMode;
use crate::error::DispatchError;

/// How a dispatcher run ended.
#[derive(Debug)]
pub enum Outcome {
    /// Source exhausted and every item processed.
    Completed,
    /// The context finished first. Items enqueued before that may or may not have run.
    Canceled(CancelReason),
    /// Source read failure, worker panic, or invalid options. Items already enqueued were
    /// still processed and are part of the total.
    Failed(DispatchError),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed => write!(f, "completed"),
            Outcome::Canceled(reason) => write!(f, "canceled: {}", reason),
            Outcome::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of a dispatcher run: the aggregate plus how the run ended.
#[derive(Debug)]
pub struct Report {
    /// Sum of every processed item's contribution.
    pub total: i64,
    /// Number of items the workers finished.
    pub processed: usize,
    pub pool_size: usize,
    pub outcome: Outcome,
}

impl Report {
    pub fn new(total: i64, processed: usize, pool_size: usize, outcome: Outcome) -> Self {
        Report {
            total,
            processed,
            pool_size,
            outcome,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, Outcome::Completed)
    }

    /// `Ok(total)` on completion; cancellation and failure become errors (the partial total is dropped).
    pub fn into_result(self) -> Result<i64, DispatchError> {
        match self.outcome {
            Outcome::Completed => Ok(self.total),
            Outcome::Canceled(reason) => Err(DispatchError::Canceled(reason)),
            Outcome::Failed(err) => Err(err),
        }
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            total: self.total,
            processed: self.processed,
            pool_size: self.pool_size,
            outcome: self.outcome.to_string(),
        }
    }
}

/// Serializable view of a [`Report`] (CLI `--json`).
#[derive(Clone, Debug, Serialize)]
pub struct ReportSummary {
    pub total: i64,
    pub processed: usize,
    pub pool_size: usize,
    pub outcome: String,
}

/// Resolved CLI options: defaults, then `.taskyard.toml`, then flags.
#[derive(Clone, Debug)]
pub struct RunOpts {
    pub mode: TaskMode,
    /// Worker count. When None, derived from `mode`.
    pub pool_size: Option<usize>,
    pub chunk_size: usize,
    pub timeout: Option<Duration>,
    pub interval: Duration,
    pub verbose: bool,
    pub json: bool,
}

impl Default for RunOpts {
    fn default() -> Self {
        RunOpts {
            mode: TaskMode::default(),
            pool_size: None,
            chunk_size: crate::utils::config::DEFAULT_CHUNK_SIZE,
            timeout: None,
            interval: Duration::from_millis(crate::utils::config::DEFAULT_WATCH_INTERVAL_MS),
            verbose: false,
            json: false,
        }
    }
}

impl RunOpts {
    pub fn effective_pool_size(&self) -> usize {
        self.pool_size.unwrap_or_else(|| self.mode.default_pool_size())
    }
}
