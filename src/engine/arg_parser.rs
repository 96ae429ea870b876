use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use super::tasks::TaskMode;

/// Concurrent task-dispatch toolkit.
#[derive(Clone, Parser)]
#[command(name = "taskyard")]
#[command(about = "Run a bounded worker pool over a byte source, a periodic watcher, or a merge demo.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output.
    #[arg(long, short = 'v', global = true, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Split FILE (or stdin) into chunks and run a task over each chunk on a worker pool.
    Count(CountArgs),
    /// Run a periodic watcher until the duration elapses or Ctrl-C, then stop it cleanly.
    Watch(WatchArgs),
    /// Merge two producers that close at different times into one stream.
    MergeDemo,
}

#[derive(Clone, Args)]
pub struct CountArgs {
    /// Input file. Default: stdin.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Task run per chunk.
    #[arg(long, short = 'm', value_enum)]
    pub mode: Option<TaskMode>,

    /// Worker count. Default: available threads for cpu/bytes, 50 for io.
    #[arg(long, short = 'p')]
    pub pool: Option<usize>,

    /// Bytes per chunk.
    #[arg(long, short = 'c')]
    pub chunk_size: Option<usize>,

    /// Cancel the run after this many seconds.
    #[arg(long, short = 't', value_parser = clap::value_parser!(f64))]
    pub timeout: Option<f64>,

    /// Print the report as JSON.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub json: Option<bool>,
}

#[derive(Clone, Args)]
pub struct WatchArgs {
    /// Tick interval in milliseconds (at least 1).
    #[arg(long, short = 'i', value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Stop after this many seconds. Default: run until Ctrl-C.
    #[arg(long, short = 'd', value_parser = clap::value_parser!(f64))]
    pub duration: Option<f64>,
}
