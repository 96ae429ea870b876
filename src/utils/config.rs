//! Application configuration constants.
//! Tuning and defaults in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// CLI settings file looked up in the working directory (e.g. `.taskyard.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Worker pool sizing ----

/// Pool size guidance. Policy only: the dispatcher accepts any size >= 1.
pub struct PoolSize;

impl PoolSize {
    /// I/O-bound work spends its time waiting, so run far more workers than cores.
    pub const IO_BOUND: usize = 50;

    /// CPU-bound work: one worker per available thread (from rayon).
    pub fn cpu_bound() -> usize {
        rayon::current_num_threads().max(1)
    }

    pub fn io_bound() -> usize {
        Self::IO_BOUND
    }
}

// ---- Dispatcher ----

/// Bytes per chunk when reading a byte source.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Loop iterations per chunk for the CPU-bound demo task.
pub const CPU_TASK_ITERATIONS: usize = 1_000_000;

/// Simulated latency per chunk for the I/O-bound demo task.
pub const IO_TASK_LATENCY: Duration = Duration::from_millis(50);

// ---- Watcher ----

pub const DEFAULT_WATCH_INTERVAL_MS: u64 = 500;

/// Simulated cleanup time for the CLI watcher (e.g. closing a connection).
pub const WATCH_CLEANUP_DELAY: Duration = Duration::from_millis(250);
