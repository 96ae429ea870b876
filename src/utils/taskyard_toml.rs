//! Load `.taskyard.toml` from a directory (CLI only). The library takes its settings from
//! [`DispatchOpts`](crate::dispatch::DispatchOpts) and friends.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::engine::tasks::TaskMode;
use crate::types::RunOpts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct TaskyardToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    mode: Option<TaskMode>,
    pool: Option<usize>,
    chunk_size: Option<usize>,
    /// Seconds.
    timeout: Option<f64>,
    interval_ms: Option<u64>,
    verbose: Option<bool>,
    json: Option<bool>,
}

/// Parse settings text. Errors are logged and yield None.
pub fn parse_taskyard_toml(s: &str) -> Option<TaskyardToml> {
    toml::from_str(s)
        .map_err(|e| log::warn!("{}: {}", PackagePaths::get().config_filename(), e))
        .ok()
}

/// Load the settings file from `dir` if present. Returns None if missing, unreadable, or invalid.
pub fn load_taskyard_toml(dir: &Path) -> Option<TaskyardToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_taskyard_toml(&s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($idx:expr, $opts:expr, $idx_field:ident => $opts_field:ident) => {
        if let Some(v) = $idx.$idx_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file settings to opts (only fields present in the file). Call before applying CLI flags.
pub fn apply_file_to_opts(file: &TaskyardToml, opts: &mut RunOpts) {
    let s = &file.settings;
    apply_file_opt!(s, opts, mode => mode);
    if let Some(pool) = s.pool {
        opts.pool_size = Some(pool);
    }
    apply_file_opt!(s, opts, chunk_size => chunk_size);
    if let Some(secs) = s.timeout
        && let Ok(timeout) = Duration::try_from_secs_f64(secs)
        && !timeout.is_zero()
    {
        opts.timeout = Some(timeout);
    }
    if let Some(ms) = s.interval_ms {
        opts.interval = Duration::from_millis(ms);
    }
    apply_file_opt!(s, opts, verbose => verbose);
    apply_file_opt!(s, opts, json => json);
}
