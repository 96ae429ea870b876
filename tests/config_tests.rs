use clap::Parser;
use std::time::Duration;
use taskyard::RunOpts;
use taskyard::engine::{Cli, Commands, TaskMode, task_bytes, task_io};
use taskyard::utils::config::PoolSize;
use taskyard::utils::{apply_file_to_opts, parse_taskyard_toml};

// --- .taskyard.toml ---

#[test]
fn test_file_settings_override_defaults() {
    let file = parse_taskyard_toml(
        r#"
[settings]
mode = "io"
pool = 12
chunk_size = 4096
timeout = 1.5
interval_ms = 250
verbose = true
"#,
    )
    .expect("valid settings");

    let mut opts = RunOpts::default();
    apply_file_to_opts(&file, &mut opts);
    assert_eq!(opts.mode, TaskMode::Io);
    assert_eq!(opts.pool_size, Some(12));
    assert_eq!(opts.effective_pool_size(), 12);
    assert_eq!(opts.chunk_size, 4096);
    assert_eq!(opts.timeout, Some(Duration::from_millis(1500)));
    assert_eq!(opts.interval, Duration::from_millis(250));
    assert!(opts.verbose);
    assert!(!opts.json);
}

#[test]
fn test_missing_fields_keep_defaults() {
    let file = parse_taskyard_toml("[settings]\nmode = \"bytes\"\n").unwrap();
    let mut opts = RunOpts::default();
    apply_file_to_opts(&file, &mut opts);
    assert_eq!(opts.mode, TaskMode::Bytes);
    assert_eq!(opts.pool_size, None);
    assert_eq!(opts.chunk_size, RunOpts::default().chunk_size);
    assert_eq!(opts.timeout, None);
}

#[test]
fn test_empty_file_is_valid() {
    let file = parse_taskyard_toml("").unwrap();
    let mut opts = RunOpts::default();
    apply_file_to_opts(&file, &mut opts);
    assert_eq!(opts.mode, TaskMode::Cpu);
}

#[test]
fn test_invalid_file_is_ignored() {
    assert!(parse_taskyard_toml("[settings]\nmode = \"quantum\"\n").is_none());
    assert!(parse_taskyard_toml("not toml at all [").is_none());
}

#[test]
fn test_non_positive_timeout_ignored() {
    let file = parse_taskyard_toml("[settings]\ntimeout = 0\n").unwrap();
    let mut opts = RunOpts::default();
    apply_file_to_opts(&file, &mut opts);
    assert_eq!(opts.timeout, None);
}

// --- pool size policy ---

#[test]
fn test_default_pool_size_by_mode() {
    assert_eq!(TaskMode::Io.default_pool_size(), PoolSize::IO_BOUND);
    assert_eq!(TaskMode::Cpu.default_pool_size(), PoolSize::cpu_bound());
    assert!(PoolSize::cpu_bound() >= 1);
}

// --- demo tasks ---

#[test]
fn test_demo_tasks() {
    assert_eq!(task_bytes(vec![0; 17]), 17);
    assert_eq!(task_io(Vec::new()), 1);
    assert_eq!((TaskMode::Bytes.task_fn())(vec![1, 2, 3]), 3);
}

// --- command line ---

#[test]
fn test_watch_interval_must_be_positive() {
    assert!(Cli::try_parse_from(["taskyard", "watch", "--interval", "0"]).is_err());

    let cli = Cli::try_parse_from(["taskyard", "watch", "--interval", "25"]).unwrap();
    match cli.command {
        Commands::Watch(args) => assert_eq!(args.interval, Some(25)),
        _ => panic!("expected the watch subcommand"),
    }
}
