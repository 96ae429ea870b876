//! CLI engine: argument parsing, command handlers, demo tasks, progress display.

pub mod arg_parser;
pub mod cli;
pub mod progress;
pub mod tasks;

pub use arg_parser::{Cli, Commands, CountArgs, WatchArgs};
pub use cli::handle_run;
pub use tasks::{TaskMode, task_bytes, task_cpu, task_io};
