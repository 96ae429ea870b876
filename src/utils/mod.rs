pub mod config;
pub mod logger;
pub mod taskyard_toml;

pub use config::*;
pub use logger::setup_logging;
pub use taskyard_toml::{apply_file_to_opts, load_taskyard_toml, parse_taskyard_toml};
