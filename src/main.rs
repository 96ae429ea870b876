//! taskyard CLI: worker pool over a byte source, periodic watcher, merge demo.

use anyhow::Result;
use clap::Parser;
use std::time::Instant;
use taskyard::engine::arg_parser::Cli;
use taskyard::engine::handle_run;

fn main() -> Result<()> {
    let start_time = Instant::now();
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
