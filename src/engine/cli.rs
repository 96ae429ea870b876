//! CLI command handlers: count (dispatcher), watch (lifecycle), merge-demo (merger).

use anyhow::{Context as _, Result};
use crossbeam_channel::{after, never, select, unbounded};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{self, Read};
use std::thread;
use std::time::{Duration, Instant};

use crate::cancel::Context;
use crate::dispatch::Dispatcher;
use crate::engine::arg_parser::{Cli, Commands, CountArgs, WatchArgs};
use crate::engine::progress::{create_counter, progress_hook, refresh_bar};
use crate::lifecycle::Watcher;
use crate::merge::merge2;
use crate::types::RunOpts;
use crate::utils::config::WATCH_CLEANUP_DELAY;
use crate::utils::{apply_file_to_opts, load_taskyard_toml, setup_logging};

fn secs(v: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(v).ok().filter(|d| !d.is_zero())
}

/// Defaults, then `.taskyard.toml` in the working directory, then flags. Sets up logging.
fn setup_opts(cli: &Cli) -> RunOpts {
    let mut opts = RunOpts::default();
    let file = std::env::current_dir()
        .ok()
        .and_then(|dir| load_taskyard_toml(&dir));
    if let Some(ref file) = file {
        apply_file_to_opts(file, &mut opts);
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    match &cli.command {
        Commands::Count(args) => {
            if let Some(mode) = args.mode {
                opts.mode = mode;
            }
            if args.pool.is_some() {
                opts.pool_size = args.pool;
            }
            if let Some(chunk_size) = args.chunk_size {
                opts.chunk_size = chunk_size;
            }
            if let Some(t) = args.timeout {
                opts.timeout = secs(t);
            }
            if let Some(json) = args.json {
                opts.json = json;
            }
        }
        Commands::Watch(args) => {
            if let Some(ms) = args.interval {
                opts.interval = Duration::from_millis(ms);
            }
        }
        Commands::MergeDemo => {}
    }
    setup_logging(opts.verbose);
    if file.is_some() {
        debug!("Loaded settings file");
    }
    opts
}

/// Run the selected subcommand. Ctrl-C cancels the root context.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli);
    debug!("{:#?}", opts);

    let (root, cancel) = Context::with_cancel(&Context::background());
    ctrlc::set_handler(move || {
        warn!("Interrupt received, canceling");
        cancel.cancel();
    })
    .context("install Ctrl-C handler")?;

    match &cli.command {
        Commands::Count(args) => run_count(args, &opts, &root),
        Commands::Watch(args) => run_watch(args, &opts, &root),
        Commands::MergeDemo => run_merge_demo(),
    }
}

fn open_source(args: &CountArgs) -> Result<Box<dyn Read>> {
    match &args.file {
        Some(path) => {
            let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
            Ok(Box::new(f))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

fn run_count(args: &CountArgs, opts: &RunOpts, root: &Context) -> Result<()> {
    let source = open_source(args)?;
    let (ctx, cancel) = match opts.timeout {
        Some(timeout) => Context::with_timeout(root, timeout),
        None => Context::with_cancel(root),
    };

    let pool_size = opts.effective_pool_size();
    info!("Mode: {:?}, pool size: {}", opts.mode, pool_size);

    let mut dispatcher = Dispatcher::new(pool_size)
        .chunk_size(opts.chunk_size)
        .context(ctx);
    let bar = (opts.verbose && !opts.json).then(|| create_counter("Dispatching"));
    if let Some(ref bar) = bar {
        let hook = progress_hook(bar);
        dispatcher = dispatcher.on_progress(move |n| hook(n));
    }

    let start = Instant::now();
    let report = dispatcher.run_reader(source, opts.mode.task_fn());
    cancel.cancel();
    if let Some(ref bar) = bar {
        refresh_bar(bar);
        eprintln!();
    }
    debug!("Dispatch finished in {:?}", start.elapsed());

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report.summary())?);
    } else {
        println!(
            "total: {}  processed: {}  outcome: {}",
            report.total, report.processed, report.outcome
        );
    }
    report.into_result()?;
    Ok(())
}

fn run_watch(args: &WatchArgs, opts: &RunOpts, root: &Context) -> Result<()> {
    let mut watcher = Watcher::start(
        opts.interval,
        |n| info!("tick {}: watching", n),
        || {
            info!("Cleaning up watcher resources");
            thread::sleep(WATCH_CLEANUP_DELAY);
            info!("Cleanup complete");
        },
    )?;

    let deadline = match args.duration.and_then(secs) {
        Some(d) => after(d),
        None => never(),
    };
    let done = root.done();
    select! {
        recv(deadline) -> _ => info!("Duration elapsed, stopping watcher"),
        recv(done) -> _ => info!("Stopping watcher"),
    }

    watcher.stop()?;
    println!("watcher stopped after {} tick(s)", watcher.ticks());
    Ok(())
}

fn run_merge_demo() -> Result<()> {
    let (tx1, rx1) = unbounded::<i64>();
    let (tx2, rx2) = unbounded::<i64>();
    let merged = merge2(rx1, rx2).context("spawn merge thread")?;

    let p1 = thread::spawn(move || {
        for v in [1, 3, 5] {
            debug!("producer 1: sending {}", v);
            let _ = tx1.send(v);
            thread::sleep(Duration::from_millis(100));
        }
        debug!("producer 1: done");
    });
    let p2 = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        for v in [2, 4] {
            debug!("producer 2: sending {}", v);
            let _ = tx2.send(v);
            thread::sleep(Duration::from_millis(500));
        }
        debug!("producer 2: done");
    });

    for v in merged.iter() {
        println!("received {}", v);
    }
    println!("merged stream closed");

    p1.join()
        .map_err(|_| anyhow::anyhow!("producer 1 panicked"))?;
    p2.join()
        .map_err(|_| anyhow::anyhow!("producer 2 panicked"))?;
    Ok(())
}
