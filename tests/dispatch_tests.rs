use crossbeam_channel::unbounded;
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use taskyard::dispatch::ReadChunks;
use taskyard::{
    CancelReason, Context, DispatchError, Dispatcher, Outcome, merge_and_dispatch, run,
};

/// Reader that returns `chunks` reads of `b"xyz"`, then fails.
struct FailingReader {
    chunks: usize,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.chunks == 0 {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "boom"));
        }
        self.chunks -= 1;
        let n = buf.len().min(3);
        buf[..n].copy_from_slice(&b"xyz"[..n]);
        Ok(n)
    }
}

/// Reader that is interrupted before every successful read.
struct InterruptedReader {
    inner: Cursor<Vec<u8>>,
    interrupt_next: bool,
}

impl Read for InterruptedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.interrupt_next = !self.interrupt_next;
        if self.interrupt_next {
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        self.inner.read(buf)
    }
}

fn count_one(_chunk: Vec<u8>) -> i64 {
    1
}

// --- end to end ---

#[test]
fn test_end_to_end_three_items_pool_two() {
    let items = vec!["a", "b", "c"].into_iter().map(Ok::<_, io::Error>);
    let report = Dispatcher::new(2).run_items(items, |_s: &str| 1);
    assert!(report.is_completed(), "outcome: {}", report.outcome);
    assert_eq!(report.total, 3);
    assert_eq!(report.processed, 3);
}

#[test]
fn test_end_to_end_reader_one_byte_chunks() {
    let report = Dispatcher::new(2)
        .chunk_size(1)
        .run_reader(Cursor::new(b"abc".to_vec()), count_one);
    assert_eq!(report.into_result().unwrap(), 3);
}

// --- conservation / pool-size invariance ---

#[test]
fn test_conservation_k_chunks() {
    let data = vec![7u8; 10 * 1024];
    let report = run(Cursor::new(data), count_one, 3);
    assert!(report.is_completed());
    assert_eq!(report.total, 10);
}

#[test]
fn test_pool_size_invariance() {
    let data: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    let sum_bytes = |chunk: Vec<u8>| chunk.iter().map(|b| *b as i64).sum::<i64>();
    let expected: i64 = data.iter().map(|b| *b as i64).sum();

    for pool_size in [1, 4, 50] {
        let report = Dispatcher::new(pool_size)
            .chunk_size(333)
            .run_reader(Cursor::new(data.clone()), sum_bytes);
        assert!(report.is_completed());
        assert_eq!(report.total, expected, "pool size {}", pool_size);
        assert_eq!(report.pool_size, pool_size);
    }
}

#[test]
fn test_empty_source_completes_with_zero() {
    let report = run(io::empty(), count_one, 4);
    assert!(report.is_completed());
    assert_eq!(report.total, 0);
    assert_eq!(report.processed, 0);
}

#[test]
fn test_queue_capacity_smaller_than_pool() {
    let items = (0..200).map(Ok::<i64, io::Error>);
    let report = Dispatcher::new(8).queue_capacity(1).run_items(items, |v| v);
    assert_eq!(report.into_result().unwrap(), (0..200).sum::<i64>());
}

// --- error propagation ---

#[test]
fn test_source_error_is_reported_with_partial_total() {
    let report = Dispatcher::new(4).run_reader(FailingReader { chunks: 5 }, count_one);
    assert_eq!(report.total, 5);
    match &report.outcome {
        Outcome::Failed(DispatchError::SourceRead(e)) => {
            let io_err = e.downcast_ref::<io::Error>().expect("io error source");
            assert_eq!(io_err.kind(), io::ErrorKind::ConnectionReset);
        }
        other => panic!("expected source read failure, got {}", other),
    }
    assert!(matches!(
        report.into_result(),
        Err(DispatchError::SourceRead(_))
    ));
}

#[test]
fn test_source_error_on_first_read() {
    let report = run(FailingReader { chunks: 0 }, count_one, 2);
    assert_eq!(report.total, 0);
    assert!(matches!(
        report.outcome,
        Outcome::Failed(DispatchError::SourceRead(_))
    ));
}

#[test]
fn test_interrupted_reads_are_retried() {
    let reader = InterruptedReader {
        inner: Cursor::new(vec![1u8; 4096]),
        interrupt_next: false,
    };
    let report = Dispatcher::new(2).chunk_size(1024).run_reader(reader, count_one);
    assert_eq!(report.into_result().unwrap(), 4);
}

#[test]
fn test_zero_pool_size_rejected() {
    let report = run(Cursor::new(b"abc".to_vec()), count_one, 0);
    assert!(matches!(
        report.outcome,
        Outcome::Failed(DispatchError::InvalidPoolSize)
    ));
    assert_eq!(report.total, 0);
}

#[test]
fn test_zero_chunk_size_rejected() {
    let calls = AtomicUsize::new(0);
    let report = Dispatcher::new(2)
        .chunk_size(0)
        .run_reader(Cursor::new(vec![0u8; 64]), |_chunk: Vec<u8>| {
            calls.fetch_add(1, Ordering::Relaxed);
            1
        });
    assert!(matches!(
        report.outcome,
        Outcome::Failed(DispatchError::InvalidChunkSize)
    ));
    assert_eq!(report.total, 0);
    assert_eq!(report.processed, 0);
    assert_eq!(calls.load(Ordering::Relaxed), 0);
}

#[test]
fn test_worker_panic_is_reported() {
    let items = (0..20).map(Ok::<i64, io::Error>);
    let report = Dispatcher::new(4).run_items(items, |v| {
        if v == 7 {
            panic!("task failed on purpose");
        }
        1
    });
    assert!(matches!(
        report.outcome,
        Outcome::Failed(DispatchError::WorkerPanicked { count: 1 })
    ));
    assert_eq!(report.total, 19);
}

// --- cancellation ---

#[test]
fn test_timeout_cancels_run() {
    let (ctx, _cancel) = Context::with_timeout(&Context::background(), Duration::from_millis(100));
    let items = (0..1000).map(Ok::<i64, io::Error>);
    let report = Dispatcher::new(2).context(ctx).run_items(items, |_| {
        thread::sleep(Duration::from_millis(20));
        1
    });
    assert!(matches!(
        report.outcome,
        Outcome::Canceled(CancelReason::DeadlineExceeded)
    ));
    assert!(report.processed < 1000);
    assert_eq!(report.total, report.processed as i64);
    assert!(matches!(
        report.into_result(),
        Err(DispatchError::Canceled(CancelReason::DeadlineExceeded))
    ));
}

#[test]
fn test_already_canceled_context() {
    let (ctx, cancel) = Context::with_cancel(&Context::background());
    cancel.cancel();
    let report = Dispatcher::new(3)
        .context(ctx)
        .run_reader(Cursor::new(vec![0u8; 8192]), count_one);
    assert!(matches!(
        report.outcome,
        Outcome::Canceled(CancelReason::Canceled)
    ));
}

// --- streams and progress ---

#[test]
fn test_merged_streams_feed_dispatcher() -> anyhow::Result<()> {
    let (tx1, rx1) = unbounded();
    let (tx2, rx2) = unbounded();
    let p1 = thread::spawn(move || {
        for v in 1..=50 {
            tx1.send(v).unwrap();
        }
    });
    let p2 = thread::spawn(move || {
        for v in 51..=100 {
            tx2.send(v).unwrap();
        }
    });

    let report = merge_and_dispatch(vec![rx1, rx2], |v: i64| v, 4, &Context::background())?;
    p1.join().unwrap();
    p2.join().unwrap();
    assert_eq!(report.into_result()?, 5050);
    Ok(())
}

#[test]
fn test_progress_hook_counts_every_item() {
    let seen = Arc::new(AtomicUsize::new(0));
    let seen_hook = Arc::clone(&seen);
    let report = Dispatcher::new(4)
        .chunk_size(100)
        .on_progress(move |n| {
            seen_hook.fetch_add(n, Ordering::Relaxed);
        })
        .run_reader(Cursor::new(vec![0u8; 1000]), count_one);
    assert_eq!(report.total, 10);
    assert_eq!(seen.load(Ordering::Relaxed), 10);
}

// --- ReadChunks ---

#[test]
fn test_read_chunks_sizes() {
    let chunks: Vec<Vec<u8>> = ReadChunks::new(Cursor::new(vec![1u8; 2500]), 1024)
        .collect::<io::Result<_>>()
        .unwrap();
    let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![1024, 1024, 452]);
}

#[test]
fn test_read_chunks_clamps_zero_to_one_byte() {
    let chunks: Vec<Vec<u8>> = ReadChunks::new(Cursor::new(b"abc".to_vec()), 0)
        .collect::<io::Result<_>>()
        .unwrap();
    assert_eq!(chunks, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn test_read_chunks_stops_after_error() {
    let mut chunks = ReadChunks::new(FailingReader { chunks: 1 }, 16);
    assert_eq!(chunks.next().unwrap().unwrap(), b"xyz".to_vec());
    assert!(chunks.next().unwrap().is_err());
    assert!(chunks.next().is_none());
}
