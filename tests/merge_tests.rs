use crossbeam_channel::{RecvTimeoutError, bounded, unbounded};
use std::collections::HashMap;
use std::thread;
use std::time::Duration;
use taskyard::{Merger, merge, merge2};

const WAIT: Duration = Duration::from_secs(5);

// --- completeness ---

#[test]
fn test_merge_two_streams_yields_every_item() -> anyhow::Result<()> {
    let (tx1, rx1) = unbounded();
    let (tx2, rx2) = unbounded();
    let merged = merge2(rx1, rx2)?;

    let p1 = thread::spawn(move || {
        for v in [1, 3, 5] {
            tx1.send(v).unwrap();
            thread::sleep(Duration::from_millis(5));
        }
    });
    let p2 = thread::spawn(move || {
        for v in [2, 4] {
            tx2.send(v).unwrap();
            thread::sleep(Duration::from_millis(7));
        }
    });

    let mut got: Vec<i32> = merged.iter().collect();
    p1.join().unwrap();
    p2.join().unwrap();
    got.sort();
    assert_eq!(got, vec![1, 2, 3, 4, 5]);
    Ok(())
}

#[test]
fn test_merge_preserves_order_within_each_stream() -> anyhow::Result<()> {
    const STREAMS: usize = 4;
    const PER_STREAM: usize = 500;

    let mut inputs = Vec::new();
    let mut producers = Vec::new();
    for s in 0..STREAMS {
        let (tx, rx) = bounded(3);
        inputs.push(rx);
        producers.push(thread::spawn(move || {
            for i in 0..PER_STREAM {
                tx.send((s, i)).unwrap();
            }
        }));
    }

    let merged = merge(inputs)?;
    let mut last_seen: HashMap<usize, usize> = HashMap::new();
    let mut count = 0;
    for (s, i) in merged.iter() {
        if let Some(prev) = last_seen.get(&s) {
            assert!(i > *prev, "stream {} went backwards: {} after {}", s, i, prev);
        } else {
            assert_eq!(i, 0);
        }
        last_seen.insert(s, i);
        count += 1;
    }
    for p in producers {
        p.join().unwrap();
    }

    assert_eq!(count, STREAMS * PER_STREAM);
    for s in 0..STREAMS {
        assert_eq!(last_seen[&s], PER_STREAM - 1);
    }
    Ok(())
}

#[test]
fn test_merge_forwards_items_buffered_before_close() -> anyhow::Result<()> {
    let (tx1, rx1) = unbounded();
    let (tx2, rx2) = unbounded();
    for v in 0..10 {
        tx1.send(v).unwrap();
    }
    drop(tx1);
    tx2.send(100).unwrap();
    drop(tx2);

    let handle = Merger::new().spawn(vec![rx1, rx2])?;
    let got: Vec<i32> = handle.receiver().iter().collect();
    let stats = handle.join()?;

    assert_eq!(got.len(), 11);
    assert_eq!(stats.forwarded, vec![10, 1]);
    assert_eq!(stats.total(), 11);
    assert!(!stats.consumer_gone);
    Ok(())
}

// --- no premature close ---

#[test]
fn test_merge_stays_open_while_one_input_is_open() {
    let (tx1, rx1) = unbounded::<i32>();
    let (tx2, rx2) = unbounded::<i32>();
    let merged = merge2(rx1, rx2).unwrap();

    drop(tx1);
    // tx2 is open but idle: the output must time out, not disconnect.
    assert_eq!(
        merged.recv_timeout(Duration::from_millis(150)),
        Err(RecvTimeoutError::Timeout)
    );

    tx2.send(7).unwrap();
    assert_eq!(merged.recv_timeout(WAIT), Ok(7));

    drop(tx2);
    assert_eq!(
        merged.recv_timeout(WAIT),
        Err(RecvTimeoutError::Disconnected)
    );
}

// --- empty input ---

#[test]
fn test_merge_two_closed_streams_closes_immediately() {
    let (tx1, rx1) = unbounded::<i32>();
    let (tx2, rx2) = unbounded::<i32>();
    drop(tx1);
    drop(tx2);

    let merged = merge2(rx1, rx2).unwrap();
    assert_eq!(
        merged.recv_timeout(WAIT),
        Err(RecvTimeoutError::Disconnected)
    );
}

#[test]
fn test_merge_no_streams_closes_immediately() {
    let merged = merge::<i32>(Vec::new()).unwrap();
    assert_eq!(
        merged.recv_timeout(WAIT),
        Err(RecvTimeoutError::Disconnected)
    );
}

// --- consumer gone ---

#[test]
fn test_merge_stops_when_output_dropped() {
    let (tx, rx) = unbounded();
    for v in 0..5 {
        tx.send(v).unwrap();
    }

    let (output, join) = Merger::new().spawn(vec![rx]).unwrap().into_parts();
    drop(output);
    let stats = join.join().unwrap();

    assert!(stats.consumer_gone);
    assert_eq!(stats.total(), 0);
    // The input stays open; the merger must not have waited for it to close.
    drop(tx);
}

#[test]
fn test_merge_with_capacity_buffers_output() {
    let (tx, rx) = unbounded();
    for v in 0..4 {
        tx.send(v).unwrap();
    }
    drop(tx);

    let handle = Merger::new()
        .capacity(8)
        .name("buffered")
        .spawn(vec![rx])
        .unwrap();
    // With room for every item the merge finishes without a consumer.
    let (output, join) = handle.into_parts();
    let stats = join.join().unwrap();
    assert_eq!(stats.forwarded, vec![4]);
    assert_eq!(output.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
}

// --- thread naming ---

#[test]
fn test_merge_thread_carries_default_name() {
    let (tx, rx) = unbounded::<i32>();
    let handle = Merger::new().spawn(vec![rx]).unwrap();
    assert_eq!(handle.thread_name(), Some("taskyard-merge"));
    drop(tx);
    handle.join().unwrap();
}

#[test]
fn test_merge_thread_carries_custom_name() -> anyhow::Result<()> {
    let (tx, rx) = unbounded();
    let handle = Merger::new().name("ingest-fan-in").spawn(vec![rx])?;
    assert_eq!(handle.thread_name(), Some("ingest-fan-in"));

    tx.send(1)?;
    drop(tx);
    let got: Vec<i32> = handle.receiver().iter().collect();
    assert_eq!(got, vec![1]);
    assert_eq!(handle.join()?.forwarded, vec![1]);
    Ok(())
}
