//! Fan-in: merge N receivers into one, closing the output only after every input has closed.
//!
//! Each input occupies a fixed slot in a `Select`. When an input closes its slot is swapped for
//! [`never()`](crossbeam_channel::never), a receiver that is never ready, so the wait set keeps
//! its shape and a closed input cannot be picked again or spin.

use anyhow::Result;
use crossbeam_channel::{Receiver, Select, Sender, bounded, never};
use log::debug;
use std::io;
use std::thread::{self, JoinHandle};

/// Per-run counters returned by [`MergeHandle::join`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Items forwarded from each input, by input position.
    pub forwarded: Vec<usize>,
    /// True when the merge stopped because the output receiver was dropped.
    pub consumer_gone: bool,
}

impl MergeStats {
    pub fn total(&self) -> usize {
        self.forwarded.iter().sum()
    }
}

/// One input position in the merge set.
struct Slot<T> {
    rx: Receiver<T>,
    live: bool,
}

impl<T> Slot<T> {
    fn new(rx: Receiver<T>) -> Self {
        Slot { rx, live: true }
    }

    /// Replace the closed input with a receiver that never becomes ready.
    fn disable(&mut self) {
        self.rx = never();
        self.live = false;
    }
}

/// Builder for a merge thread.
#[derive(Clone, Debug)]
pub struct Merger {
    capacity: usize,
    name: String,
}

impl Default for Merger {
    fn default() -> Self {
        Merger {
            capacity: 0,
            name: format!("{}-merge", env!("CARGO_PKG_NAME")),
        }
    }
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output channel capacity. 0 (default) hands each item over directly to the consumer.
    pub fn capacity(self, capacity: usize) -> Self {
        Self { capacity, ..self }
    }

    /// Name of the merge thread; also used as the log prefix.
    pub fn name<N: Into<String>>(self, name: N) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Start merging `streams` on a named background thread.
    pub fn spawn<T: Send + 'static>(self, streams: Vec<Receiver<T>>) -> io::Result<MergeHandle<T>> {
        let (out_tx, out_rx) = bounded::<T>(self.capacity);
        let slots: Vec<Slot<T>> = streams.into_iter().map(Slot::new).collect();
        let name = self.name;
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || merge_loop(&name, slots, out_tx))?;
        Ok(MergeHandle {
            output: out_rx,
            handle,
        })
    }
}

/// Output side of a running merge.
pub struct MergeHandle<T> {
    output: Receiver<T>,
    handle: JoinHandle<MergeStats>,
}

impl<T> MergeHandle<T> {
    pub fn receiver(&self) -> &Receiver<T> {
        &self.output
    }

    pub fn thread_name(&self) -> Option<&str> {
        self.handle.thread().name()
    }

    pub fn into_receiver(self) -> Receiver<T> {
        self.output
    }

    pub fn into_parts(self) -> (Receiver<T>, JoinHandle<MergeStats>) {
        (self.output, self.handle)
    }

    /// Drop the output and wait for the merge thread. Drain the receiver first; items still
    /// pending in the inputs are not forwarded once the output is gone.
    pub fn join(self) -> Result<MergeStats> {
        drop(self.output);
        self.handle
            .join()
            .map_err(|_| anyhow::anyhow!("merge thread panicked"))
    }
}

/// Merge any number of streams into one. The output closes once every input has closed.
/// Fails only if the merge thread cannot be spawned.
pub fn merge<T: Send + 'static>(streams: Vec<Receiver<T>>) -> io::Result<Receiver<T>> {
    Ok(Merger::new().spawn(streams)?.into_receiver())
}

/// Merge two streams into one.
pub fn merge2<T: Send + 'static>(a: Receiver<T>, b: Receiver<T>) -> io::Result<Receiver<T>> {
    merge(vec![a, b])
}

fn merge_loop<T>(name: &str, mut slots: Vec<Slot<T>>, out: Sender<T>) -> MergeStats {
    let mut stats = MergeStats {
        forwarded: vec![0; slots.len()],
        consumer_gone: false,
    };
    let mut live = slots.iter().filter(|s| s.live).count();
    debug!("{}: merging {} stream(s)", name, live);

    while live > 0 {
        let (index, msg) = {
            let mut sel = Select::new();
            for slot in &slots {
                sel.recv(&slot.rx);
            }
            let oper = sel.select();
            let index = oper.index();
            (index, oper.recv(&slots[index].rx))
        };

        match msg {
            Ok(item) => {
                if out.send(item).is_err() {
                    debug!("{}: output receiver dropped, stopping", name);
                    stats.consumer_gone = true;
                    break;
                }
                stats.forwarded[index] += 1;
            }
            Err(_) => {
                debug!("{}: stream {} closed, disabling its slot", name, index);
                slots[index].disable();
                live -= 1;
            }
        }
    }

    if !stats.consumer_gone {
        debug!("{}: all streams closed, closing output", name);
    }
    stats
}
