//! Byte sources: split a reader into owned chunks.

use std::io::{ErrorKind, Read};

/// Iterator over fixed-size reads from `R`. Each chunk holds exactly the bytes one read
/// returned. Ends at EOF; after yielding an error it ends as well.
pub struct ReadChunks<R> {
    reader: R,
    chunk_size: usize,
    finished: bool,
}

impl<R: Read> ReadChunks<R> {
    /// A `chunk_size` of 0 is treated as 1. [`Dispatcher::run_reader`] rejects 0 before
    /// getting here.
    ///
    /// [`Dispatcher::run_reader`]: crate::dispatch::Dispatcher::run_reader
    pub fn new(reader: R, chunk_size: usize) -> Self {
        ReadChunks {
            reader,
            chunk_size: chunk_size.max(1),
            finished: false,
        }
    }
}

impl<R: Read> Iterator for ReadChunks<R> {
    type Item = std::io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(n) => {
                    buf.truncate(n);
                    return Some(Ok(buf));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for ReadChunks<R> {}
