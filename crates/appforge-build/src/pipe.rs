//! In-process byte pipe
//!
//! A bounded, unidirectional channel of byte chunks with `Read`/`Write`
//! ends. Dropping the [`PipeWriter`] closes the pipe: the [`PipeReader`]
//! returns end-of-stream only once every chunk written before the drop has
//! been read. Dropping the reader makes further writes fail with
//! `BrokenPipe`.

use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, SyncSender};

/// Largest chunk handed across the channel in one message
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Default number of chunks that may be buffered before the writer blocks
pub const DEFAULT_CAPACITY: usize = 16;

/// Create a pipe that buffers at most `capacity` chunks
pub fn pipe(capacity: usize) -> (PipeReader, PipeWriter) {
    let (tx, rx) = mpsc::sync_channel(capacity);
    (
        PipeReader {
            rx,
            chunk: Vec::new(),
            pos: 0,
        },
        PipeWriter { tx },
    )
}

/// Write half; owned by the producer
#[derive(Debug)]
pub struct PipeWriter {
    tx: SyncSender<Vec<u8>>,
}

impl PipeWriter {
    /// Close the pipe, signalling end-of-stream to the reader
    pub fn close(self) {}
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = buf.len().min(CHUNK_SIZE);
        self.tx
            .send(buf[..n].to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader closed"))?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read half; owned by the consumer
#[derive(Debug)]
pub struct PipeReader {
    rx: Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.chunk.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                // Every sender is gone and the queue is drained
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
