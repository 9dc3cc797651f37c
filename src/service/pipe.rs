// SPDX-License-Identifier: MIT OR Apache-2.0

//! A bounded in-memory byte pipe.
//!
//! [`pipe`] returns a connected [`PipeWriter`] / [`PipeReader`] pair sharing a ring buffer of
//! fixed capacity. The writer blocks while the buffer is full and the reader blocks while it
//! is empty, so at most `capacity` bytes are ever held in between.
//!
//! The two ends report each other's fate:
//!
//! - [`PipeWriter::finish`] ends the stream cleanly; the reader then sees end-of-file.
//! - Dropping the writer without `finish` aborts the stream; the reader gets an error instead
//!   of a silently truncated end-of-file.
//! - Dropping the reader makes further writes fail with `BrokenPipe` rather than block.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Default pipe capacity: 16 KiB.
pub const DEFAULT_PIPE_CAPACITY: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Open,
    Finished,
    Aborted,
}

#[derive(Debug)]
struct State {
    buf: VecDeque<u8>,
    writer: WriterState,
    reader_open: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    readable: Condvar,
    writable: Condvar,
    capacity: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates a pipe holding at most `capacity` bytes (at least one).
///
/// # Examples
///
/// ```rust
/// use std::io::{Read, Write};
/// use verscfg::service::pipe::pipe;
///
/// let (mut writer, mut reader) = pipe(4);
/// let producer = std::thread::spawn(move || {
///     writer.write_all(b"more than four bytes").unwrap();
///     writer.finish();
/// });
///
/// let mut received = String::new();
/// reader.read_to_string(&mut received).unwrap();
/// producer.join().unwrap();
/// assert_eq!(received, "more than four bytes");
/// ```
pub fn pipe(capacity: usize) -> (PipeWriter, PipeReader) {
    let capacity = capacity.max(1);
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            buf: VecDeque::with_capacity(capacity),
            writer: WriterState::Open,
            reader_open: true,
        }),
        readable: Condvar::new(),
        writable: Condvar::new(),
        capacity,
    });
    (
        PipeWriter {
            shared: Arc::clone(&shared),
        },
        PipeReader { shared },
    )
}

/// The producing end of a [`pipe`].
#[derive(Debug)]
pub struct PipeWriter {
    shared: Arc<Shared>,
}

impl PipeWriter {
    /// Ends the stream cleanly. The reader sees end-of-file once the buffer drains.
    pub fn finish(self) {
        self.close(WriterState::Finished);
    }

    /// Returns `true` once the reading end has been dropped.
    pub fn is_reader_closed(&self) -> bool {
        !self.shared.lock().reader_open
    }

    fn close(&self, how: WriterState) {
        let mut state = self.shared.lock();
        if state.writer == WriterState::Open {
            state.writer = how;
        }
        drop(state);
        self.shared.readable.notify_all();
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut state = self.shared.lock();
        loop {
            if !state.reader_open {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "pipe reader was dropped",
                ));
            }
            let space = self.shared.capacity - state.buf.len();
            if space > 0 {
                let n = space.min(buf.len());
                state.buf.extend(&buf[..n]);
                drop(state);
                self.shared.readable.notify_one();
                return Ok(n);
            }
            state = self
                .shared
                .writable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        self.close(WriterState::Aborted);
    }
}

/// The consuming end of a [`pipe`].
#[derive(Debug)]
pub struct PipeReader {
    shared: Arc<Shared>,
}

impl PipeReader {
    /// Returns the pipe capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Returns `true` once the writer finished cleanly and every byte has been read.
    pub fn is_drained(&self) -> bool {
        let state = self.shared.lock();
        state.writer == WriterState::Finished && state.buf.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn buffered(&self) -> usize {
        self.shared.lock().buf.len()
    }
}

impl Read for PipeReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        let mut state = self.shared.lock();
        loop {
            if !state.buf.is_empty() {
                let n = out.len().min(state.buf.len());
                for (dst, src) in out.iter_mut().zip(state.buf.drain(..n)) {
                    *dst = src;
                }
                drop(state);
                self.shared.writable.notify_one();
                return Ok(n);
            }
            match state.writer {
                WriterState::Finished => return Ok(0),
                WriterState::Aborted => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "pipe writer aborted before finishing the stream",
                    ))
                }
                WriterState::Open => {
                    state = self
                        .shared
                        .readable
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.reader_open = false;
        state.buf.clear();
        drop(state);
        self.shared.writable.notify_all();
    }
}
