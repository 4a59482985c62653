//! An in-memory, thread-safe duplex byte pipe.
//!
//! Used to wire the generator, sender, and receiver together for a local
//! transfer: each role runs on its own `std::thread`, and two
//! [`duplex_pair`] endpoints stand in for the socket a client/server
//! session would otherwise use.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

struct Channel {
    buffer: Mutex<VecDeque<u8>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    closed: AtomicBool,
}

impl Channel {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            closed: AtomicBool::new(false),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

/// One end of an in-memory duplex pipe. Implements [`Read`] (from the
/// peer) and [`Write`] (to the peer); both block the calling thread as
/// needed rather than spinning.
///
/// Composed of a [`DuplexReadHalf`] and a [`DuplexWriteHalf`] rather than
/// its own pair of fields, so [`Self::split`] can hand the two out
/// separately (to, e.g., feed a [`crate::Transport`]-shaped reader and
/// writer into two different role threads at once) without `unsafe`.
pub struct DuplexEnd {
    read_half: DuplexReadHalf,
    write_half: DuplexWriteHalf,
}

/// Default bound on how many unread bytes either direction of a
/// [`duplex_pair`] will buffer before a writer blocks.
pub const DEFAULT_CAPACITY: usize = 64 * 1024;

/// Builds a connected pair of [`DuplexEnd`]s: bytes written to one are
/// read from the other, in both directions, with `capacity` bytes of
/// buffering per direction.
#[must_use]
pub fn duplex_pair_with_capacity(capacity: usize) -> (DuplexEnd, DuplexEnd) {
    let a_to_b = Arc::new(Channel::new(capacity));
    let b_to_a = Arc::new(Channel::new(capacity));
    (
        DuplexEnd {
            read_half: DuplexReadHalf { read_side: Arc::clone(&b_to_a) },
            write_half: DuplexWriteHalf { write_side: Arc::clone(&a_to_b) },
        },
        DuplexEnd {
            read_half: DuplexReadHalf { read_side: a_to_b },
            write_half: DuplexWriteHalf { write_side: b_to_a },
        },
    )
}

impl DuplexEnd {
    /// Splits this end into an owned read half and write half that can be
    /// moved into two different threads (or wrapped by a [`FramedReader`]
    /// and a [`FramedWriter`] independently) while still talking to the
    /// same peer.
    ///
    /// [`FramedReader`]: protocol::FramedReader
    /// [`FramedWriter`]: protocol::FramedWriter
    #[must_use]
    pub fn split(self) -> (DuplexReadHalf, DuplexWriteHalf) {
        (self.read_half, self.write_half)
    }
}

/// The read half of a split [`DuplexEnd`].
pub struct DuplexReadHalf {
    read_side: Arc<Channel>,
}

/// The write half of a split [`DuplexEnd`]. Dropping it closes the
/// channel, same as dropping the unsplit `DuplexEnd` does.
pub struct DuplexWriteHalf {
    write_side: Arc<Channel>,
}

impl Read for DuplexReadHalf {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_from(&self.read_side, buf)
    }
}

impl Write for DuplexWriteHalf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        write_to(&self.write_side, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for DuplexWriteHalf {
    fn drop(&mut self) {
        self.write_side.close();
    }
}

/// Builds a connected pair of [`DuplexEnd`]s using [`DEFAULT_CAPACITY`].
#[must_use]
pub fn duplex_pair() -> (DuplexEnd, DuplexEnd) {
    duplex_pair_with_capacity(DEFAULT_CAPACITY)
}

fn read_from(channel: &Channel, buf: &mut [u8]) -> io::Result<usize> {
    if buf.is_empty() {
        return Ok(0);
    }
    let mut guard = channel.buffer.lock().unwrap_or_else(|e| e.into_inner());
    loop {
        if !guard.is_empty() {
            let n = guard.len().min(buf.len());
            for slot in &mut buf[..n] {
                *slot = guard.pop_front().expect("checked len above");
            }
            channel.not_full.notify_one();
            return Ok(n);
        }
        if channel.closed.load(Ordering::SeqCst) {
            return Ok(0);
        }
        guard = channel.not_empty.wait(guard).unwrap_or_else(|e| e.into_inner());
    }
}

fn write_to(channel: &Channel, buf: &[u8]) -> io::Result<usize> {
    if buf.is_empty() {
        return Ok(0);
    }
    let mut guard = channel.buffer.lock().unwrap_or_else(|e| e.into_inner());
    loop {
        if channel.closed.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "duplex peer closed"));
        }
        let space = channel.capacity.saturating_sub(guard.len());
        if space > 0 {
            let n = space.min(buf.len());
            guard.extend(buf[..n].iter().copied());
            channel.not_empty.notify_one();
            return Ok(n);
        }
        guard = channel.not_full.wait(guard).unwrap_or_else(|e| e.into_inner());
    }
}

impl Read for DuplexEnd {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_half.read(buf)
    }
}

impl Write for DuplexEnd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_half.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.write_half.flush()
    }
}
