//! # Consumer session: single-slot access gate over the queue.
//!
//! A [`Session`] is obtained from [`EventQueue::open`] and is the only way the
//! consumer reads records.
//!
//! ## Read modes
//! ```text
//! read(buf)
//!   ├─ non-blocking mode ──► dequeue_nonblocking ──► WouldBlock when empty
//!   └─ blocking mode     ──► dequeue_blocking    ──► waits for enqueue / close / interrupt
//!         │
//!         └─► Ok(record) ──► encode to wire ──► copy min(buf.len(), RECORD_SIZE) bytes
//! ```
//!
//! ## Rules
//! - At most one session is open; a second `open()` fails with `Busy`.
//! - `close()` is idempotent and wakes every blocked reader with `Closed`.
//! - Dropping a session closes it.
//! - A read consumes one whole record even if `buf` is shorter than [`RECORD_SIZE`];
//!   the uncopied tail of that record is discarded.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::QueueError;
use crate::events::RECORD_SIZE;
use crate::events::wire;
use crate::queue::shared::{EventQueue, Readiness};

/// Open consumer session.
#[derive(Debug)]
pub struct Session {
    queue: Arc<EventQueue>,
    epoch: u64,
    interrupt: CancellationToken,
}

impl Session {
    pub(crate) fn new(queue: Arc<EventQueue>, epoch: u64, interrupt: CancellationToken) -> Self {
        Self {
            queue,
            epoch,
            interrupt,
        }
    }

    /// Switches between blocking and non-blocking reads.
    pub fn set_nonblocking(&self, on: bool) -> Result<(), QueueError> {
        self.queue.set_nonblocking_in(self.epoch, on)
    }

    /// Returns `true` when reads return `WouldBlock` instead of waiting.
    pub fn is_nonblocking(&self) -> Result<bool, QueueError> {
        self.queue.is_nonblocking_in(self.epoch)
    }

    /// Reads one record in wire format into `buf`.
    ///
    /// Returns the number of bytes copied: `min(buf.len(), RECORD_SIZE)`, or `0`
    /// for an empty buffer (nothing is consumed in that case).
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, QueueError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let record = if self.queue.is_nonblocking_in(self.epoch)? {
            self.queue.dequeue_nonblocking_in(self.epoch)?
        } else {
            self.queue
                .dequeue_blocking_in(self.epoch, &self.interrupt)
                .await?
        };

        let frame = wire::encode(&record);
        let n = buf.len().min(RECORD_SIZE);
        buf[..n].copy_from_slice(&frame[..n]);
        Ok(n)
    }

    /// Zero-wait readiness check.
    pub fn poll(&self) -> Result<Readiness, QueueError> {
        self.queue.poll_readiness_in(self.epoch)
    }

    /// Waits until a record is readable, the session closes, or the interrupt fires.
    pub async fn readable(&self) -> Result<(), QueueError> {
        self.queue.wait_readable_in(self.epoch, &self.interrupt).await
    }

    /// Closes the session and wakes blocked readers.
    ///
    /// Returns `true` if this call closed it, `false` if it was already closed.
    pub fn close(&self) -> bool {
        self.queue.close_session(self.epoch)
    }

    /// Returns `true` while this session is the open one.
    pub fn is_open(&self) -> bool {
        self.queue.poll_readiness_in(self.epoch).is_ok()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
