//! # Producer API.
//!
//! [`Producer`] builds [`EventRecord`]s and hands them to the queue. It is a cheap
//! `Clone` handle and can be used from any number of threads or tasks without
//! extra synchronization: the queue is the only shared mutable state.
//!
//! ## Example
//! ```rust
//! use eventd::{EventQueue, Severity};
//!
//! let queue = EventQueue::with_capacity(16);
//! let producer = queue.producer();
//! producer.submit_raw_string(Severity::Info, "service started").unwrap();
//! assert_eq!(queue.len(), 1);
//! ```

use std::sync::Arc;

use crate::error::QueueError;
use crate::events::{EventRecord, Severity};
use crate::queue::shared::EventQueue;

/// Handle for submitting records.
#[derive(Clone, Debug)]
pub struct Producer {
    queue: Arc<EventQueue>,
}

impl Producer {
    pub(crate) fn new(queue: Arc<EventQueue>) -> Self {
        Self { queue }
    }

    /// Submits a raw-string record.
    ///
    /// ### Results
    /// - `Ok(())` record queued (possibly evicting the oldest one)
    /// - `Err(InvalidArgument)` text contains a NUL byte
    /// - `Err(OutOfMemory)` allocation failed; nothing was queued
    ///
    /// Over-length text is truncated to [`MAX_TEXT_LEN`](crate::MAX_TEXT_LEN) bytes with a warning.
    pub fn submit_raw_string(&self, severity: Severity, text: &str) -> Result<(), QueueError> {
        let record = EventRecord::raw_string(severity, text)?;
        self.submit(record)
    }

    /// Submits a prebuilt record.
    pub fn submit(&self, record: EventRecord) -> Result<(), QueueError> {
        let res = self.queue.enqueue(record);
        if let Err(e) = &res {
            tracing::warn!(error = %e, label = e.as_label(), "record discarded");
        }
        res
    }
}
