//! # Endpoint trait driven by the control loop.
//!
//! [`Endpoint`] is the read side the [`ControlLoop`](crate::ControlLoop) polls and
//! reads from. [`Session`] implements it; tests plug in scripted endpoints to
//! exercise short reads and failures.

use async_trait::async_trait;

use crate::error::QueueError;
use crate::queue::{Readiness, Session};

/// Pollable, readable, closable record source.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Zero-wait readiness check.
    fn poll(&self) -> Result<Readiness, QueueError>;

    /// Waits until a record can be read.
    async fn readable(&self) -> Result<(), QueueError>;

    /// Reads up to `buf.len()` bytes of the next record.
    ///
    /// `Ok(0)` means end of data.
    async fn read(&self, buf: &mut [u8]) -> Result<usize, QueueError>;

    /// Releases the endpoint. Returns `true` the first time.
    fn close(&self) -> bool;
}

#[async_trait]
impl Endpoint for Session {
    fn poll(&self) -> Result<Readiness, QueueError> {
        Session::poll(self)
    }

    async fn readable(&self) -> Result<(), QueueError> {
        Session::readable(self).await
    }

    async fn read(&self, buf: &mut [u8]) -> Result<usize, QueueError> {
        Session::read(self, buf).await
    }

    fn close(&self) -> bool {
        Session::close(self)
    }
}
