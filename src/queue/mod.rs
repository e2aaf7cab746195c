//! Shared event queue, consumer session and producer API.
//!
//! ## Contents
//! - [`EventQueue`] bounded FIFO, drop-oldest overflow, readiness notification
//! - [`Session`] single consumer handle (blocking / non-blocking / poll)
//! - [`Producer`] record construction and submission
//!
//! ## Lifecycle
//! ```text
//! EventQueue::new(&cfg) ──► producer() ×N ──► enqueue ...
//!        │
//!        └──► open() ──► Session ──► read / poll / readable ──► close() (or drop)
//! ```
//! The queue lives as long as its last `Arc`; dropping it releases every queued record.

mod producer;
mod session;
mod shared;

pub use producer::Producer;
pub use session::Session;
pub use shared::{EventQueue, QueueStats, Readiness};
