//! # LogRouter — one-way switch from the attached sink to the detached sink.
//!
//! ```text
//!                 ┌──────────────┐
//! emit(line) ───► │  LogRouter   │ ──► attached sink   (until switch)
//!                 │  detached?   │ ──► detached sink   (after switch)
//!                 └──────────────┘
//! ```
//!
//! ## Rules
//! - Starts on the attached sink.
//! - [`LogRouter::switch_to_detached`] flips exactly once; later calls are no-ops.
//! - The router is itself a [`LogSink`], so the queue's notice path and the
//!   consumer loop share one routing decision.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::sinks::LogSink;

/// Routes lines to one of two sinks.
pub struct LogRouter {
    attached: Arc<dyn LogSink>,
    detached: Arc<dyn LogSink>,
    switched: AtomicBool,
}

impl LogRouter {
    /// Creates a router currently writing to `attached`.
    pub fn new(attached: Arc<dyn LogSink>, detached: Arc<dyn LogSink>) -> Self {
        Self {
            attached,
            detached,
            switched: AtomicBool::new(false),
        }
    }

    /// Switches to the detached sink.
    ///
    /// Returns `true` only for the call that performed the switch.
    pub fn switch_to_detached(&self) -> bool {
        let first = !self.switched.swap(true, Ordering::AcqRel);
        if first {
            tracing::debug!(sink = self.detached.name(), "log output switched");
        }
        first
    }

    /// Returns `true` once the switch happened.
    pub fn is_detached(&self) -> bool {
        self.switched.load(Ordering::Acquire)
    }

    fn active(&self) -> &dyn LogSink {
        if self.is_detached() {
            self.detached.as_ref()
        } else {
            self.attached.as_ref()
        }
    }
}

impl LogSink for LogRouter {
    fn emit(&self, line: &str) {
        self.active().emit(line);
    }

    fn name(&self) -> &'static str {
        self.active().name()
    }
}
