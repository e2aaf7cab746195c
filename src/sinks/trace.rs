//! # TracingSink — forwards lines to `tracing`.
//!
//! Default notice sink of a queue built without an explicit one, so overload
//! notices are visible through whatever subscriber the host installed.

use crate::sinks::LogSink;

/// Sink emitting each line as an `info` event on the `eventd::sink` target.
#[derive(Default, Debug)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, line: &str) {
        tracing::info!(target: "eventd::sink", "{line}");
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}
