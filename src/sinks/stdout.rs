//! # StdoutSink — attached-mode output.
//!
//! Writes each line to standard output, used while the daemon runs in the
//! foreground (`-d`) or before the detach handshake completes.
//!
//! ## Example output
//! ```text
//! [EVT_LOG] level='WARNING'; message='disk full'
//! eventd fail to read
//! ```

use std::io::Write;

use crate::sinks::LogSink;

/// Standard output sink.
#[derive(Default, Debug)]
pub struct StdoutSink;

impl StdoutSink {
    /// Construct a new [`StdoutSink`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for StdoutSink {
    fn emit(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            tracing::debug!(error = %e, "stdout sink write failed");
        }
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}
