//! # SyslogSink — detached-mode output.
//!
//! Sends each line to the system log facility at `LOG_INFO` priority under
//! `LOG_DAEMON`, tagged with the configured identity and the process id.
//!
//! `openlog(3)` keeps a pointer to the identity string, so the sink owns it for
//! as long as the log stays open and calls `closelog(3)` on drop.

use std::ffi::CString;

use crate::sinks::LogSink;

/// System log sink.
#[derive(Debug)]
pub struct SyslogSink {
    ident: CString,
}

impl SyslogSink {
    /// Opens the system log with the given identity.
    ///
    /// NUL bytes in `ident` are stripped.
    pub fn open(ident: &str) -> Self {
        let ident = to_cstring(ident);
        // SAFETY: `ident` is a valid NUL-terminated string owned by `self` and kept
        // alive until `closelog` runs in `Drop`.
        unsafe { libc::openlog(ident.as_ptr(), libc::LOG_PID, libc::LOG_DAEMON) };
        Self { ident }
    }
}

impl LogSink for SyslogSink {
    fn emit(&self, line: &str) {
        let msg = to_cstring(line);
        // SAFETY: the format is a static "%s" and `msg` is NUL-terminated, so no
        // caller-controlled conversion specifiers reach syslog(3).
        unsafe { libc::syslog(libc::LOG_INFO, c"%s".as_ptr(), msg.as_ptr()) };
    }

    fn name(&self) -> &'static str {
        "syslog"
    }
}

impl Drop for SyslogSink {
    fn drop(&mut self) {
        tracing::debug!(ident = ?self.ident, "closing system log");
        // SAFETY: closelog(3) has no preconditions.
        unsafe { libc::closelog() };
    }
}

fn to_cstring(s: &str) -> CString {
    let bytes: Vec<u8> = s.bytes().filter(|b| *b != 0).collect();
    // Interior NULs were removed above.
    CString::new(bytes).unwrap_or_default()
}
