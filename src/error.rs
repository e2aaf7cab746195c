//! Error types used by the event queue, the wire codec and the consumer daemon.
//!
//! This module defines three enums:
//!
//! - [`QueueError`] — results of queue and session operations.
//! - [`WireError`] — malformed fixed-size records.
//! - [`DaemonError`] — failures that end the consumer control loop or its startup.
//!
//! Each type provides `as_label` for logs/metrics, and `QueueError` adds
//! [`QueueError::is_transient`] for callers deciding whether to retry.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// # Errors produced by queue and session operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// A consumer session is already open.
    #[error("session busy: another consumer holds the queue")]
    Busy,

    /// Memory for the record could not be reserved; the record was discarded.
    #[error("out of memory; record discarded")]
    OutOfMemory,

    /// The record was rejected before reaching the queue.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the input was rejected.
        reason: String,
    },

    /// Non-blocking read found the queue empty.
    #[error("operation would block")]
    WouldBlock,

    /// The session was closed while (or before) waiting.
    #[error("session closed")]
    Closed,

    /// A blocking wait was aborted by an external interruption.
    #[error("wait interrupted")]
    Interrupted,
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventd::QueueError;
    ///
    /// assert_eq!(QueueError::Busy.as_label(), "queue_busy");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::Busy => "queue_busy",
            QueueError::OutOfMemory => "queue_oom",
            QueueError::InvalidArgument { .. } => "queue_invalid_argument",
            QueueError::WouldBlock => "queue_would_block",
            QueueError::Closed => "queue_closed",
            QueueError::Interrupted => "queue_interrupted",
        }
    }

    /// Indicates whether retrying the same call later may succeed.
    ///
    /// Only [`QueueError::WouldBlock`] is transient; everything else reflects a
    /// session state change or a rejected record.
    pub fn is_transient(&self) -> bool {
        matches!(self, QueueError::WouldBlock)
    }
}

/// # Errors produced while decoding a wire record.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Fewer bytes than one full record.
    #[error("short record: expected {expected} bytes, got {got}")]
    Short { expected: usize, got: usize },

    /// More bytes than one record.
    #[error("oversized record: got {got} bytes")]
    Oversized { got: usize },

    /// Kind code not known to this build.
    #[error("unknown record kind {kind}")]
    UnknownKind { kind: i32 },

    /// Severity level outside the supported range.
    #[error("invalid severity level {level}")]
    InvalidLevel { level: i32 },

    /// Payload could not be turned into a record.
    #[error("invalid payload")]
    InvalidPayload,
}

impl WireError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WireError::Short { .. } => "wire_short",
            WireError::Oversized { .. } => "wire_oversized",
            WireError::UnknownKind { .. } => "wire_unknown_kind",
            WireError::InvalidLevel { .. } => "wire_invalid_level",
            WireError::InvalidPayload => "wire_invalid_payload",
        }
    }
}

/// # Errors produced by the consumer daemon.
///
/// These end either startup or the control loop. Shutdown requested by a signal
/// is not an error.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DaemonError {
    /// The session could not be opened.
    #[error("can't open event session: {0}")]
    Open(#[source] QueueError),

    /// A read failed hard (not an empty or short read).
    #[error("read failed: {0}")]
    Read(#[source] QueueError),

    /// The readiness check failed.
    #[error("readiness check failed: {0}")]
    Readiness(#[source] QueueError),

    /// Detaching from the controlling terminal failed.
    #[error("detach failed: {0}")]
    Detach(#[source] io::Error),

    /// The pid-tracking file could not be created, written or removed.
    #[error("pid file {path:?}: {source}")]
    PidFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Another instance is already running.
    #[error("another instance is running (pid {pid})")]
    AlreadyRunning { pid: i32 },

    /// Installing signal handlers failed.
    #[error("signal registration failed: {0}")]
    Signal(#[source] io::Error),

    /// The ingress endpoint could not be bound.
    #[error("ingress socket {path:?}: {source}")]
    Ingress {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DaemonError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DaemonError::Open(_) => "daemon_open",
            DaemonError::Read(_) => "daemon_read",
            DaemonError::Readiness(_) => "daemon_readiness",
            DaemonError::Detach(_) => "daemon_detach",
            DaemonError::PidFile { .. } => "daemon_pid_file",
            DaemonError::AlreadyRunning { .. } => "daemon_already_running",
            DaemonError::Signal(_) => "daemon_signal",
            DaemonError::Ingress { .. } => "daemon_ingress",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DaemonError::Open(e) => format!("open: {e}"),
            DaemonError::Read(e) => format!("read: {e}"),
            DaemonError::Readiness(e) => format!("readiness: {e}"),
            DaemonError::Detach(e) => format!("detach: {e}"),
            DaemonError::PidFile { path, source } => {
                format!("pid file {}: {source}", path.display())
            }
            DaemonError::AlreadyRunning { pid } => format!("already running as pid {pid}"),
            DaemonError::Signal(e) => format!("signals: {e}"),
            DaemonError::Ingress { path, source } => {
                format!("ingress {}: {source}", path.display())
            }
        }
    }
}
