//! # Runtime configuration.
//!
//! Provides [`Config`] centralized settings for the queue and the consumer daemon.
//!
//! Config is used in two ways:
//! 1. **Queue creation**: `EventQueue::new(&config)`
//! 2. **Control loop**: polling intervals, pid file, sink selection
//!
//! ## Sentinel values
//! - `queue_capacity = 0` → clamped to 1
//! - `overflow_notice_interval = 0s` → no rate limit (notice on every eviction)
//! - `ingress_socket = None` → no local ingress endpoint

use std::path::PathBuf;
use std::time::Duration;

/// Default location of the pid-tracking file.
pub const DEFAULT_PID_FILE: &str = "/var/run/eventd.pid";

/// Default location of the local ingress socket.
pub const DEFAULT_INGRESS_SOCKET: &str = "/var/run/eventd.sock";

/// Global configuration for the queue and the consumer daemon.
///
/// ## Field semantics
/// - `queue_capacity`: hard ceiling on queued records (min 1)
/// - `slow_poll`: readiness wait while idle
/// - `fast_poll`: readiness wait right after a successful read
/// - `overflow_notice_interval`: minimum spacing of overload notices (`0s` = none)
/// - `attached`: stay in the foreground, skip the detach handshake, log to stdout
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of queued records. At capacity the oldest record is evicted.
    pub queue_capacity: usize,

    /// Readiness timeout used while no recent read succeeded.
    pub slow_poll: Duration,

    /// Readiness timeout used right after a successful read.
    pub fast_poll: Duration,

    /// Minimum wall-clock spacing between two overload notices.
    pub overflow_notice_interval: Duration,

    /// Pid-tracking file, (re)written at the detach handshake and removed on exit.
    pub pid_file: PathBuf,

    /// Local datagram socket accepting wire-format records from other processes.
    pub ingress_socket: Option<PathBuf>,

    /// Identity passed to the system log facility.
    pub syslog_ident: String,

    /// Run attached to the terminal (no detach, stdout sink).
    pub attached: bool,
}

impl Config {
    /// Returns the queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }

    /// Returns the overload notice spacing as an `Option`.
    ///
    /// - `None` → every eviction produces a notice
    /// - `Some(d)` → at most one notice per `d`
    #[inline]
    pub fn notice_interval(&self) -> Option<Duration> {
        if self.overflow_notice_interval == Duration::ZERO {
            None
        } else {
            Some(self.overflow_notice_interval)
        }
    }

    /// Returns a copy configured to run attached (or detached).
    #[must_use]
    pub fn with_attached(mut self, attached: bool) -> Self {
        self.attached = attached;
        self
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `queue_capacity = 1000`
    /// - `slow_poll = 10s`, `fast_poll = 2s`
    /// - `overflow_notice_interval = 30s`
    /// - `pid_file = /var/run/eventd.pid`
    /// - `ingress_socket = /var/run/eventd.sock`
    /// - `syslog_ident = "eventd"`, `attached = false`
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            slow_poll: Duration::from_secs(10),
            fast_poll: Duration::from_secs(2),
            overflow_notice_interval: Duration::from_secs(30),
            pid_file: PathBuf::from(DEFAULT_PID_FILE),
            ingress_socket: Some(PathBuf::from(DEFAULT_INGRESS_SOCKET)),
            syslog_ident: "eventd".to_string(),
            attached: false,
        }
    }
}
