//! # Consumer control loop.
//!
//! [`ControlLoop`] drives one [`Endpoint`] (normally the queue [`Session`](crate::Session)):
//! adaptive-timeout readiness polling, the one-time background-detach handshake,
//! record reassembly, and dispatch to the active [`LogSink`].
//!
//! ## State machine
//! ```text
//!                 attached (-d)
//!   new() ────────────────────────────────┐
//!     │ detached                          ▼
//!     ▼                            ┌──────────────┐  read ok   ┌──────────────┐
//! Bootstrapping ── poll ok ──────► │ Polling(Slow)│ ─────────► │ Polling(Fast)│
//!     │  └─ detach, republish pid, │   wait 10s   │ ◄───────── │   wait 2s    │
//!     │     switch sink to syslog  └──────┬───────┘  timeout / └──────┬───────┘
//!     │                                   │          failed read      │
//!     └── poll err ──┐                    ▼                           ▼
//!                    └──────────────► Terminating ◄── shutdown / hard error
//!                                     (close endpoint once)
//! ```
//!
//! ## Rules
//! - The shutdown token is checked once per iteration and raced against every
//!   readiness wait, so shutdown never waits past the current wait.
//! - A partial record is discarded without dispatch; the loop keeps running.
//! - A hard read or readiness error closes the endpoint and ends the loop.
//! - An interrupted wait ends the loop: cleanly if shutdown was requested,
//!   with [`DaemonError`] otherwise (an external supervisor restarts the process).

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::daemon::detach::{Detach, ProcessDetacher};
use crate::daemon::endpoint::Endpoint;
use crate::daemon::pidfile::PidFile;
use crate::error::{DaemonError, QueueError};
use crate::events::{RECORD_SIZE, WireBody, WireEvent, wire};
use crate::sinks::{LogRouter, LogSink};

/// Readiness wait length, chosen from whether the last read succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollSpeed {
    /// No recent activity: long wait.
    Slow,
    /// Last read succeeded: short wait for lower latency.
    Fast,
}

/// Control loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the first readiness report to detach.
    Bootstrapping,
    Polling(PollSpeed),
    /// Endpoint closed; the loop is finished.
    Terminating,
}

/// Result of one read handoff.
enum Handoff {
    Dispatched,
    Discarded,
    Stop,
}

/// Single-threaded consumer state machine.
pub struct ControlLoop<E: Endpoint> {
    endpoint: E,
    sink: Arc<LogRouter>,
    detacher: Box<dyn Detach>,
    pid_file: Option<PidFile>,
    slow_poll: Duration,
    fast_poll: Duration,
    state: LoopState,
    dispatched: u64,
    discarded: u64,
}

impl<E: Endpoint> ControlLoop<E> {
    /// Creates a loop over `endpoint`, writing through `sink`.
    ///
    /// Starts in [`LoopState::Bootstrapping`], or directly in `Polling(Slow)` when
    /// `cfg.attached` is set (no detach, the sink stays on its attached side).
    pub fn new(endpoint: E, sink: Arc<LogRouter>, cfg: &Config) -> Self {
        let state = if cfg.attached {
            LoopState::Polling(PollSpeed::Slow)
        } else {
            LoopState::Bootstrapping
        };
        Self {
            endpoint,
            sink,
            detacher: Box::new(ProcessDetacher),
            pid_file: None,
            slow_poll: cfg.slow_poll,
            fast_poll: cfg.fast_poll,
            state,
            dispatched: 0,
            discarded: 0,
        }
    }

    /// Replaces the detach mechanism (the default is `daemon(3)`).
    #[must_use]
    pub fn with_detacher(mut self, detacher: Box<dyn Detach>) -> Self {
        self.detacher = detacher;
        self
    }

    /// Hands the pid file to the loop; it is republished at the detach handshake.
    #[must_use]
    pub fn with_pid_file(mut self, pid_file: PidFile) -> Self {
        self.pid_file = Some(pid_file);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Number of records dispatched to the sink.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Number of partial or failed reads discarded.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Takes the pid file back (for removal on normal exit).
    pub fn take_pid_file(&mut self) -> Option<PidFile> {
        self.pid_file.take()
    }

    /// Runs until shutdown or a fatal error, then closes the endpoint exactly once.
    ///
    /// Returns `Ok(())` when `shutdown` was cancelled.
    pub async fn run(&mut self, shutdown: &CancellationToken) -> Result<(), DaemonError> {
        if self.state == LoopState::Terminating {
            return Ok(());
        }
        let res = self.drive(shutdown).await;
        self.terminate();
        res
    }

    async fn drive(&mut self, shutdown: &CancellationToken) -> Result<(), DaemonError> {
        loop {
            if shutdown.is_cancelled() {
                return Ok(());
            }
            match self.state {
                LoopState::Bootstrapping => self.bootstrap()?,
                LoopState::Polling(speed) => {
                    let wait = self.timeout_for(speed);
                    let ready = tokio::select! {
                        _ = shutdown.cancelled() => return Ok(()),
                        res = time::timeout(wait, self.endpoint.readable()) => res,
                    };
                    let next = match ready {
                        Err(_elapsed) => PollSpeed::Slow,
                        Ok(Ok(())) => match self.handoff(shutdown).await? {
                            Handoff::Dispatched => PollSpeed::Fast,
                            Handoff::Discarded => PollSpeed::Slow,
                            Handoff::Stop => return Ok(()),
                        },
                        Ok(Err(QueueError::Interrupted)) if shutdown.is_cancelled() => {
                            return Ok(());
                        }
                        Ok(Err(e)) => {
                            self.sink.emit(&format!("eventd readiness wait failed: {e}"));
                            return Err(DaemonError::Readiness(e));
                        }
                    };
                    self.state = LoopState::Polling(next);
                }
                LoopState::Terminating => return Ok(()),
            }
        }
    }

    fn timeout_for(&self, speed: PollSpeed) -> Duration {
        match speed {
            PollSpeed::Slow => self.slow_poll,
            PollSpeed::Fast => self.fast_poll,
        }
    }

    /// One-time detach handshake, triggered by the first readiness report.
    fn bootstrap(&mut self) -> Result<(), DaemonError> {
        if let Err(e) = self.endpoint.poll() {
            self.sink.emit("eventd select fail");
            return Err(DaemonError::Readiness(e));
        }

        if let Err(e) = self.detacher.detach() {
            self.sink.emit(&format!("eventd detach failed: {e}"));
            return Err(DaemonError::Detach(e));
        }
        if let Some(pid_file) = self.pid_file.as_mut() {
            pid_file.republish()?;
        }
        self.sink.switch_to_detached();
        self.state = LoopState::Polling(PollSpeed::Slow);
        tracing::info!("detached; logging to {}", self.sink.name());
        Ok(())
    }

    /// Reads one full record into a fixed buffer and dispatches it.
    async fn handoff(&mut self, shutdown: &CancellationToken) -> Result<Handoff, DaemonError> {
        let mut buf = [0u8; RECORD_SIZE];
        let mut filled = 0;

        while filled < RECORD_SIZE {
            match self.endpoint.read(&mut buf[filled..]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(QueueError::WouldBlock) => break,
                Err(QueueError::Interrupted) if shutdown.is_cancelled() => {
                    return Ok(Handoff::Stop);
                }
                Err(e) => {
                    self.sink.emit("eventd fail to read");
                    return Err(DaemonError::Read(e));
                }
            }
        }

        if filled < RECORD_SIZE {
            tracing::debug!(filled, expected = RECORD_SIZE, "partial record discarded");
            self.sink.emit("eventd fail to read");
            self.discarded += 1;
            return Ok(Handoff::Discarded);
        }

        match wire::decode(&buf) {
            Ok(ev) => {
                self.sink.emit(&render(&ev));
                self.dispatched += 1;
                Ok(Handoff::Dispatched)
            }
            Err(e) => {
                tracing::warn!(error = %e, "undecodable record discarded");
                self.discarded += 1;
                Ok(Handoff::Discarded)
            }
        }
    }

    fn terminate(&mut self) {
        self.endpoint.close();
        self.state = LoopState::Terminating;
        tracing::info!(
            dispatched = self.dispatched,
            discarded = self.discarded,
            "control loop finished"
        );
    }
}

/// Formats a decoded record the way it is written to the sink.
///
/// ```rust
/// use eventd::{WireBody, WireEvent, render};
///
/// let ev = WireEvent { level: 1, body: WireBody::RawString("disk full".into()) };
/// assert_eq!(render(&ev), "[EVT_LOG] level='WARNING'; message='disk full'");
/// ```
pub fn render(ev: &WireEvent) -> String {
    match &ev.body {
        WireBody::RawString(text) => {
            format!("[EVT_LOG] level='{}'; message='{}'", ev.level_label(), text)
        }
        WireBody::Unsupported(kind) => format!("type not supported (kind {kind})"),
    }
}
