//! # eventd
//!
//! **eventd** bridges many event producers to a single consumer process through a
//! bounded, synchronized, pollable queue, and provides the consumer daemon that
//! drains it into stdout or the system log.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Producer   │   │   Producer   │   │   Ingress    │
//!     │ (thread/task)│   │ (thread/task)│   │ (unix dgram) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  EventQueue (Mutex<VecDeque> + Notify)                            │
//! │  - bounded FIFO, drop-oldest at capacity                          │
//! │  - rate-limited overload notice                                   │
//! │  - single Session slot (Busy on second open)                      │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │ Session (read / poll)  │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │      ControlLoop       │
//!                       │ Bootstrapping → Polling│
//!                       └───────────┬────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │       LogRouter        │
//!                       │  stdout ──► syslog     │
//!                       └────────────────────────┘
//! ```
//!
//! ### Control loop
//! ```text
//! loop {
//!   ├─► shutdown requested?              ─► close session, exit
//!   ├─► Bootstrapping: poll()            ─► detach, republish pid file, sink → syslog
//!   ├─► Polling: wait readable (10s | 2s) racing the shutdown token
//!   │       ├─ timeout                   ─► Slow
//!   │       └─ readable ─► read RECORD_SIZE bytes
//!   │              ├─ complete ─► dispatch "[EVT_LOG] level='..'; message='..'" ─► Fast
//!   │              ├─ partial  ─► discard                                       ─► Slow
//!   │              └─ error    ─► close session, exit with DaemonError
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                         |
//! |-------------------|----------------------------------------------------------|--------------------------------------------|
//! | **Records**       | Event data model and fixed-size wire format.             | [`EventRecord`], [`Severity`], [`wire`]    |
//! | **Queue**         | Bounded FIFO with readiness notification.                | [`EventQueue`], [`Session`], [`Producer`]  |
//! | **Consumer**      | Adaptive polling loop with one-time detach.              | [`ControlLoop`], [`Endpoint`], [`Detach`]  |
//! | **Sinks**         | Output for dispatched records and notices.               | [`LogSink`], [`LogRouter`]                 |
//! | **Errors**        | Typed errors with stable labels.                         | [`QueueError`], [`DaemonError`]            |
//! | **Configuration** | Centralized settings.                                    | [`Config`]                                 |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventd::{Config, ControlLoop, EventQueue, LogRouter, Severity, StdoutSink, TracingSink};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default().with_attached(true);
//!     let queue = EventQueue::new(&cfg);
//!     let session = queue.open()?;
//!
//!     queue.producer().submit_raw_string(Severity::Warning, "disk full")?;
//!
//!     let router = Arc::new(LogRouter::new(Arc::new(StdoutSink), Arc::new(TracingSink)));
//!     let shutdown = CancellationToken::new();
//!     let mut control = ControlLoop::new(session, router, &cfg);
//!
//!     let stop = shutdown.clone();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(std::time::Duration::from_millis(50)).await;
//!         stop.cancel();
//!     });
//!     control.run(&shutdown).await?;
//!     assert_eq!(control.dispatched(), 1);
//!     Ok(())
//! }
//! ```
mod config;
mod error;
mod events;
mod queue;
mod sinks;

pub mod cli;
pub mod daemon;

// ---- Public re-exports ----

pub use config::{Config, DEFAULT_INGRESS_SOCKET, DEFAULT_PID_FILE};
pub use daemon::{
    ControlLoop, Detach, Endpoint, Ingress, LoopState, PidFile, PollSpeed, ProcessDetacher,
    render,
};
pub use error::{DaemonError, QueueError, WireError};
pub use events::wire;
pub use events::{
    EventKind, EventRecord, MAX_TEXT_LEN, MSG_MAX_LEN, Payload, RECORD_SIZE, Severity,
    UNKNOWN_LEVEL, WireBody, WireEvent, level_label,
};
pub use queue::{EventQueue, Producer, QueueStats, Readiness, Session};
pub use sinks::{LogRouter, LogSink, StdoutSink, SyslogSink, TracingSink};
