//! # Output sinks for the consumer daemon.
//!
//! This module provides the [`LogSink`] trait and the built-in sinks.
//!
//! ## Architecture
//! ```text
//! ControlLoop::dispatch ──┐
//!                         ├──► LogRouter ──► StdoutSink  (attached)
//! EventQueue overload  ───┘         └──────► SyslogSink  (detached)
//! ```
//!
//! ## Sinks
//! - [`StdoutSink`] foreground output
//! - [`SyslogSink`] system log facility, `LOG_INFO`
//! - [`TracingSink`] forwards to `tracing` (library default)
//! - [`LogRouter`] one-time attached → detached switch

mod router;
mod sink;
mod stdout;
mod syslog;
mod trace;

pub use router::LogRouter;
pub use sink::LogSink;
pub use stdout::StdoutSink;
pub use syslog::SyslogSink;
pub use trace::TracingSink;
