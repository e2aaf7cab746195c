//! Consumer daemon: control loop and its process-level resources.
//!
//! This module contains everything the consumer process needs around the queue:
//! - [`control`]: the adaptive polling state machine;
//! - [`endpoint`]: the read-side trait the loop drives;
//! - [`detach`]: one-time background detach;
//! - [`pidfile`]: duplicate-instance guard;
//! - [`shutdown`]: OS signals → cancellation token;
//! - [`ingress`]: local socket for producers in other processes.

pub mod control;
pub mod detach;
pub mod endpoint;
pub mod ingress;
pub mod pidfile;
pub mod shutdown;

pub use control::{ControlLoop, LoopState, PollSpeed, render};
pub use detach::{Detach, ProcessDetacher};
pub use endpoint::Endpoint;
pub use ingress::Ingress;
pub use pidfile::PidFile;
pub use shutdown::{spawn_signal_watcher, wait_for_shutdown_signal};
