//! # Background detach.
//!
//! [`Detach`] turns the attached, terminal-bound process into a background one.
//! [`ProcessDetacher`] uses `daemon(3)`: fork, parent exits, child starts a new
//! session, changes directory to `/` and redirects the standard streams to `/dev/null`.
//!
//! ## Rules
//! - Called at most once per process, by the control loop's bootstrap step.
//! - Must run while the process has a single thread (the current-thread runtime
//!   used by the binary satisfies this).

use std::io;

/// One-time detach from the controlling terminal.
pub trait Detach: Send {
    fn detach(&mut self) -> io::Result<()>;
}

/// Detaches the real process with `daemon(3)`.
#[derive(Debug, Default)]
pub struct ProcessDetacher;

impl Detach for ProcessDetacher {
    fn detach(&mut self) -> io::Result<()> {
        // SAFETY: daemon(3) only forks and adjusts process-level state; the caller
        // guarantees no other threads hold locks across the fork.
        let rc = unsafe { libc::daemon(0, 0) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}
