//! # Pid-tracking file.
//!
//! Prevents two consumer instances from running at once and tells service
//! managers which process to signal.
//!
//! ## Lifecycle
//! ```text
//! acquire(path) ──► republish() (after detach; pid changed) ──► remove() (normal exit)
//!   │
//!   └─ file names a live process ──► DaemonError::AlreadyRunning
//! ```
//!
//! The file is created with mode `0600` and holds the decimal pid plus a newline.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use crate::error::DaemonError;

/// Owned pid file.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Claims `path` for the current process.
    ///
    /// A stale file (unreadable, or naming a dead process) is replaced.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, DaemonError> {
        let path = path.into();
        if let Some(pid) = read_pid(&path) {
            if pid != current_pid() && process_alive(pid) {
                return Err(DaemonError::AlreadyRunning { pid });
            }
            tracing::debug!(pid, path = %path.display(), "replacing stale pid file");
        }
        let pf = Self { path };
        pf.write()?;
        Ok(pf)
    }

    /// Removes and rewrites the file with the current pid.
    pub fn republish(&mut self) -> Result<(), DaemonError> {
        self.unlink()?;
        self.write()
    }

    /// Deletes the file.
    pub fn remove(self) -> Result<(), DaemonError> {
        self.unlink()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> Result<(), DaemonError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.path)
            .map_err(|source| self.error(source))?;
        writeln!(file, "{}", current_pid()).map_err(|source| self.error(source))
    }

    fn unlink(&self) -> Result<(), DaemonError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.error(source)),
        }
    }

    fn error(&self, source: io::Error) -> DaemonError {
        DaemonError::PidFile {
            path: self.path.clone(),
            source,
        }
    }
}

fn read_pid(path: &Path) -> Option<i32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn current_pid() -> i32 {
    std::process::id() as i32
}

fn process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 performs only the existence/permission check.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}
