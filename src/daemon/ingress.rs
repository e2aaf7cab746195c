//! # Local ingress endpoint.
//!
//! Lets producers in other processes submit records. [`Ingress`] binds a Unix
//! datagram socket (mode `0600`, owner only) and enqueues every well-formed
//! frame through a [`Producer`].
//!
//! ## Frame
//! Exactly one wire record ([`RECORD_SIZE`] bytes, see [`wire`](crate::events::wire)).
//!
//! ## Rules
//! - Short, oversized or malformed frames are dropped with a warning.
//! - Queue errors are logged by the producer; the loop keeps receiving.
//! - The socket file is removed when the loop exits.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tokio::net::UnixDatagram;
use tokio_util::sync::CancellationToken;

use crate::error::DaemonError;
use crate::events::{RECORD_SIZE, wire};
use crate::queue::Producer;

/// Bound ingress socket.
#[derive(Debug)]
pub struct Ingress {
    socket: UnixDatagram,
    path: PathBuf,
    producer: Producer,
}

impl Ingress {
    /// Binds `path`, replacing a leftover socket file, and restricts it to the owner.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(path: impl Into<PathBuf>, producer: Producer) -> Result<Self, DaemonError> {
        let path = path.into();
        let err = |source: io::Error| DaemonError::Ingress {
            path: path.clone(),
            source,
        };

        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed stale ingress socket"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(err(e)),
        }
        let socket = UnixDatagram::bind(&path).map_err(err)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).map_err(err)?;

        Ok(Self {
            socket,
            path,
            producer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Receives frames until `shutdown` is cancelled or the socket fails.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut buf = vec![0u8; RECORD_SIZE + 1];
        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                res = self.socket.recv(&mut buf) => res,
            };
            match received {
                Ok(n) => self.accept(&buf[..n]),
                Err(e) => {
                    tracing::warn!(error = %e, "ingress receive failed; stopping");
                    break;
                }
            }
        }
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::debug!(error = %e, path = %self.path.display(), "ingress socket not removed");
        }
    }

    fn accept(&self, frame: &[u8]) {
        match wire::record_from_frame(frame) {
            Ok(record) => {
                // Failures are already logged by the producer.
                let _ = self.producer.submit(record);
            }
            Err(e) => {
                tracing::warn!(error = %e, label = e.as_label(), "ingress frame dropped");
            }
        }
    }
}
