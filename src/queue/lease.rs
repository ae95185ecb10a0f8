//! Named exclusive leases.
//!
//! A lease serializes the read-modify-write cycle on one persisted queue
//! across every process sharing the storage root. Release happens when the
//! guard is dropped, on every exit path.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{trace, warn};

use crate::error::Result;

/// Default pause between claim attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Capability to claim a named resource exclusively.
#[async_trait]
pub trait Lease: Send + Sync {
    /// Blocks until `name` is claimed. Contention is never an error; only a
    /// fault in the underlying mechanism is.
    async fn acquire(&self, name: &Path) -> Result<LeaseGuard>;
}

/// Held lease. Dropping it releases the claim.
#[must_use = "the lease is released as soon as the guard is dropped"]
pub struct LeaseGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl LeaseGuard {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Lease claimed by creating a directory, which the filesystem does
/// atomically and fails with `AlreadyExists` while another holder has it.
#[derive(Debug, Clone)]
pub struct DirLease {
    retry_interval: Duration,
}

impl DirLease {
    pub fn new(retry_interval: Duration) -> Self {
        Self { retry_interval }
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }
}

impl Default for DirLease {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_INTERVAL)
    }
}

/// Claims `marker` once. The guard is built on the blocking thread next to
/// the `create_dir` call, so a caller that stops waiting still drops a guard
/// and the marker is removed.
fn claim(marker: PathBuf) -> std::io::Result<LeaseGuard> {
    std::fs::create_dir(&marker)?;
    Ok(LeaseGuard::new(move || {
        // Single rmdir; cheap enough to run inline on the async worker.
        if let Err(e) = std::fs::remove_dir(&marker) {
            warn!(marker = %marker.display(), error = %e, "failed to release lease");
        }
    }))
}

#[async_trait]
impl Lease for DirLease {
    async fn acquire(&self, marker: &Path) -> Result<LeaseGuard> {
        let mut attempts: u64 = 0;
        loop {
            let path = marker.to_path_buf();
            let claimed = tokio::task::spawn_blocking(move || claim(path))
                .await
                .map_err(|e| std::io::Error::new(ErrorKind::Other, e))?;
            match claimed {
                Ok(guard) => return Ok(guard),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    attempts += 1;
                    trace!(marker = %marker.display(), attempts, "lease busy");
                    tokio::time::sleep(self.retry_interval).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
