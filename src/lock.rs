//! Store locking and atomic file operations
//!
//! All mutating operations are serialized across processes by a single
//! exclusive marker file per store (`orchestrator.lock`), created with
//! `create_new` so acquisition is atomic on every platform. The marker
//! records the owning pid and acquisition time; a writer that crashes leaves
//! a diagnosable stale marker instead of silently racing the next writer.
//!
//! The module also provides the write-temp-then-rename helper used by the
//! object and reference stores.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Lock marker filename within a store directory
pub const LOCK_FILE: &str = "orchestrator.lock";

/// Default lock timeout in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Default retry interval when waiting for a lock
const LOCK_RETRY_INTERVAL_MS: u64 = 50;

/// Owner metadata recorded inside the lock marker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockOwner {
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

/// An exclusive store lock that removes its marker when dropped
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    /// Acquire the exclusive store lock, retrying up to `timeout_ms`.
    ///
    /// Fails with `LockContention` if another live process holds the lock
    /// for the whole retry window, or with `StaleLock` as soon as the marker
    /// is found to belong to a process that is no longer alive. Stale locks
    /// are never broken automatically; see [`StoreLock::force_unlock`].
    pub fn acquire(path: impl AsRef<Path>, timeout_ms: u64) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        let retry_interval = Duration::from_millis(LOCK_RETRY_INTERVAL_MS);

        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    let owner = LockOwner {
                        pid: std::process::id(),
                        acquired_at: Utc::now(),
                    };
                    let json = serde_json::to_string(&owner)?;
                    file.write_all(json.as_bytes())?;
                    file.sync_all()?;
                    debug!(path = %path.display(), pid = owner.pid, "store lock acquired");
                    return Ok(StoreLock {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    // A marker whose recorded owner is dead will never be
                    // released; surface it instead of waiting out the timeout.
                    if let Some(owner) = Self::owner(path)? {
                        if !pid_alive(owner.pid) {
                            warn!(
                                path = %path.display(),
                                pid = owner.pid,
                                "stale lock marker detected"
                            );
                            return Err(Error::StaleLock {
                                path: path.to_path_buf(),
                                pid: owner.pid,
                                acquired_at: owner.acquired_at,
                            });
                        }
                    }

                    if start.elapsed() >= timeout {
                        return Err(Error::LockContention(path.to_path_buf()));
                    }
                    std::thread::sleep(retry_interval);
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    /// Read the owner metadata from an existing lock marker.
    ///
    /// Returns `Ok(None)` if the marker is absent or its metadata is not yet
    /// readable (a freshly created marker may not have been written out).
    pub fn owner(path: impl AsRef<Path>) -> Result<Option<LockOwner>> {
        let contents = match fs::read_to_string(path.as_ref()) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        };
        Ok(serde_json::from_str(&contents).ok())
    }

    /// Remove a lock marker regardless of owner.
    ///
    /// This is the explicit operator-recovery path for a stale lock; it
    /// returns whether a marker was actually removed.
    pub fn force_unlock(path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => {
                warn!(path = %path.display(), "lock marker force-removed");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Get the path to the lock marker
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // Remove the marker - ignore errors during drop
        let _ = fs::remove_file(&self.path);
    }
}

/// Check whether a process with the given pid is alive.
fn pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    if pid == std::process::id() {
        return true;
    }
    #[cfg(unix)]
    {
        // kill -0 probes for existence without signalling.
        let status = std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();
        matches!(status, Ok(s) if s.success())
    }
    #[cfg(not(unix))]
    {
        // No cheap probe; assume alive so the lock is never misreported stale.
        true
    }
}

/// Atomically write data to a file
///
/// This writes to a temporary file in the same directory, then renames
/// it to the target path. This ensures the file is either fully written
/// or not modified at all.
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Temp file in same directory (important for atomic rename)
    let temp_path = path.with_extension(format!(
        "{}.tmp.{}",
        path.extension().and_then(|e| e.to_str()).unwrap_or(""),
        std::process::id()
    ));

    let mut temp_file = File::create(&temp_path)?;
    temp_file.write_all(data)?;
    temp_file.sync_all()?;
    drop(temp_file);

    fs::rename(&temp_path, path)?;

    Ok(())
}
