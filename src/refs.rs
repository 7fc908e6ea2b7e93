//! Reference store: task id to current-version-hash pointers
//!
//! Refs are the only mutable state in the system: one text file per live
//! task under `refs/`, named by the task's UUID and containing the hash of
//! its current version. Updates use the same write-temp-then-rename
//! discipline as the object store, and are always the final step of a
//! mutation so a crash beforehand leaves the visible store unchanged.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::lock::write_atomic;
use crate::object;

/// Name of the refs directory within a store
pub const REFS_DIR: &str = "refs";

/// Mutable pointers from task ids to current version hashes
#[derive(Debug, Clone)]
pub struct RefStore {
    refs_dir: PathBuf,
}

impl RefStore {
    /// Open (creating if necessary) the ref store under a store root.
    pub fn open(store_root: &Path) -> Result<Self> {
        let refs_dir = store_root.join(REFS_DIR);
        fs::create_dir_all(&refs_dir)?;
        Ok(Self { refs_dir })
    }

    fn ref_path(&self, task_id: &Uuid) -> PathBuf {
        self.refs_dir.join(task_id.to_string())
    }

    /// Current version hash for a task.
    pub fn get(&self, task_id: &Uuid) -> Result<String> {
        let path = self.ref_path(task_id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::TaskNotFound(*task_id));
            }
            Err(e) => return Err(Error::Io(e)),
        };
        Ok(contents.trim().to_string())
    }

    /// Point a task at a new current version hash (atomic overwrite).
    ///
    /// Callers must hold the store lock; the orchestrator invokes this as
    /// the last step of every mutation.
    pub fn set(&self, task_id: &Uuid, hash: &str) -> Result<()> {
        // Reject malformed hashes before they become dangling pointers.
        object::validate_hash(hash)?;
        write_atomic(self.ref_path(task_id), hash.as_bytes())?;
        debug!(%task_id, %hash, "ref updated");
        Ok(())
    }

    /// Drop the pointer for a task. Returns whether a ref existed.
    ///
    /// The version chain it pointed at stays in the object store,
    /// unreachable but intact.
    pub fn delete(&self, task_id: &Uuid) -> Result<bool> {
        match fs::remove_file(self.ref_path(task_id)) {
            Ok(()) => {
                debug!(%task_id, "ref deleted");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// All task ids with a live ref, sorted for deterministic iteration.
    ///
    /// Files whose names do not parse as UUIDs (e.g. leftover temp files)
    /// are skipped.
    pub fn list(&self) -> Result<Vec<Uuid>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.refs_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Ok(id) = entry.file_name().to_string_lossy().parse::<Uuid>() {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Check whether a task has a live ref.
    pub fn contains(&self, task_id: &Uuid) -> bool {
        self.ref_path(task_id).exists()
    }
}
