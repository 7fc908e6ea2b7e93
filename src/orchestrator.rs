//! Task orchestration over the content-addressed store
//!
//! Every mutating operation follows one discipline: acquire the store lock,
//! read the current ref, build and store a new immutable version, then swap
//! the ref as the final step. A crash at any point before the ref swap
//! leaves the visible state exactly as it was; at worst an unreferenced
//! object remains in the store, which is garbage rather than corruption.
//!
//! Read operations (`current`, `history`, `list_tasks`, `dump`,
//! `extract_file`) take no lock: the ref swap is atomic, so a concurrent
//! reader sees either the old or the new version, never a partial one.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::alias::{AliasGenerator, WordPairAliases};
use crate::chain::{resolve_version, store_version, walk_history};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock::{StoreLock, LOCK_FILE};
use crate::object::ObjectStore;
use crate::refs::RefStore;
use crate::version::{AttachmentRef, Version, STATUS_PENDING};

/// Field patch applied by [`Orchestrator::update_task`].
///
/// Unset fields are left as they are on the current version.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub description: Option<String>,
    pub status: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Versioned task tracker over a single store directory
pub struct Orchestrator {
    root: PathBuf,
    objects: ObjectStore,
    refs: RefStore,
    lock_timeout_ms: u64,
    aliases: Box<dyn AliasGenerator + Send + Sync>,
}

impl Orchestrator {
    /// Open (creating if necessary) a store at the given directory.
    pub fn open(store_root: impl AsRef<Path>) -> Result<Self> {
        let root = store_root.as_ref().to_path_buf();
        let objects = ObjectStore::open(&root)?;
        let refs = RefStore::open(&root)?;
        Ok(Self {
            root,
            objects,
            refs,
            lock_timeout_ms: crate::lock::DEFAULT_LOCK_TIMEOUT_MS,
            aliases: Box::new(WordPairAliases),
        })
    }

    /// Open the store described by a configuration, rooted at `base_dir`.
    pub fn open_with_config(base_dir: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let mut orchestrator = Self::open(base_dir.as_ref().join(&config.store.dir))?;
        orchestrator.lock_timeout_ms = config.lock.timeout_ms;
        Ok(orchestrator)
    }

    /// Replace the alias naming collaborator.
    pub fn with_alias_generator(
        mut self,
        aliases: Box<dyn AliasGenerator + Send + Sync>,
    ) -> Self {
        self.aliases = aliases;
        self
    }

    /// Path of the store directory.
    pub fn store_root(&self) -> &Path {
        &self.root
    }

    /// The underlying object store.
    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    fn acquire_lock(&self) -> Result<StoreLock> {
        StoreLock::acquire(self.lock_path(), self.lock_timeout_ms)
    }

    /// Store a version and swap the task ref to it. Ref update last; callers
    /// hold the lock.
    fn commit(&self, version: &mut Version) -> Result<()> {
        let hash = store_version(&self.objects, version)?;
        self.refs.set(&version.task_id, &hash)
    }

    /// Aliases of every live task, for uniqueness at assignment time.
    fn live_aliases(&self) -> Result<HashSet<String>> {
        let mut aliases = HashSet::new();
        for task_id in self.refs.list()? {
            aliases.insert(self.current(task_id)?.alias);
        }
        Ok(aliases)
    }

    // =========================================================================
    // Mutating operations
    // =========================================================================

    /// Create a new task with a fresh id and a unique alias.
    pub fn create_task(
        &self,
        description: impl Into<String>,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Version> {
        let _lock = self.acquire_lock()?;

        let task_id = Uuid::new_v4();
        let existing = self.live_aliases()?;
        let alias = self.aliases.generate(&task_id, &existing);

        let mut version = Version::new(task_id, alias, description.into(), deadline);
        self.commit(&mut version)?;
        info!(%task_id, alias = %version.alias, "task created");
        Ok(version)
    }

    /// Apply a field patch as a new version.
    pub fn update_task(&self, task_id: Uuid, update: TaskUpdate) -> Result<Version> {
        let _lock = self.acquire_lock()?;

        let current = self.current(task_id)?;
        let mut next = current.next();
        if let Some(description) = update.description {
            next.description = description;
        }
        if let Some(status) = update.status {
            next.status = status;
        }
        if let Some(deadline) = update.deadline {
            next.deadline = Some(deadline);
        }

        self.commit(&mut next)?;
        info!(%task_id, status = %next.status, "task updated");
        Ok(next)
    }

    /// Store attachment bytes (deduplicated) and record them on a new version.
    pub fn attach_file(
        &self,
        task_id: Uuid,
        filename: impl Into<String>,
        bytes: &[u8],
    ) -> Result<Version> {
        let _lock = self.acquire_lock()?;

        let current = self.current(task_id)?;
        let blob_hash = self.objects.put(bytes)?;

        let mut next = current.next();
        next.attachments.push(AttachmentRef {
            filename: filename.into(),
            hash: blob_hash,
        });

        self.commit(&mut next)?;
        info!(%task_id, attachments = next.attachments.len(), "attachment added");
        Ok(next)
    }

    /// Mark a task archived (a status-preserving flag flip, as a new version).
    pub fn archive_task(&self, task_id: Uuid) -> Result<Version> {
        self.set_archived(task_id, true)
    }

    /// Clear a task's archived flag (as a new version).
    pub fn unarchive_task(&self, task_id: Uuid) -> Result<Version> {
        self.set_archived(task_id, false)
    }

    fn set_archived(&self, task_id: Uuid, archived: bool) -> Result<Version> {
        let _lock = self.acquire_lock()?;

        let current = self.current(task_id)?;
        let mut next = current.next();
        next.archived = archived;

        self.commit(&mut next)?;
        info!(%task_id, archived, "archive flag changed");
        Ok(next)
    }

    /// Irreversibly drop the task's ref.
    ///
    /// The version chain stays in the object store, unreachable but intact;
    /// only the pointer is removed.
    pub fn delete_task(&self, task_id: Uuid) -> Result<()> {
        let _lock = self.acquire_lock()?;

        if !self.refs.delete(&task_id)? {
            return Err(Error::TaskNotFound(task_id));
        }
        info!(%task_id, "task deleted");
        Ok(())
    }

    /// Start a new task from an existing one.
    ///
    /// The duplicate gets a fresh id and alias, copies description, deadline
    /// and attachment refs (sharing the underlying blobs), and resets status
    /// to pending with an empty history.
    pub fn duplicate_task(&self, task_id: Uuid) -> Result<Version> {
        let _lock = self.acquire_lock()?;

        let source = self.current(task_id)?;

        let new_id = Uuid::new_v4();
        let existing = self.live_aliases()?;
        let alias = self.aliases.generate(&new_id, &existing);

        let mut version = Version::new(new_id, alias, source.description.clone(), source.deadline);
        version.attachments = source.attachments.clone();
        version.status = STATUS_PENDING.to_string();

        self.commit(&mut version)?;
        info!(source = %task_id, duplicate = %new_id, "task duplicated");
        Ok(version)
    }

    /// Remove a lock marker left behind by a crashed writer.
    ///
    /// Explicit operator recovery for [`Error::StaleLock`]; returns whether
    /// a marker was removed. Never called automatically.
    pub fn force_unlock(&self) -> Result<bool> {
        StoreLock::force_unlock(self.lock_path())
    }

    // =========================================================================
    // Read operations (lock-free)
    // =========================================================================

    /// Current version of a task.
    pub fn current(&self, task_id: Uuid) -> Result<Version> {
        let hash = self.refs.get(&task_id)?;
        let version = resolve_version(&self.objects, &hash)?;
        if version.task_id != task_id {
            return Err(Error::RefMismatch {
                task_id,
                found: version.task_id,
            });
        }
        Ok(version)
    }

    /// Extract attachment bytes from a task's current version.
    ///
    /// When a filename was attached more than once, the most recent entry
    /// wins.
    pub fn extract_file(&self, task_id: Uuid, filename: &str) -> Result<Vec<u8>> {
        let current = self.current(task_id)?;
        let attachment =
            current
                .find_attachment(filename)
                .ok_or_else(|| Error::AttachmentNotFound {
                    task_id,
                    filename: filename.to_string(),
                })?;
        self.objects.get(&attachment.hash)
    }

    /// Full version history of a task, newest first.
    pub fn history(&self, task_id: Uuid) -> Result<Vec<Version>> {
        let current = self.current(task_id)?;
        walk_history(&self.objects, current.hash).collect()
    }

    /// A specific version of a task, 1-indexed from the oldest.
    pub fn task_version(&self, task_id: Uuid, version: usize) -> Result<Version> {
        let mut history = self.history(task_id)?;
        let available = history.len();
        if version == 0 || version > available {
            return Err(Error::VersionNotFound {
                task_id,
                version,
                available,
            });
        }
        // History is newest-first; index from the back.
        Ok(history.swap_remove(available - version))
    }

    /// Current version of every live task.
    ///
    /// Tasks are ordered by creation time (tie-broken by id); archived tasks
    /// are excluded unless `include_archived` is set.
    pub fn list_tasks(&self, include_archived: bool) -> Result<Vec<Version>> {
        let mut tasks = Vec::new();
        for task_id in self.refs.list()? {
            let version = self.current(task_id)?;
            if version.archived && !include_archived {
                continue;
            }
            tasks.push(version);
        }
        tasks.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        Ok(tasks)
    }

    /// Every qualifying version record in the store.
    ///
    /// Without `include_history`, one record (the current version) per task.
    /// With it, each task contributes its whole chain, newest first, with
    /// tasks ordered as in [`Orchestrator::list_tasks`]. A task whose
    /// current version is archived is excluded entirely, earlier
    /// non-archived versions and all, unless `include_archived` is set.
    pub fn dump(&self, include_history: bool, include_archived: bool) -> Result<Vec<Version>> {
        let tasks = self.list_tasks(include_archived)?;
        if !include_history {
            return Ok(tasks);
        }

        let mut records = Vec::new();
        for task in tasks {
            for version in walk_history(&self.objects, task.hash.clone()) {
                records.push(version?);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_orchestrator() -> (TempDir, Orchestrator) {
        let temp = TempDir::new().unwrap();
        let orchestrator = Orchestrator::open(temp.path().join(".todo_store")).unwrap();
        (temp, orchestrator)
    }

    #[test]
    fn create_assigns_unique_aliases() {
        let (_temp, orch) = open_orchestrator();
        let mut seen = HashSet::new();
        for _ in 0..10 {
            let version = orch.create_task("task", None).unwrap();
            assert!(seen.insert(version.alias));
        }
    }

    #[test]
    fn update_of_unknown_task_fails() {
        let (_temp, orch) = open_orchestrator();
        let missing = Uuid::new_v4();
        let result = orch.update_task(missing, TaskUpdate::default());
        assert!(matches!(result, Err(Error::TaskNotFound(id)) if id == missing));
    }

    #[test]
    fn ref_mismatch_is_detected() {
        let (_temp, orch) = open_orchestrator();
        let a = orch.create_task("a", None).unwrap();
        let b = orch.create_task("b", None).unwrap();

        // Point a's ref at b's version, simulating external tampering.
        orch.refs.set(&a.task_id, &b.hash).unwrap();

        let result = orch.current(a.task_id);
        assert!(matches!(
            result,
            Err(Error::RefMismatch { task_id, found })
                if task_id == a.task_id && found == b.task_id
        ));
    }

    #[test]
    fn task_version_bounds() {
        let (_temp, orch) = open_orchestrator();
        let task = orch.create_task("one", None).unwrap();
        orch.update_task(
            task.task_id,
            TaskUpdate {
                status: Some("completed".to_string()),
                ..TaskUpdate::default()
            },
        )
        .unwrap();

        let v1 = orch.task_version(task.task_id, 1).unwrap();
        assert_eq!(v1.status, STATUS_PENDING);
        let v2 = orch.task_version(task.task_id, 2).unwrap();
        assert_eq!(v2.status, "completed");

        assert!(matches!(
            orch.task_version(task.task_id, 0),
            Err(Error::VersionNotFound { .. })
        ));
        assert!(matches!(
            orch.task_version(task.task_id, 3),
            Err(Error::VersionNotFound { available: 2, .. })
        ));
    }
}
