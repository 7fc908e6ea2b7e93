//! Version chain operations over the object store
//!
//! Versions are stored as canonical JSON objects; the returned hash doubles
//! as the storage key and the `parent` pointer of the next version. History
//! is walked lazily, newest to oldest, with a visited set guarding against
//! a malformed store producing a cycle.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Error, Result};
use crate::object::ObjectStore;
use crate::version::Version;

/// Serialize a version, store it, and record the resulting hash on it.
pub fn store_version(store: &ObjectStore, version: &mut Version) -> Result<String> {
    let bytes = serde_json::to_vec(version)?;
    let hash = store.put(&bytes)?;
    version.hash = hash.clone();
    debug!(task_id = %version.task_id, %hash, "version stored");
    Ok(hash)
}

/// Load and decode the version stored under a hash.
pub fn resolve_version(store: &ObjectStore, hash: &str) -> Result<Version> {
    let bytes = store.get(hash)?;
    let mut version: Version = serde_json::from_slice(&bytes)?;
    version.hash = hash.to_string();
    Ok(version)
}

/// Walk a version chain from `start_hash` back to the root.
pub fn walk_history(store: &ObjectStore, start_hash: String) -> History<'_> {
    History {
        store,
        next: Some(start_hash),
        visited: HashSet::new(),
    }
}

/// Lazy newest-to-oldest iterator over a task's versions
pub struct History<'a> {
    store: &'a ObjectStore,
    next: Option<String>,
    visited: HashSet<String>,
}

impl Iterator for History<'_> {
    type Item = Result<Version>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.next.take()?;

        // Write-once discipline makes a repeated hash unreachable in a
        // healthy store; treat it as corruption, not an infinite walk.
        if !self.visited.insert(hash.clone()) {
            return Some(Err(Error::HistoryCycle(hash)));
        }

        match resolve_version(self.store, &hash) {
            Ok(version) => {
                self.next = version.parent.clone();
                Some(Ok(version))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
