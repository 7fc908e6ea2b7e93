//! Content-addressed object storage
//!
//! Objects (serialized task versions and raw attachment blobs) are keyed by
//! the SHA-256 of their bytes and stored under
//! `objects/<first-2-hex>/<remaining-62-hex>`. Writes go through a temp file
//! in the shard directory followed by an atomic rename, so a reader never
//! observes a partially written object. Storing the same bytes twice is a
//! no-op; this is the deduplication primitive every other layer builds on.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};
use crate::lock::write_atomic;

/// Name of the object directory within a store
pub const OBJECTS_DIR: &str = "objects";

/// Hex length of a SHA-256 digest
const HASH_LEN: usize = 64;

/// Leading hex characters used as the shard directory name
const SHARD_LEN: usize = 2;

/// Compute the SHA-256 content hash of a byte slice as lowercase hex.
pub fn compute_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub(crate) fn validate_hash(hash: &str) -> Result<()> {
    let well_formed = hash.len() == HASH_LEN
        && hash
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if well_formed {
        Ok(())
    } else {
        Err(Error::InvalidHash(hash.to_string()))
    }
}

/// Immutable, content-addressed blob storage
#[derive(Debug, Clone)]
pub struct ObjectStore {
    objects_dir: PathBuf,
}

impl ObjectStore {
    /// Open (creating if necessary) the object store under a store root.
    pub fn open(store_root: &Path) -> Result<Self> {
        let objects_dir = store_root.join(OBJECTS_DIR);
        fs::create_dir_all(&objects_dir)?;
        Ok(Self { objects_dir })
    }

    /// Path of the object file for a given hash.
    pub fn object_path(&self, hash: &str) -> Result<PathBuf> {
        validate_hash(hash)?;
        let (shard, rest) = hash.split_at(SHARD_LEN);
        Ok(self.objects_dir.join(shard).join(rest))
    }

    /// Store bytes and return their content hash.
    ///
    /// Idempotent: if an object with the same hash already exists the bytes
    /// are not rewritten. The write itself is temp-then-rename, so a crash
    /// mid-put leaves at worst an orphaned temp file, never a partial object.
    pub fn put(&self, data: &[u8]) -> Result<String> {
        let hash = compute_hash(data);
        let path = self.object_path(&hash)?;

        if path.exists() {
            debug!(%hash, "object already present");
            return Ok(hash);
        }

        write_atomic(&path, data)?;
        debug!(%hash, size = data.len(), "object stored");
        Ok(hash)
    }

    /// Read the bytes stored under a hash.
    ///
    /// The bytes are re-hashed on the way out; a mismatch means the store
    /// was tampered with or the disk corrupted the object, and is surfaced
    /// as `ObjectCorrupted` rather than repaired.
    pub fn get(&self, hash: &str) -> Result<Vec<u8>> {
        let path = self.object_path(hash)?;
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::ObjectNotFound(hash.to_string()));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let actual = compute_hash(&data);
        if actual != hash {
            return Err(Error::ObjectCorrupted {
                hash: hash.to_string(),
                actual,
            });
        }

        Ok(data)
    }

    /// Check whether an object exists without reading it.
    pub fn contains(&self, hash: &str) -> Result<bool> {
        Ok(self.object_path(hash)?.exists())
    }

    /// Count stored objects across all shards.
    ///
    /// Temp files left by an interrupted writer are not counted.
    pub fn object_count(&self) -> Result<usize> {
        let mut count = 0;
        for shard in fs::read_dir(&self.objects_dir)? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(shard.path())? {
                let entry = entry?;
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if entry.file_type()?.is_file() && name.len() == HASH_LEN - SHARD_LEN {
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}
