//! Advisory lock on a storage directory.
//!
//! ```text
//! <base_dir>/
//! ├─ .lock          # exclusive OS lock, holder PID inside
//! ├─ status.json    # last-synchronized snapshot
//! └─ <id>.nete      # one JSON document per note
//! ```
//!
//! The lock is an OS-level exclusive lock on `.lock`, so it disappears with
//! the process that held it; a lock file left behind by a crashed backend
//! never blocks the next start.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{Error, Result};

const LOCK_FILE: &str = ".lock";

/// Exclusive, process-wide hold on a storage directory.
#[derive(Debug)]
pub struct StorageLock {
    path: PathBuf,
    file: File,
}

impl StorageLock {
    /// Acquire the lock for `dir`, failing with [`Error::Locked`] on contention.
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if file.try_lock_exclusive().is_err() {
            let holder = read_pid(&mut file);
            tracing::warn!(
                "Storage at {} is locked (holder pid: {})",
                dir.display(),
                holder.map_or_else(|| "unknown".to_string(), |pid| pid.to_string())
            );
            return Err(Error::Locked(path));
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        write!(file, "{}", std::process::id())?;
        file.sync_all()?;

        tracing::debug!("Acquired storage lock {}", path.display());
        Ok(Self { path, file })
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StorageLock {
    fn drop(&mut self) {
        // Truncate instead of deleting so a concurrent opener never ends up
        // locking an unlinked inode.
        let _ = self.file.set_len(0);
        let _ = FileExt::unlock(&self.file);
        tracing::debug!("Released storage lock {}", self.path.display());
    }
}

fn read_pid(file: &mut File) -> Option<u32> {
    let mut contents = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_acquire_is_rejected() {
        let dir = tempdir().unwrap();
        let _held = StorageLock::acquire(dir.path()).unwrap();

        let err = StorageLock::acquire(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Locked(_)));
    }

    #[test]
    fn test_lock_is_reusable_after_release() {
        let dir = tempdir().unwrap();
        let lock = StorageLock::acquire(dir.path()).unwrap();
        drop(lock);

        assert!(StorageLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn test_stale_lock_file_does_not_block() {
        let dir = tempdir().unwrap();
        // Leftover from a process that no longer holds an OS lock.
        std::fs::write(dir.path().join(LOCK_FILE), "999999").unwrap();

        let lock = StorageLock::acquire(dir.path()).unwrap();
        let pid = std::fs::read_to_string(lock.path()).unwrap();
        assert_eq!(pid, std::process::id().to_string());
    }
}
