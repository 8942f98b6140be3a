//! Cross-process guard so two passes never write the mapping at once.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use fs2::FileExt;
use tracing::debug;

use crate::error::SyncResult;

/// Holds an exclusive lock until dropped.
#[derive(Debug)]
pub struct RunLock {
    _file: File,
}

impl RunLock {
    /// `Ok(None)` when another pass holds the lock.
    pub fn try_acquire(path: &Path) -> SyncResult<Option<RunLock>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(RunLock { _file: file })),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Run lock is held elsewhere");
                Ok(None)
            }
        }
    }
}
