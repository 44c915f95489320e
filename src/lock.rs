//! Mutual exclusion between finvault runs
//!
//! The scheduled producer and a manually invoked consumer share the live
//! database, the uploads tree, and the snapshot collection. Nothing else
//! orders them, so both acquire an exclusive advisory lock on the same file
//! for their full duration. A second acquirer polls for a bounded wait and
//! then fails fast with an "operation already in progress" diagnostic instead
//! of racing.
//!
//! The lock file is left in place after release; only the advisory lock on it
//! matters.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;

/// How long a second acquirer waits before giving up
pub const DEFAULT_WAIT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Result type for lock acquisition
pub type LockResult<T> = Result<T, LockError>;

/// Lock acquisition errors (always fatal: the run never starts)
#[derive(Debug, Error)]
pub enum LockError {
    #[error("another finvault operation is already in progress (lock held on {})", .0.display())]
    AlreadyHeld(PathBuf),

    #[error("failed to open lock file {}: {}", .0.display(), .1)]
    Open(PathBuf, std::io::Error),
}

/// Exclusive advisory lock held for the duration of one operation.
///
/// Released on drop.
pub struct OperationLock {
    file: File,
    path: PathBuf,
}

impl OperationLock {
    /// Acquire the lock, waiting up to `wait` for a concurrent holder.
    pub fn acquire(path: &Path, wait: Duration) -> LockResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| LockError::Open(path.to_path_buf(), e))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| LockError::Open(path.to_path_buf(), e))?;

        let deadline = Instant::now() + wait;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    })
                }
                Err(_) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
                Err(_) => return Err(LockError::AlreadyHeld(path.to_path_buf())),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for OperationLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
