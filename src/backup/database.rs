//! Consistent database copy
//!
//! The live database stays open to the web application while the producer
//! runs, so a plain file copy could capture a torn write. The copy goes
//! through SQLite's online backup API instead, which pages the source across
//! under the engine's own locking and yields a consistent destination file
//! regardless of concurrent writers.

use std::fs::{self, File};
use std::path::Path;

use rusqlite::backup::Backup;
use rusqlite::{Connection, OpenFlags};

use super::errors::{BackupError, BackupResult};

/// Copy the live database at `src` into `dst` using the engine's online
/// backup primitive. Returns the size of the finished copy in bytes.
///
/// Fails fast when `src` does not exist; the producer treats that (and any
/// copy failure) as fatal.
pub fn copy_database(src: &Path, dst: &Path) -> BackupResult<u64> {
    if !src.exists() {
        return Err(BackupError::database(format!(
            "live database missing: {}",
            src.display()
        )));
    }

    let src_conn = Connection::open_with_flags(src, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| {
            BackupError::database(format!("failed to open {}: {}", src.display(), e))
        })?;

    let mut dst_conn = Connection::open(dst).map_err(|e| {
        BackupError::database(format!("failed to create {}: {}", dst.display(), e))
    })?;

    {
        let backup = Backup::new(&src_conn, &mut dst_conn).map_err(|e| {
            BackupError::database(format!("failed to initialize database copy: {}", e))
        })?;

        // All pages in one step; the engine still honors source locks
        backup.step(-1).map_err(|e| {
            BackupError::database(format!("database copy failed: {}", e))
        })?;
    }

    drop(dst_conn);

    // The engine wrote the file; make it durable before the manifest refers
    // to it.
    let file = File::open(dst).map_err(|e| BackupError::io_error_at_path(dst, e))?;
    file.sync_all()
        .map_err(|e| BackupError::io_error_at_path(dst, e))?;

    let size = fs::metadata(dst)
        .map_err(|e| BackupError::io_error_at_path(dst, e))?
        .len();
    Ok(size)
}
