//! Snapshot collection management
//!
//! A snapshot is a self-contained directory under the backup root:
//!
//! ```text
//! backups/
//! ├── finance_backup_20260808_143000/
//! │   ├── finance.db          (consistent database copy)
//! │   ├── uploads.tar.gz      (receipts + tax documents, relative paths)
//! │   ├── docs.tar.gz         (optional secondary tree)
//! │   └── manifest.txt        (plain key=value summary)
//! ├── pre_restore_20260809_091500/   (safety snapshot, same layout)
//! └── latest -> finance_backup_20260808_143000
//! ```
//!
//! Once fully written a snapshot is immutable; the producer only ever adds new
//! directories and retargets `latest`. This module owns naming, listing, the
//! latest pointer, manifests, and checksums. Listing is computed fresh on
//! every call so ordinal selection always reflects the directory as it is now.

mod checksum;
mod errors;
mod manifest;
mod naming;

pub use checksum::{compute_file_checksum, format_checksum, parse_checksum};
pub use errors::{SnapshotError, SnapshotErrorCode, SnapshotResult};
pub use manifest::{fsync_dir, status, SnapshotManifest};
pub use naming::{SnapshotName, SAFETY_PREFIX, TIMESTAMP_FORMAT};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Uploads archive file name inside a snapshot
pub const UPLOADS_ARCHIVE: &str = "uploads.tar.gz";
/// Docs archive file name inside a snapshot
pub const DOCS_ARCHIVE: &str = "docs.tar.gz";
/// Manifest file name inside a snapshot
pub const MANIFEST_FILE: &str = "manifest.txt";
/// Latest-pointer symlink name under the backup root
pub const LATEST_LINK: &str = "latest";
/// Tax documents subdirectory inside the live uploads tree
pub const TAX_DOCS_DIR: &str = "tax_docs";

const LATEST_TMP: &str = ".latest.tmp";

/// A snapshot directory found under the backup root
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub name: SnapshotName,
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Enumerate snapshots matching `prefix`, newest first.
///
/// Sorted by modification time descending with ties broken by name
/// descending, which keeps the order stable and reverse-chronological for
/// same-second snapshots. Non-matching directories and plain files are
/// ignored. A missing backup root lists as empty rather than failing, so
/// list mode works before the first backup.
pub fn list_snapshots(backup_root: &Path, prefix: &str) -> SnapshotResult<Vec<SnapshotEntry>> {
    let mut entries = Vec::new();

    let dir = match fs::read_dir(backup_root) {
        Ok(dir) => dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
        Err(e) => return Err(SnapshotError::io_error_at_path(backup_root, e)),
    };

    for entry in dir {
        let entry = entry.map_err(|e| SnapshotError::io_error_at_path(backup_root, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let file_name = entry.file_name();
        let Some(name) = SnapshotName::parse(prefix, &file_name.to_string_lossy()) else {
            continue;
        };

        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|e| SnapshotError::io_error_at_path(&path, e))?;

        entries.push(SnapshotEntry {
            name,
            path,
            modified,
        });
    }

    entries.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.name.as_str().cmp(a.name.as_str()))
    });

    Ok(entries)
}

/// Resolve the latest pointer to a snapshot path, if one exists.
pub fn read_latest(backup_root: &Path) -> SnapshotResult<Option<PathBuf>> {
    let link = backup_root.join(LATEST_LINK);
    match fs::read_link(&link) {
        Ok(target) => {
            let resolved = if target.is_absolute() {
                target
            } else {
                backup_root.join(target)
            };
            Ok(Some(resolved))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SnapshotError::io_error_at_path(&link, e)),
    }
}

/// Retarget the latest pointer at `snapshot_name`, atomically.
///
/// The new symlink is created at a temporary name and renamed over the old
/// pointer, so a concurrent reader sees either the previous target or the new
/// one, never a missing or half-written link. The target is stored relative
/// to the backup root so the collection can be mirrored or moved wholesale.
pub fn point_latest_at(backup_root: &Path, snapshot_name: &str) -> SnapshotResult<()> {
    let link = backup_root.join(LATEST_LINK);
    let tmp = backup_root.join(LATEST_TMP);

    if fs::symlink_metadata(&tmp).is_ok() {
        fs::remove_file(&tmp).map_err(|e| SnapshotError::io_error_at_path(&tmp, e))?;
    }

    std::os::unix::fs::symlink(snapshot_name, &tmp)
        .map_err(|e| SnapshotError::io_error_at_path(&tmp, e))?;

    fs::rename(&tmp, &link).map_err(|e| SnapshotError::io_error_at_path(&link, e))?;

    fsync_dir(backup_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn mkdir(root: &Path, name: &str) -> PathBuf {
        let path = root.join(name);
        fs::create_dir_all(&path).unwrap();
        path
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        // Created oldest to newest with distinct mtimes
        for name in [
            "finance_backup_20260801_000000",
            "finance_backup_20260802_000000",
            "finance_backup_20260803_000000",
        ] {
            mkdir(root, name);
            thread::sleep(Duration::from_millis(20));
        }
        // Noise that must never appear
        mkdir(root, "pre_restore_20260804_000000");
        mkdir(root, "lost+found");
        fs::write(root.join("finance_backup_20260805_000000"), b"a file").unwrap();

        let entries = list_snapshots(root, "finance_backup").unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "finance_backup_20260803_000000",
                "finance_backup_20260802_000000",
                "finance_backup_20260801_000000",
            ]
        );
    }

    #[test]
    fn test_list_ties_broken_by_name() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        mkdir(root, "finance_backup_20260801_000001");
        mkdir(root, "finance_backup_20260801_000002");

        let entries = list_snapshots(root, "finance_backup").unwrap();
        // Directories created back-to-back may share an mtime; the later name
        // must never sort below the earlier one.
        let pos_newer = entries
            .iter()
            .position(|e| e.name.as_str().ends_with("000002"))
            .unwrap();
        let pos_older = entries
            .iter()
            .position(|e| e.name.as_str().ends_with("000001"))
            .unwrap();
        assert!(pos_newer <= pos_older);
    }

    #[test]
    fn test_list_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let entries = list_snapshots(&dir.path().join("nowhere"), "finance_backup").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_latest_pointer_round_trip() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        mkdir(root, "finance_backup_20260801_000000");

        assert_eq!(read_latest(root).unwrap(), None);

        point_latest_at(root, "finance_backup_20260801_000000").unwrap();
        assert_eq!(
            read_latest(root).unwrap(),
            Some(root.join("finance_backup_20260801_000000"))
        );
    }

    #[test]
    fn test_latest_pointer_replaced_atomically() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        mkdir(root, "finance_backup_20260801_000000");
        mkdir(root, "finance_backup_20260802_000000");

        point_latest_at(root, "finance_backup_20260801_000000").unwrap();
        point_latest_at(root, "finance_backup_20260802_000000").unwrap();

        assert_eq!(
            read_latest(root).unwrap(),
            Some(root.join("finance_backup_20260802_000000"))
        );
        // No temp link survives
        assert!(fs::symlink_metadata(root.join(LATEST_TMP)).is_err());
    }

    #[test]
    fn test_latest_pointer_survives_stale_tmp() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        mkdir(root, "finance_backup_20260801_000000");

        // Simulate a crash between symlink and rename
        std::os::unix::fs::symlink("dangling", root.join(LATEST_TMP)).unwrap();

        point_latest_at(root, "finance_backup_20260801_000000").unwrap();
        assert_eq!(
            read_latest(root).unwrap(),
            Some(root.join("finance_backup_20260801_000000"))
        );
    }
}
