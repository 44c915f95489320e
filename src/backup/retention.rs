//! Retention cleanup
//!
//! Snapshots strictly older than the retention window are deleted after each
//! successful backup. Two hard rules:
//!
//! - Only directories matching the snapshot naming pattern are candidates;
//!   anything else under the backup root is left alone.
//! - The snapshot the latest pointer resolves to is never deleted, however
//!   old it is. With `retention_days = 0` every other matching snapshot is
//!   age-eligible, so this protection is what keeps the snapshot created
//!   moments ago alive through its own run's cleanup.
//!
//! Age comes from the timestamp embedded in the directory name, not from
//! mtime: copying a collection between disks resets mtimes but not names.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};

use crate::snapshot::{list_snapshots, read_latest};

use super::errors::BackupResult;

/// What a cleanup pass did
#[derive(Debug, Clone, Default)]
pub struct RetentionSummary {
    /// Names of snapshots removed
    pub removed: Vec<String>,
    /// Matching snapshots still present
    pub kept: usize,
}

/// Delete snapshots under `prefix` that are strictly older than
/// `retention_days`, sparing the latest-pointer target.
pub fn prune_snapshots(
    backup_root: &Path,
    prefix: &str,
    retention_days: u32,
    now: DateTime<Utc>,
) -> BackupResult<RetentionSummary> {
    let cutoff = now - Duration::days(i64::from(retention_days));
    let latest_target = read_latest(backup_root)?;

    let mut summary = RetentionSummary::default();

    for entry in list_snapshots(backup_root, prefix)? {
        let protected = latest_target
            .as_deref()
            .is_some_and(|target| target == entry.path.as_path());

        if !protected && entry.name.created_at() < cutoff {
            fs::remove_dir_all(&entry.path).map_err(|e| {
                super::errors::BackupError::io_error_at_path(&entry.path, e)
            })?;
            summary.removed.push(entry.name.as_str().to_string());
        } else {
            summary.kept += 1;
        }
    }

    Ok(summary)
}
