//! Snapshot manifest handling
//!
//! `manifest.txt` is plain `key=value` text, one pair per line, so an operator
//! can read it with nothing but `cat`:
//!
//! ```text
//! timestamp=2026-08-08T14:30:00Z
//! host=finbox
//! database_bytes=40960
//! database_checksum=crc32:1a2b3c4d
//! receipts_files=12
//! tax_document_files=3
//! docs_files=0
//! uploads=archived
//! docs=not_configured
//! ```
//!
//! The manifest is written last, after every content step has either
//! succeeded or been recorded as skipped, via create-temp-then-rename so a
//! crash never leaves a half-written manifest in a snapshot.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};

use super::errors::{SnapshotError, SnapshotResult};

/// Archive disposition recorded per tree
pub mod status {
    /// Tree archived into the snapshot
    pub const ARCHIVED: &str = "archived";
    /// Tree missing on disk, step skipped
    pub const ABSENT: &str = "absent";
    /// Tree not configured for this deployment
    pub const NOT_CONFIGURED: &str = "not_configured";
    /// Archival attempted and failed (snapshot still usable for the database)
    pub const FAILED: &str = "failed";
}

/// Snapshot manifest contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotManifest {
    /// Snapshot creation time, RFC3339
    pub timestamp: String,
    /// Host the producer ran on
    pub host: String,
    /// Size of the database copy in bytes
    pub database_bytes: u64,
    /// crc32 of the database copy
    pub database_checksum: Option<String>,
    /// Receipt files archived (uploads root, excluding tax documents)
    pub receipts_files: u64,
    /// Tax document files archived (uploads/tax_docs)
    pub tax_document_files: u64,
    /// Secondary documents archived
    pub docs_files: u64,
    /// Uploads tree disposition (see [`status`])
    pub uploads: String,
    /// Docs tree disposition (see [`status`])
    pub docs: String,
}

impl SnapshotManifest {
    /// Start a manifest for a snapshot created at `when` on this host.
    pub fn new(when: DateTime<Utc>) -> Self {
        Self {
            timestamp: when.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            host: lookup_host(),
            database_bytes: 0,
            database_checksum: None,
            receipts_files: 0,
            tax_document_files: 0,
            docs_files: 0,
            uploads: status::ABSENT.to_string(),
            docs: status::NOT_CONFIGURED.to_string(),
        }
    }

    fn render(&self) -> String {
        let mut out = String::with_capacity(256);
        out.push_str(&format!("timestamp={}\n", self.timestamp));
        out.push_str(&format!("host={}\n", self.host));
        out.push_str(&format!("database_bytes={}\n", self.database_bytes));
        if let Some(ref checksum) = self.database_checksum {
            out.push_str(&format!("database_checksum={}\n", checksum));
        }
        out.push_str(&format!("receipts_files={}\n", self.receipts_files));
        out.push_str(&format!("tax_document_files={}\n", self.tax_document_files));
        out.push_str(&format!("docs_files={}\n", self.docs_files));
        out.push_str(&format!("uploads={}\n", self.uploads));
        out.push_str(&format!("docs={}\n", self.docs));
        out
    }

    /// Write the manifest atomically (temp file, fsync, rename).
    pub fn write_to_file(&self, path: &Path) -> SnapshotResult<()> {
        let tmp = path.with_extension("tmp");

        let mut file = File::create(&tmp).map_err(|e| {
            SnapshotError::manifest_with_source(
                format!("failed to create manifest temp file: {}", tmp.display()),
                e,
            )
        })?;
        file.write_all(self.render().as_bytes()).map_err(|e| {
            SnapshotError::manifest_with_source(
                format!("failed to write manifest: {}", tmp.display()),
                e,
            )
        })?;
        file.sync_all().map_err(|e| {
            SnapshotError::io_error(format!("failed to fsync manifest: {}", tmp.display()), e)
        })?;
        drop(file);

        fs::rename(&tmp, path).map_err(|e| {
            SnapshotError::manifest_with_source(
                format!("failed to move manifest into place: {}", path.display()),
                e,
            )
        })?;

        if let Some(parent) = path.parent() {
            fsync_dir(parent)?;
        }

        Ok(())
    }

    /// Read a manifest back. Unknown keys are ignored so newer producers stay
    /// readable by older consumers.
    pub fn read_from_file(path: &Path) -> SnapshotResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            SnapshotError::manifest_with_source(
                format!("failed to read manifest: {}", path.display()),
                e,
            )
        })?;

        let mut manifest = Self {
            timestamp: String::new(),
            host: String::new(),
            database_bytes: 0,
            database_checksum: None,
            receipts_files: 0,
            tax_document_files: 0,
            docs_files: 0,
            uploads: status::ABSENT.to_string(),
            docs: status::NOT_CONFIGURED.to_string(),
        };

        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                SnapshotError::manifest(format!(
                    "malformed manifest line {} in {}: '{}'",
                    line_no + 1,
                    path.display(),
                    line
                ))
            })?;

            let value = value.trim();
            match key.trim() {
                "timestamp" => manifest.timestamp = value.to_string(),
                "host" => manifest.host = value.to_string(),
                "database_bytes" => manifest.database_bytes = parse_count(path, key, value)?,
                "database_checksum" => manifest.database_checksum = Some(value.to_string()),
                "receipts_files" => manifest.receipts_files = parse_count(path, key, value)?,
                "tax_document_files" => {
                    manifest.tax_document_files = parse_count(path, key, value)?
                }
                "docs_files" => manifest.docs_files = parse_count(path, key, value)?,
                "uploads" => manifest.uploads = value.to_string(),
                "docs" => manifest.docs = value.to_string(),
                _ => {}
            }
        }

        Ok(manifest)
    }
}

fn parse_count(path: &Path, key: &str, value: &str) -> SnapshotResult<u64> {
    value.parse::<u64>().map_err(|_| {
        SnapshotError::manifest(format!(
            "non-numeric {} in {}: '{}'",
            key,
            path.display(),
            value
        ))
    })
}

/// Host identifier for the manifest: `hostname`, then $HOSTNAME, then a
/// placeholder. Never fails a backup over a name.
fn lookup_host() -> String {
    if let Ok(output) = Command::new("hostname").output() {
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !name.is_empty() {
                return name;
            }
        }
    }
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

/// fsync a directory so a renamed-in manifest survives power loss.
pub fn fsync_dir(path: &Path) -> SnapshotResult<()> {
    let dir = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| SnapshotError::io_error_at_path(path, e))?;

    dir.sync_all().map_err(|e| {
        SnapshotError::io_error(format!("fsync directory failed: {}", path.display()), e)
    })
}
