//! Backup producer
//!
//! One producer run creates one snapshot:
//!
//! 1. Consistent database copy via the engine's online backup API
//!    (fatal on failure; the partial snapshot directory is removed)
//! 2. Uploads tree archived to `uploads.tar.gz` (skipped when absent)
//! 3. Optional docs tree archived to `docs.tar.gz` under the same policy
//! 4. Manifest written last, atomically, recording sizes, counts, and skips
//! 5. `latest` pointer retargeted atomically
//! 6. Retention cleanup (ordinary and safety prefixes, latest protected)
//! 7. Remote mirror sync (failure logged, local result stands)
//!
//! The run is sequential and synchronous; the caller holds the operation
//! lock. Step outcomes land in the shared [`RunReport`]; only database and
//! manifest failures abort.

mod archive;
mod database;
mod errors;
mod remote;
mod retention;

pub use archive::{archive_tree, count_files, ArchiveSummary};
pub use database::copy_database;
pub use errors::{BackupError, BackupErrorCode, BackupResult};
pub use remote::mirror_to_remote;
pub use retention::{prune_snapshots, RetentionSummary};

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::observability::Logger;
use crate::report::{RunReport, StepOutcome};
use crate::snapshot::{
    compute_file_checksum, format_checksum, point_latest_at, status, SnapshotManifest,
    SnapshotName, DOCS_ARCHIVE, MANIFEST_FILE, SAFETY_PREFIX, TAX_DOCS_DIR, UPLOADS_ARCHIVE,
};

/// What a successful producer run created
#[derive(Debug)]
pub struct BackupOutcome {
    pub snapshot_name: String,
    pub snapshot_path: PathBuf,
    pub manifest: SnapshotManifest,
    pub retention: RetentionSummary,
}

/// The backup producer
pub struct BackupProducer;

impl BackupProducer {
    /// Run a backup now.
    pub fn run(config: &Config, report: &mut RunReport) -> Result<BackupOutcome, BackupError> {
        Self::run_at(config, report, Utc::now())
    }

    /// Run a backup with an explicit clock (tested directly; `run` is the
    /// production entry point).
    pub fn run_at(
        config: &Config,
        report: &mut RunReport,
        now: DateTime<Utc>,
    ) -> Result<BackupOutcome, BackupError> {
        let db_path = config.database_path();
        let name = SnapshotName::generate(&config.snapshot_prefix, now);
        let snapshot_dir = config.backup_root.join(name.as_str());

        Logger::info(
            "BACKUP_STARTED",
            &[
                ("database", &db_path.display().to_string()),
                ("snapshot", name.as_str()),
            ],
        );

        if let Err(e) = fs::create_dir_all(&snapshot_dir) {
            let err = BackupError::io_error_at_path(&snapshot_dir, e);
            report.record("snapshot-directory", StepOutcome::failed(err.to_string()));
            report.mark_fatal();
            return Err(err);
        }

        let mut manifest = SnapshotManifest::new(now);

        // Database copy: the one step that can abort the run
        let db_dst = snapshot_dir.join(&config.database_file);
        let copy = copy_database(&db_path, &db_dst)
            .and_then(|size| {
                let checksum = compute_file_checksum(&db_dst)?;
                Ok((size, checksum))
            });
        match copy {
            Ok((size, checksum)) => {
                manifest.database_bytes = size;
                manifest.database_checksum = Some(format_checksum(checksum));
                report.record("database-copy", StepOutcome::Succeeded);
            }
            Err(e) => {
                report.record("database-copy", StepOutcome::failed(e.to_string()));
                report.mark_fatal();
                let _ = fs::remove_dir_all(&snapshot_dir);
                return Err(e);
            }
        }

        // Uploads archive: recoverable
        if config.uploads_dir.is_dir() {
            match archive_tree(&config.uploads_dir, &snapshot_dir.join(UPLOADS_ARCHIVE)) {
                Ok(_) => {
                    manifest.uploads = status::ARCHIVED.to_string();
                    manifest.receipts_files = count_files(&config.uploads_dir, Some(TAX_DOCS_DIR));
                    manifest.tax_document_files = count_files(&config.tax_docs_path(), None);
                    report.record("uploads-archive", StepOutcome::Succeeded);
                }
                Err(e) => {
                    manifest.uploads = status::FAILED.to_string();
                    report.record("uploads-archive", StepOutcome::failed(e.to_string()));
                }
            }
        } else {
            manifest.uploads = status::ABSENT.to_string();
            report.record(
                "uploads-archive",
                StepOutcome::skipped(format!(
                    "uploads directory absent: {}",
                    config.uploads_dir.display()
                )),
            );
        }

        // Docs archive: same policy, doubly optional
        match &config.docs_dir {
            None => {
                manifest.docs = status::NOT_CONFIGURED.to_string();
                report.record("docs-archive", StepOutcome::skipped("docs directory not configured"));
            }
            Some(docs_dir) if !docs_dir.is_dir() => {
                manifest.docs = status::ABSENT.to_string();
                report.record(
                    "docs-archive",
                    StepOutcome::skipped(format!("docs directory absent: {}", docs_dir.display())),
                );
            }
            Some(docs_dir) => match archive_tree(docs_dir, &snapshot_dir.join(DOCS_ARCHIVE)) {
                Ok(summary) => {
                    manifest.docs = status::ARCHIVED.to_string();
                    manifest.docs_files = summary.files;
                    report.record("docs-archive", StepOutcome::Succeeded);
                }
                Err(e) => {
                    manifest.docs = status::FAILED.to_string();
                    report.record("docs-archive", StepOutcome::failed(e.to_string()));
                }
            },
        }

        // Manifest seals the snapshot; failure leaves it unusable, so abort
        // and never advance the latest pointer past it.
        if let Err(e) = manifest.write_to_file(&snapshot_dir.join(MANIFEST_FILE)) {
            report.record("manifest", StepOutcome::failed(e.to_string()));
            report.mark_fatal();
            let _ = fs::remove_dir_all(&snapshot_dir);
            return Err(e.into());
        }
        report.record("manifest", StepOutcome::Succeeded);

        if let Err(e) = point_latest_at(&config.backup_root, name.as_str()) {
            // Snapshot is complete and addressable by name; keep it, but the
            // run still fails so the broken pointer is noticed.
            report.record("latest-pointer", StepOutcome::failed(e.to_string()));
            report.mark_fatal();
            return Err(e.into());
        }
        report.record("latest-pointer", StepOutcome::Succeeded);

        // Retention: recoverable
        let retention = match prune_snapshots(
            &config.backup_root,
            &config.snapshot_prefix,
            config.retention_days,
            now,
        )
        .and_then(|mut summary| {
            let safety =
                prune_snapshots(&config.backup_root, SAFETY_PREFIX, config.retention_days, now)?;
            summary.removed.extend(safety.removed);
            summary.kept += safety.kept;
            Ok(summary)
        }) {
            Ok(summary) => {
                report.record("retention-cleanup", StepOutcome::Succeeded);
                summary
            }
            Err(e) => {
                report.record("retention-cleanup", StepOutcome::failed(e.to_string()));
                RetentionSummary::default()
            }
        };

        // Remote mirror: recoverable, local success already banked
        match &config.remote {
            None => {
                report.record("remote-mirror", StepOutcome::skipped("remote mirror not configured"));
            }
            Some(remote) => match mirror_to_remote(&config.backup_root, remote) {
                Ok(()) => report.record("remote-mirror", StepOutcome::Succeeded),
                Err(e) => report.record("remote-mirror", StepOutcome::failed(e.to_string())),
            },
        }

        Logger::info(
            "BACKUP_COMPLETED",
            &[
                ("removed", &retention.removed.len().to_string()),
                ("snapshot", name.as_str()),
            ],
        );

        Ok(BackupOutcome {
            snapshot_name: name.as_str().to_string(),
            snapshot_path: snapshot_dir,
            manifest,
            retention,
        })
    }
}
