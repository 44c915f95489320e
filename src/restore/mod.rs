//! Restore consumer
//!
//! A restore selects a snapshot, confirms with the operator, and replaces the
//! live database and uploads tree:
//!
//! 1. Resolve the selector (fresh listing; see [`selector`])
//! 2. Confirmation gate naming the resolved snapshot
//! 3. Stop the service (when one is configured)
//! 4. Safety snapshot of current state under the `pre_restore` prefix
//! 5. Database restore (checksum-verified against the snapshot manifest)
//! 6. Uploads restore (full tree replacement from the archive)
//! 7. Ownership and mode fix for the service account
//! 8. Start the service and poll until it reports running
//!
//! Once step 5 begins the run never aborts: a half-restored system plus a
//! clear failure report beats an automatic multi-step reversal, and the
//! safety snapshot always offers a manual way back. The consumer therefore
//! returns `Err` only before mutation; later failures are step outcomes in
//! the [`RunReport`].

mod errors;
mod selector;

pub use errors::{RestoreError, RestoreErrorCode, RestoreResult};
pub use selector::{print_listing, resolve, ResolvedSnapshot, Selector};

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use tar::Archive;

use crate::backup::{archive_tree, copy_database, count_files};
use crate::config::{Config, Owner};
use crate::observability::Logger;
use crate::report::{RunReport, StepOutcome};
use crate::service::{await_running, ServiceSupervisor, DEFAULT_RESUME_BUDGET};
use crate::snapshot::{
    compute_file_checksum, format_checksum, status, SnapshotManifest, SnapshotName,
    MANIFEST_FILE, SAFETY_PREFIX, TAX_DOCS_DIR, UPLOADS_ARCHIVE,
};

/// Operator interaction channel for the confirmation gate
pub trait Confirmer {
    /// Present `prompt` and return whether the operator affirmed.
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
}

/// How a restore run may interact and pace itself
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// A terminal is attached; prompting is possible
    pub interactive: bool,
    /// Skip the prompt and proceed (required for non-interactive restores)
    pub assume_yes: bool,
    /// Post-start health polling budget
    pub resume_budget: Duration,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            interactive: true,
            assume_yes: false,
            resume_budget: DEFAULT_RESUME_BUDGET,
        }
    }
}

/// Terminal state of a restore invocation
#[derive(Debug)]
pub enum RestoreOutcome {
    /// List mode: snapshots printed, nothing touched
    Listed,
    /// Operator declined the confirmation gate; nothing touched
    Cancelled,
    /// Destructive steps ran
    Restored {
        snapshot: String,
        /// Pre-restore state, when the safety snapshot could be taken
        safety_snapshot: Option<PathBuf>,
        /// Whether the service reported running within the budget
        service_resumed: bool,
    },
}

/// The restore consumer
pub struct RestoreConsumer;

impl RestoreConsumer {
    /// Run a restore (or listing) for `selector`.
    pub fn run(
        config: &Config,
        selector: Option<Selector>,
        options: &RestoreOptions,
        supervisor: Option<&dyn ServiceSupervisor>,
        confirmer: &mut dyn Confirmer,
        report: &mut RunReport,
    ) -> Result<RestoreOutcome, RestoreError> {
        let Some(selector) = selector else {
            print_listing(&config.backup_root, &config.snapshot_prefix)?;
            return Ok(RestoreOutcome::Listed);
        };

        let resolved = match resolve(&config.backup_root, &config.snapshot_prefix, &selector) {
            Ok(resolved) => resolved,
            Err(e) => {
                eprintln!("{}", e.message());
                // Help the operator pick again
                let _ = print_listing(&config.backup_root, &config.snapshot_prefix);
                report.mark_fatal();
                return Err(e);
            }
        };

        Logger::info(
            "RESTORE_STARTED",
            &[("snapshot", resolved.name.as_str())],
        );

        if !Self::confirmed(config, &resolved, options, confirmer, report)? {
            println!("Restore cancelled; nothing was changed.");
            Logger::info("RESTORE_CANCELLED", &[("snapshot", resolved.name.as_str())]);
            return Ok(RestoreOutcome::Cancelled);
        }

        // Step: stop the service before touching shared state
        match supervisor {
            None => report.record("service-stop", StepOutcome::skipped("no service configured")),
            Some(supervisor) => match supervisor.stop() {
                Ok(()) => report.record("service-stop", StepOutcome::Succeeded),
                Err(e) => report.record("service-stop", StepOutcome::failed(e.to_string())),
            },
        }

        // Step: preserve current state; never blocks the restore
        let safety_snapshot = match Self::create_safety_snapshot(config, Utc::now()) {
            Ok(Some(path)) => {
                report.record("safety-snapshot", StepOutcome::Succeeded);
                Some(path)
            }
            Ok(None) => {
                report.record(
                    "safety-snapshot",
                    StepOutcome::skipped("no live state to preserve"),
                );
                None
            }
            Err(e) => {
                report.record("safety-snapshot", StepOutcome::failed(e.to_string()));
                None
            }
        };

        // Step: database
        Self::restore_database(config, &resolved, report);

        // Step: uploads
        Self::restore_uploads(config, &resolved, report);

        // Step: ownership and mode for the service account
        Self::fix_ownership(config, report);

        // Step: bring the service back and verify it
        let service_resumed = match supervisor {
            None => {
                report.record("service-start", StepOutcome::skipped("no service configured"));
                true
            }
            Some(supervisor) => {
                let started = supervisor.start();
                let running = match started {
                    Ok(()) => await_running(supervisor, options.resume_budget),
                    Err(_) => false,
                };
                if running {
                    report.record("service-start", StepOutcome::Succeeded);
                } else {
                    let detail = match started {
                        Err(e) => format!("{} failed to start: {}", supervisor.describe(), e),
                        Ok(()) => format!(
                            "{} did not report running within {:?}",
                            supervisor.describe(),
                            options.resume_budget
                        ),
                    };
                    report.record("service-start", StepOutcome::failed(detail));
                    report.mark_post_mutation();
                    eprintln!(
                        "Data restored but the service did not resume. Start it manually, \
                         or restore the pre-restore safety snapshot if the data is wrong."
                    );
                }
                running
            }
        };

        if let Some(ref safety) = safety_snapshot {
            println!("Pre-restore state preserved at: {}", safety.display());
        }

        Logger::info(
            "RESTORE_COMPLETED",
            &[
                ("service_resumed", if service_resumed { "yes" } else { "no" }),
                ("snapshot", resolved.name.as_str()),
            ],
        );

        Ok(RestoreOutcome::Restored {
            snapshot: resolved.name,
            safety_snapshot,
            service_resumed,
        })
    }

    /// Apply the confirmation gate. `Ok(false)` means a graceful cancel.
    fn confirmed(
        config: &Config,
        resolved: &ResolvedSnapshot,
        options: &RestoreOptions,
        confirmer: &mut dyn Confirmer,
        report: &mut RunReport,
    ) -> RestoreResult<bool> {
        if options.assume_yes {
            Logger::info("CONFIRMATION_BYPASSED", &[("snapshot", resolved.name.as_str())]);
            return Ok(true);
        }

        if !options.interactive {
            report.mark_fatal();
            return Err(RestoreError::confirmation(
                "non-interactive restore requires --yes",
            ));
        }

        let when = SnapshotName::parse(&config.snapshot_prefix, &resolved.name)
            .or_else(|| SnapshotName::parse(SAFETY_PREFIX, &resolved.name))
            .map(|n| format!(" (created {})", n.human_timestamp()))
            .unwrap_or_default();

        let prompt = format!(
            "Restore snapshot {}{}? This overwrites the live database and uploads tree. [y/N] ",
            resolved.name, when
        );

        confirmer.confirm(&prompt).map_err(|e| {
            report.mark_fatal();
            RestoreError::confirmation(format!("could not read confirmation: {}", e))
        })
    }

    /// Capture current live state under the safety prefix.
    ///
    /// Returns `Ok(None)` when there is nothing to preserve. The caller
    /// treats `Err` as a recoverable step failure.
    fn create_safety_snapshot(
        config: &Config,
        now: DateTime<Utc>,
    ) -> RestoreResult<Option<PathBuf>> {
        let live_db = config.database_path();
        let have_db = live_db.exists();
        let have_uploads = config.uploads_dir.is_dir();

        if !have_db && !have_uploads {
            return Ok(None);
        }

        fs::create_dir_all(&config.backup_root)
            .map_err(|e| RestoreError::io_error_at_path(&config.backup_root, e))?;

        // Names have one-second resolution; a second restore in the same
        // second must not overwrite the first safety snapshot (or the very
        // snapshot being restored, when it is itself a safety snapshot).
        let mut name = SnapshotName::generate(SAFETY_PREFIX, now);
        let mut safety_dir = config.backup_root.join(name.as_str());
        let mut offset = 1;
        while safety_dir.exists() && offset <= 60 {
            name = SnapshotName::generate(SAFETY_PREFIX, now + chrono::Duration::seconds(offset));
            safety_dir = config.backup_root.join(name.as_str());
            offset += 1;
        }

        fs::create_dir(&safety_dir)
            .map_err(|e| RestoreError::io_error_at_path(&safety_dir, e))?;

        let result = Self::fill_safety_snapshot(config, now, &live_db, have_db, have_uploads, &safety_dir);
        if result.is_err() {
            // Half a safety snapshot is worse than none: it looks restorable
            let _ = fs::remove_dir_all(&safety_dir);
        }
        result.map(|()| Some(safety_dir))
    }

    fn fill_safety_snapshot(
        config: &Config,
        now: DateTime<Utc>,
        live_db: &Path,
        have_db: bool,
        have_uploads: bool,
        safety_dir: &Path,
    ) -> RestoreResult<()> {
        let mut manifest = SnapshotManifest::new(now);

        if have_db {
            let dst = safety_dir.join(&config.database_file);
            let size = copy_database(live_db, &dst).map_err(|e| {
                RestoreError::io_error(
                    format!("safety copy of {} failed: {}", live_db.display(), e),
                    io::Error::new(io::ErrorKind::Other, e.to_string()),
                )
            })?;
            manifest.database_bytes = size;
            manifest.database_checksum = compute_file_checksum(&dst).ok().map(format_checksum);
        }

        if have_uploads {
            archive_tree(&config.uploads_dir, &safety_dir.join(UPLOADS_ARCHIVE)).map_err(
                |e| {
                    RestoreError::io_error(
                        format!("safety archive of uploads failed: {}", e),
                        io::Error::new(io::ErrorKind::Other, e.to_string()),
                    )
                },
            )?;
            manifest.uploads = status::ARCHIVED.to_string();
            manifest.receipts_files = count_files(&config.uploads_dir, Some(TAX_DOCS_DIR));
            manifest.tax_document_files = count_files(&config.tax_docs_path(), None);
        }

        manifest.write_to_file(&safety_dir.join(MANIFEST_FILE))?;

        Ok(())
    }

    /// Copy the snapshot's database over the live one.
    fn restore_database(config: &Config, resolved: &ResolvedSnapshot, report: &mut RunReport) {
        let snapshot_db = resolved.path.join(&config.database_file);
        if !snapshot_db.exists() {
            report.record(
                "database-restore",
                StepOutcome::failed(format!(
                    "snapshot contains no database file: {}",
                    snapshot_db.display()
                )),
            );
            return;
        }

        // Verify against the manifest checksum before overwriting anything
        if let Ok(manifest) = SnapshotManifest::read_from_file(&resolved.path.join(MANIFEST_FILE)) {
            if let Some(expected) = manifest.database_checksum {
                match compute_file_checksum(&snapshot_db) {
                    Ok(actual) if format_checksum(actual) != expected => {
                        report.record(
                            "database-restore",
                            StepOutcome::failed(format!(
                                "checksum mismatch for {} (manifest {}, file {})",
                                snapshot_db.display(),
                                expected,
                                format_checksum(actual)
                            )),
                        );
                        return;
                    }
                    _ => {}
                }
            }
        }

        let live_db = config.database_path();
        let result = fs::create_dir_all(&config.data_dir)
            .and_then(|_| fs::copy(&snapshot_db, &live_db))
            .and_then(|_| File::open(&live_db))
            .and_then(|f| f.sync_all());

        match result {
            Ok(()) => report.record("database-restore", StepOutcome::Succeeded),
            Err(e) => report.record(
                "database-restore",
                StepOutcome::failed(format!("copy to {} failed: {}", live_db.display(), e)),
            ),
        }
    }

    /// Replace the live uploads tree from the snapshot archive.
    fn restore_uploads(config: &Config, resolved: &ResolvedSnapshot, report: &mut RunReport) {
        let archive = resolved.path.join(UPLOADS_ARCHIVE);
        if !archive.exists() {
            Logger::warn(
                "UPLOADS_ARCHIVE_MISSING",
                &[("snapshot", resolved.name.as_str())],
            );
            report.record(
                "uploads-restore",
                StepOutcome::skipped("snapshot contains no uploads archive"),
            );
            return;
        }

        let result = (|| -> io::Result<()> {
            if config.uploads_dir.exists() {
                fs::remove_dir_all(&config.uploads_dir)?;
            }
            fs::create_dir_all(&config.uploads_dir)?;
            let file = File::open(&archive)?;
            let mut tar = Archive::new(GzDecoder::new(file));
            tar.unpack(&config.uploads_dir)?;
            Ok(())
        })();

        match result {
            Ok(()) => report.record("uploads-restore", StepOutcome::Succeeded),
            Err(e) => report.record(
                "uploads-restore",
                StepOutcome::failed(format!(
                    "replacing {} failed: {}",
                    config.uploads_dir.display(),
                    e
                )),
            ),
        }
    }

    /// Hand restored files to the service account.
    fn fix_ownership(config: &Config, report: &mut RunReport) {
        let Some(ref owner) = config.service_owner else {
            report.record(
                "ownership-fix",
                StepOutcome::skipped("service owner not configured"),
            );
            return;
        };

        let result = (|| -> io::Result<()> {
            let live_db = config.database_path();
            if live_db.exists() {
                chown(owner, &live_db, false)?;
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&live_db, fs::Permissions::from_mode(0o640))?;
            }
            if config.uploads_dir.is_dir() {
                chown(owner, &config.uploads_dir, true)?;
            }
            Ok(())
        })();

        match result {
            Ok(()) => report.record("ownership-fix", StepOutcome::Succeeded),
            Err(e) => report.record("ownership-fix", StepOutcome::failed(e.to_string())),
        }
    }
}

/// chown via the system binary; name-based ownership needs the host's user
/// database and this runs as root in production anyway.
fn chown(owner: &Owner, path: &Path, recursive: bool) -> io::Result<()> {
    let mut cmd = Command::new("chown");
    if recursive {
        cmd.arg("-R");
    }
    let output = cmd.arg(owner.to_string()).arg(path).output()?;
    if output.status.success() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!(
                "chown {} {} failed: {}",
                owner,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupProducer;
    use crate::report::RunStatus;
    use crate::service::testing::ScriptedSupervisor;
    use chrono::TimeZone;
    use rusqlite::Connection;
    use tempfile::TempDir;

    struct ScriptedConfirmer {
        answer: bool,
        prompts: Vec<String>,
    }

    impl ScriptedConfirmer {
        fn yes() -> Self {
            Self {
                answer: true,
                prompts: Vec::new(),
            }
        }

        fn no() -> Self {
            Self {
                answer: false,
                prompts: Vec::new(),
            }
        }
    }

    impl Confirmer for ScriptedConfirmer {
        fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
            self.prompts.push(prompt.to_string());
            Ok(self.answer)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 8, 12, 0, 0).unwrap()
    }

    fn test_config(root: &Path) -> Config {
        Config {
            data_dir: root.join("data"),
            database_file: "finance.db".to_string(),
            uploads_dir: root.join("uploads"),
            docs_dir: None,
            backup_root: root.join("backups"),
            retention_days: 30,
            snapshot_prefix: "finance_backup".to_string(),
            lock_path: root.join("backups/.finvault.lock"),
            remote: None,
            service_unit: None,
            service_owner: None,
        }
    }

    fn seed_live_state(config: &Config, marker: &str) {
        fs::create_dir_all(&config.data_dir).unwrap();
        let conn = Connection::open(config.database_path()).unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS notes (body TEXT);
             DELETE FROM notes;
             INSERT INTO notes (body) VALUES ('{}');",
            marker
        ))
        .unwrap();

        fs::create_dir_all(&config.uploads_dir).unwrap();
        fs::write(config.uploads_dir.join("receipt.pdf"), marker).unwrap();
    }

    fn take_backup(config: &Config) -> String {
        let mut report = RunReport::new("backup");
        BackupProducer::run_at(config, &mut report, now())
            .unwrap()
            .snapshot_name
    }

    fn note_in_db(config: &Config) -> String {
        let conn = Connection::open(config.database_path()).unwrap();
        conn.query_row("SELECT body FROM notes", [], |row| row.get(0))
            .unwrap()
    }

    fn restore_with(
        config: &Config,
        selector: Option<Selector>,
        options: &RestoreOptions,
        confirmer: &mut dyn Confirmer,
    ) -> (Result<RestoreOutcome, RestoreError>, RunReport) {
        let mut report = RunReport::new("restore");
        let result = RestoreConsumer::run(config, selector, options, None, confirmer, &mut report);
        (result, report)
    }

    #[test]
    fn test_declined_confirmation_mutates_nothing() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        seed_live_state(&config, "original");
        let snapshot = take_backup(&config);
        seed_live_state(&config, "changed-since-backup");

        let db_before = fs::read(config.database_path()).unwrap();
        let mut confirmer = ScriptedConfirmer::no();
        let (result, report) = restore_with(
            &config,
            Some(Selector::Name(snapshot)),
            &RestoreOptions::default(),
            &mut confirmer,
        );

        assert!(matches!(result.unwrap(), RestoreOutcome::Cancelled));
        assert_eq!(report.exit_code(), 0);
        assert_eq!(fs::read(config.database_path()).unwrap(), db_before);
        assert_eq!(
            fs::read_to_string(config.uploads_dir.join("receipt.pdf")).unwrap(),
            "changed-since-backup"
        );
        // No safety snapshot was taken either
        assert!(crate::snapshot::list_snapshots(&config.backup_root, SAFETY_PREFIX)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_prompt_names_resolved_snapshot() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        seed_live_state(&config, "original");
        let snapshot = take_backup(&config);

        let mut confirmer = ScriptedConfirmer::no();
        let _ = restore_with(
            &config,
            Some(Selector::Ordinal(1)),
            &RestoreOptions::default(),
            &mut confirmer,
        );

        assert_eq!(confirmer.prompts.len(), 1);
        assert!(confirmer.prompts[0].contains(&snapshot));
        assert!(confirmer.prompts[0].contains("2026-08-08 12:00:00"));
    }

    #[test]
    fn test_full_restore_round_trip() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        seed_live_state(&config, "original");
        take_backup(&config);
        seed_live_state(&config, "damaged");

        let mut confirmer = ScriptedConfirmer::yes();
        let (result, report) = restore_with(
            &config,
            Some(Selector::Latest),
            &RestoreOptions::default(),
            &mut confirmer,
        );

        let outcome = result.unwrap();
        match outcome {
            RestoreOutcome::Restored {
                safety_snapshot, ..
            } => {
                let safety = safety_snapshot.expect("safety snapshot should exist");
                assert!(safety.join("finance.db").exists());
                assert!(safety.join(UPLOADS_ARCHIVE).exists());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert_eq!(note_in_db(&config), "original");
        assert_eq!(
            fs::read_to_string(config.uploads_dir.join("receipt.pdf")).unwrap(),
            "original"
        );
        assert_eq!(report.status(), RunStatus::Success);
    }

    #[test]
    fn test_non_interactive_requires_assume_yes() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        seed_live_state(&config, "original");
        let snapshot = take_backup(&config);

        let options = RestoreOptions {
            interactive: false,
            assume_yes: false,
            resume_budget: Duration::from_millis(10),
        };
        let mut confirmer = ScriptedConfirmer::yes();
        let (result, report) = restore_with(
            &config,
            Some(Selector::Name(snapshot)),
            &options,
            &mut confirmer,
        );

        let err = result.unwrap_err();
        assert_eq!(err.code(), RestoreErrorCode::FvRestoreConfirmation);
        assert_eq!(report.exit_code(), 1);
        // The prompt was never shown
        assert!(confirmer.prompts.is_empty());
    }

    #[test]
    fn test_missing_uploads_archive_is_warning_only() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());

        // Back up a database-only deployment (no uploads tree)
        fs::create_dir_all(&config.data_dir).unwrap();
        let conn = Connection::open(config.database_path()).unwrap();
        conn.execute_batch("CREATE TABLE notes (body TEXT); INSERT INTO notes VALUES ('original');")
            .unwrap();
        drop(conn);
        take_backup(&config);

        // Damage the database afterwards
        let conn = Connection::open(config.database_path()).unwrap();
        conn.execute("UPDATE notes SET body = 'damaged'", []).unwrap();
        drop(conn);

        let mut confirmer = ScriptedConfirmer::yes();
        let (result, report) = restore_with(
            &config,
            Some(Selector::Latest),
            &RestoreOptions::default(),
            &mut confirmer,
        );

        assert!(matches!(result.unwrap(), RestoreOutcome::Restored { .. }));
        assert_eq!(note_in_db(&config), "original");
        assert_eq!(report.status(), RunStatus::Success);

        let uploads_step = report
            .steps()
            .iter()
            .find(|s| s.name == "uploads-restore")
            .unwrap();
        assert!(matches!(uploads_step.outcome, StepOutcome::Skipped(_)));
    }

    #[test]
    fn test_unresolvable_name_is_fatal_and_untouched() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        seed_live_state(&config, "original");
        take_backup(&config);

        let db_before = fs::read(config.database_path()).unwrap();
        let mut confirmer = ScriptedConfirmer::yes();
        let (result, report) = restore_with(
            &config,
            Some(Selector::Name("nonexistent_name".to_string())),
            &RestoreOptions::default(),
            &mut confirmer,
        );

        let err = result.unwrap_err();
        assert_eq!(err.code(), RestoreErrorCode::FvRestoreSelector);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(fs::read(config.database_path()).unwrap(), db_before);
    }

    #[test]
    fn test_service_lifecycle_around_restore() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        seed_live_state(&config, "original");
        take_backup(&config);

        let supervisor = ScriptedSupervisor::new(vec![true]);
        let mut confirmer = ScriptedConfirmer::yes();
        let mut report = RunReport::new("restore");
        let result = RestoreConsumer::run(
            &config,
            Some(Selector::Latest),
            &RestoreOptions::default(),
            Some(&supervisor),
            &mut confirmer,
            &mut report,
        );

        match result.unwrap() {
            RestoreOutcome::Restored {
                service_resumed, ..
            } => assert!(service_resumed),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let calls = supervisor.calls.lock().unwrap();
        assert_eq!(*calls, vec!["stop", "start"]);
        assert_eq!(report.status(), RunStatus::Success);
    }

    #[test]
    fn test_failed_resume_is_post_mutation() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        seed_live_state(&config, "original");
        take_backup(&config);
        seed_live_state(&config, "damaged");

        let supervisor = ScriptedSupervisor::new(vec![false]);
        let mut confirmer = ScriptedConfirmer::yes();
        let mut report = RunReport::new("restore");
        let options = RestoreOptions {
            resume_budget: Duration::from_millis(100),
            ..RestoreOptions::default()
        };
        let result = RestoreConsumer::run(
            &config,
            Some(Selector::Latest),
            &options,
            Some(&supervisor),
            &mut confirmer,
            &mut report,
        );

        match result.unwrap() {
            RestoreOutcome::Restored {
                service_resumed, ..
            } => assert!(!service_resumed),
            other => panic!("unexpected outcome: {:?}", other),
        }

        // Data restored, exit code signals the resume failure
        assert_eq!(note_in_db(&config), "original");
        assert_eq!(report.status(), RunStatus::PostMutation);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_safety_snapshot_uses_reserved_prefix() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        seed_live_state(&config, "original");
        take_backup(&config);

        let mut confirmer = ScriptedConfirmer::yes();
        let (result, _) = restore_with(
            &config,
            Some(Selector::Latest),
            &RestoreOptions::default(),
            &mut confirmer,
        );
        let _ = result.unwrap();

        let safeties =
            crate::snapshot::list_snapshots(&config.backup_root, SAFETY_PREFIX).unwrap();
        assert_eq!(safeties.len(), 1);
        // Safety snapshots stay out of the ordinary listing
        let ordinary =
            crate::snapshot::list_snapshots(&config.backup_root, &config.snapshot_prefix).unwrap();
        assert_eq!(ordinary.len(), 1);
    }

    #[test]
    fn test_checksum_mismatch_blocks_database_overwrite() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        seed_live_state(&config, "original");
        let snapshot = take_backup(&config);

        // Corrupt the snapshot's database after the manifest sealed it
        let snapshot_db = config.backup_root.join(&snapshot).join("finance.db");
        fs::write(&snapshot_db, b"garbage").unwrap();

        seed_live_state(&config, "still-live");
        let mut confirmer = ScriptedConfirmer::yes();
        let (result, report) = restore_with(
            &config,
            Some(Selector::Name(snapshot)),
            &RestoreOptions::default(),
            &mut confirmer,
        );

        let _ = result.unwrap();
        let db_step = report
            .steps()
            .iter()
            .find(|s| s.name == "database-restore")
            .unwrap();
        assert!(matches!(db_step.outcome, StepOutcome::Failed(_)));
        assert_eq!(note_in_db(&config), "still-live");
    }
}
