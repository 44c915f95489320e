//! Snapshot selection
//!
//! The restore subcommand takes one optional selector:
//!
//! - absent: list mode, nothing is mutated
//! - `latest`: whatever the latest pointer resolves to
//! - a positive integer: ordinal into the reverse-chronological listing,
//!   numbered from 1
//! - anything else: an explicit snapshot directory name
//!
//! Ordinals resolve against a listing computed at restore time. A listing
//! printed minutes ago may be stale (a scheduled backup can land in
//! between), so resolution never reuses it.

use std::path::{Path, PathBuf};

use crate::snapshot::{list_snapshots, read_latest, SnapshotEntry, SnapshotName, SAFETY_PREFIX};

use super::errors::{RestoreError, RestoreResult};

/// Parsed restore selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Latest,
    Ordinal(usize),
    Name(String),
}

impl Selector {
    /// Classify a raw argument. `latest` and positive integers are reserved;
    /// everything else is an explicit name.
    pub fn parse(raw: &str) -> Selector {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("latest") {
            return Selector::Latest;
        }
        match trimmed.parse::<usize>() {
            Ok(n) if n > 0 => Selector::Ordinal(n),
            _ => Selector::Name(trimmed.to_string()),
        }
    }
}

/// A selector resolved to a concrete snapshot directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSnapshot {
    /// Directory name, shown to the operator at the confirmation gate
    pub name: String,
    pub path: PathBuf,
}

/// Resolve a selector against the collection as it exists right now.
pub fn resolve(
    backup_root: &Path,
    prefix: &str,
    selector: &Selector,
) -> RestoreResult<ResolvedSnapshot> {
    match selector {
        Selector::Latest => {
            let target = read_latest(backup_root)?.ok_or_else(|| {
                RestoreError::selector(format!(
                    "no latest pointer under {}",
                    backup_root.display()
                ))
            })?;
            if !target.is_dir() {
                return Err(RestoreError::selector(format!(
                    "latest pointer is dangling: {}",
                    target.display()
                )));
            }
            Ok(ResolvedSnapshot {
                name: dir_name(&target),
                path: target,
            })
        }

        Selector::Ordinal(n) => {
            let listing = list_snapshots(backup_root, prefix)?;
            let entry = listing.get(n - 1).ok_or_else(|| {
                RestoreError::selector(format!(
                    "ordinal {} out of range: {} snapshot(s) available",
                    n,
                    listing.len()
                ))
            })?;
            Ok(ResolvedSnapshot {
                name: entry.name.as_str().to_string(),
                path: entry.path.clone(),
            })
        }

        Selector::Name(name) => {
            // Explicit names may reference anything under the backup root,
            // safety snapshots included; they just must exist.
            let path = backup_root.join(name);
            if !path.is_dir() {
                return Err(RestoreError::selector(format!("snapshot '{}' not found", name)));
            }
            Ok(ResolvedSnapshot {
                name: name.clone(),
                path,
            })
        }
    }
}

/// Print the numbered listing used by list mode and selector diagnostics.
pub fn print_listing(backup_root: &Path, prefix: &str) -> RestoreResult<Vec<SnapshotEntry>> {
    let listing = list_snapshots(backup_root, prefix)?;

    if listing.is_empty() {
        println!("No snapshots under {}", backup_root.display());
        return Ok(listing);
    }

    println!("Snapshots under {} (newest first):", backup_root.display());
    for (index, entry) in listing.iter().enumerate() {
        println!(
            "  {:>3}. {}  ({})",
            index + 1,
            entry.name.as_str(),
            entry.name.human_timestamp()
        );
    }

    let safety = list_snapshots(backup_root, SAFETY_PREFIX)?;
    if !safety.is_empty() {
        println!(
            "  ({} pre-restore safety snapshot(s) available by explicit name)",
            safety.len()
        );
    }

    Ok(listing)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::point_latest_at;
    use chrono::{Duration, TimeZone, Utc};
    use std::fs;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_parse_classification() {
        assert_eq!(Selector::parse("latest"), Selector::Latest);
        assert_eq!(Selector::parse("LATEST"), Selector::Latest);
        assert_eq!(Selector::parse("3"), Selector::Ordinal(3));
        assert_eq!(Selector::parse(" 12 "), Selector::Ordinal(12));
        // Zero is not a valid ordinal; treat it as a (doomed) name
        assert_eq!(Selector::parse("0"), Selector::Name("0".to_string()));
        assert_eq!(
            Selector::parse("finance_backup_20260808_120000"),
            Selector::Name("finance_backup_20260808_120000".to_string())
        );
    }

    fn seed(root: &Path, count: usize) -> Vec<String> {
        let base = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        let mut names = Vec::new();
        for i in 0..count {
            let name = SnapshotName::generate("finance_backup", base + Duration::days(i as i64));
            fs::create_dir_all(root.join(name.as_str())).unwrap();
            names.push(name.as_str().to_string());
            // Distinct mtimes, oldest first
            thread::sleep(std::time::Duration::from_millis(15));
        }
        names
    }

    #[test]
    fn test_ordinal_resolves_reverse_chronological() {
        let dir = TempDir::new().unwrap();
        let names = seed(dir.path(), 5);

        // Ordinal 3 of 5 is the 3rd most recent, i.e. names[2] from the end
        let resolved = resolve(dir.path(), "finance_backup", &Selector::Ordinal(3)).unwrap();
        assert_eq!(resolved.name, names[2]);

        let first = resolve(dir.path(), "finance_backup", &Selector::Ordinal(1)).unwrap();
        assert_eq!(first.name, names[4]);
    }

    #[test]
    fn test_ordinal_out_of_range() {
        let dir = TempDir::new().unwrap();
        seed(dir.path(), 2);

        let err = resolve(dir.path(), "finance_backup", &Selector::Ordinal(3)).unwrap_err();
        assert!(err.message().contains("out of range"));
        assert!(err.message().contains("2 snapshot(s)"));
    }

    #[test]
    fn test_latest_resolution() {
        let dir = TempDir::new().unwrap();
        let names = seed(dir.path(), 3);
        point_latest_at(dir.path(), &names[1]).unwrap();

        let resolved = resolve(dir.path(), "finance_backup", &Selector::Latest).unwrap();
        assert_eq!(resolved.name, names[1]);
        assert_eq!(resolved.path, dir.path().join(&names[1]));
    }

    #[test]
    fn test_latest_missing_pointer() {
        let dir = TempDir::new().unwrap();
        seed(dir.path(), 1);

        let err = resolve(dir.path(), "finance_backup", &Selector::Latest).unwrap_err();
        assert!(err.message().contains("latest"));
    }

    #[test]
    fn test_latest_dangling_pointer() {
        let dir = TempDir::new().unwrap();
        point_latest_at(dir.path(), "finance_backup_20990101_000000").unwrap();

        let err = resolve(dir.path(), "finance_backup", &Selector::Latest).unwrap_err();
        assert!(err.message().contains("dangling"));
    }

    #[test]
    fn test_name_resolution_allows_safety_snapshots() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pre_restore_20260808_090000")).unwrap();

        let resolved = resolve(
            dir.path(),
            "finance_backup",
            &Selector::Name("pre_restore_20260808_090000".to_string()),
        )
        .unwrap();
        assert_eq!(resolved.name, "pre_restore_20260808_090000");
    }

    #[test]
    fn test_unknown_name_not_found() {
        let dir = TempDir::new().unwrap();

        let err = resolve(
            dir.path(),
            "finance_backup",
            &Selector::Name("nonexistent_name".to_string()),
        )
        .unwrap_err();
        assert!(err.message().contains("not found"));
    }

    #[test]
    fn test_resolution_is_fresh_each_call() {
        let dir = TempDir::new().unwrap();
        let names = seed(dir.path(), 2);

        let before = resolve(dir.path(), "finance_backup", &Selector::Ordinal(1)).unwrap();
        assert_eq!(before.name, names[1]);

        // A new snapshot lands between invocations
        thread::sleep(std::time::Duration::from_millis(15));
        let newer = SnapshotName::generate(
            "finance_backup",
            Utc.with_ymd_and_hms(2026, 8, 20, 0, 0, 0).unwrap(),
        );
        fs::create_dir_all(dir.path().join(newer.as_str())).unwrap();

        let after = resolve(dir.path(), "finance_backup", &Selector::Ordinal(1)).unwrap();
        assert_eq!(after.name, newer.as_str());
    }
}
