//! Snapshot directory naming
//!
//! Snapshot directories are named `<prefix>_<YYYYMMDD_HHMMSS>`. The embedded
//! timestamp is the snapshot's creation time in UTC and is the authoritative
//! age source for retention (directory mtimes change when a collection is
//! copied between disks; the name does not).
//!
//! Safety snapshots taken before a restore use the reserved prefix
//! `pre_restore` so they never show up in ordinary restore listings.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Reserved prefix for pre-restore safety snapshots
pub const SAFETY_PREFIX: &str = "pre_restore";

/// Timestamp layout inside snapshot names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A parsed, well-formed snapshot directory name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotName {
    raw: String,
    timestamp: NaiveDateTime,
}

impl SnapshotName {
    /// Name for a snapshot created at `when` under `prefix`.
    pub fn generate(prefix: &str, when: DateTime<Utc>) -> Self {
        let naive = when.naive_utc();
        Self {
            raw: format!("{}_{}", prefix, naive.format(TIMESTAMP_FORMAT)),
            timestamp: naive,
        }
    }

    /// Parse a directory name against an expected prefix.
    ///
    /// Returns `None` unless the name is exactly `<prefix>_<timestamp>` with a
    /// valid timestamp. Anything else in the backup root (temp files, other
    /// prefixes, stray directories) is invisible to listing and retention.
    pub fn parse(prefix: &str, raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(prefix)?.strip_prefix('_')?;
        let timestamp = NaiveDateTime::parse_from_str(rest, TIMESTAMP_FORMAT).ok()?;
        Some(Self {
            raw: raw.to_string(),
            timestamp,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Creation time encoded in the name, as UTC.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.timestamp.and_utc()
    }

    /// Timestamp rendered for operators, e.g. `2026-08-08 14:30:00`.
    pub fn human_timestamp(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

impl std::fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}
