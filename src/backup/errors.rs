//! Backup-specific error types
//!
//! A `BackupError` returned from the producer is always fatal-local: the run
//! aborts, the process exits non-zero, and no partial snapshot is left as
//! `latest`. Recoverable conditions (missing uploads tree, failed docs
//! archive, unreachable mirror) never become a `BackupError`; they are
//! recorded as step outcomes and the run continues.

use std::fmt;
use std::io;

/// Backup error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupErrorCode {
    /// Live database missing or the consistent copy failed
    FvBackupDatabase,
    /// I/O failure while laying out the snapshot
    FvBackupIo,
    /// Archive packing failure promoted to fatal (snapshot dir unusable)
    FvBackupArchive,
    /// Remote mirror failure (always recoverable at the producer level)
    FvBackupRemote,
}

impl BackupErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupErrorCode::FvBackupDatabase => "FV_BACKUP_DATABASE",
            BackupErrorCode::FvBackupIo => "FV_BACKUP_IO",
            BackupErrorCode::FvBackupArchive => "FV_BACKUP_ARCHIVE",
            BackupErrorCode::FvBackupRemote => "FV_BACKUP_REMOTE",
        }
    }
}

impl fmt::Display for BackupErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Backup error with full context
#[derive(Debug)]
pub struct BackupError {
    code: BackupErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl BackupError {
    fn new(code: BackupErrorCode, message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(BackupErrorCode::FvBackupDatabase, message, None)
    }

    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(BackupErrorCode::FvBackupIo, message, Some(source))
    }

    pub fn io_error_at_path(path: &std::path::Path, source: io::Error) -> Self {
        Self::io_error(format!("I/O error at {}", path.display()), source)
    }

    pub fn archive(message: impl Into<String>) -> Self {
        Self::new(BackupErrorCode::FvBackupArchive, message, None)
    }

    pub fn archive_with_source(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(BackupErrorCode::FvBackupArchive, message, Some(source))
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(BackupErrorCode::FvBackupRemote, message, None)
    }

    pub fn code(&self) -> BackupErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for BackupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<crate::snapshot::SnapshotError> for BackupError {
    fn from(err: crate::snapshot::SnapshotError) -> Self {
        BackupError::new(
            BackupErrorCode::FvBackupIo,
            format!("snapshot error: {}", err),
            None,
        )
    }
}

/// Result type for backup operations
pub type BackupResult<T> = Result<T, BackupError>;
