//! Restore-specific error types
//!
//! A `RestoreError` returned from the consumer is fatal-local: nothing was
//! mutated (unresolvable selector, missing confirmation channel) or the run
//! could not proceed at all. Failures after mutation begins are recorded as
//! step outcomes instead, because aborting mid-restore would leave worse
//! state than finishing with a reported failure.

use std::fmt;
use std::io;

/// Restore error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreErrorCode {
    /// Selector did not resolve to a snapshot
    FvRestoreSelector,
    /// Confirmation required but unavailable
    FvRestoreConfirmation,
    /// I/O failure before any mutation
    FvRestoreIo,
}

impl RestoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreErrorCode::FvRestoreSelector => "FV_RESTORE_SELECTOR",
            RestoreErrorCode::FvRestoreConfirmation => "FV_RESTORE_CONFIRMATION",
            RestoreErrorCode::FvRestoreIo => "FV_RESTORE_IO",
        }
    }
}

impl fmt::Display for RestoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Restore error with full context
#[derive(Debug)]
pub struct RestoreError {
    code: RestoreErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl RestoreError {
    fn new(code: RestoreErrorCode, message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    pub fn selector(message: impl Into<String>) -> Self {
        Self::new(RestoreErrorCode::FvRestoreSelector, message, None)
    }

    pub fn confirmation(message: impl Into<String>) -> Self {
        Self::new(RestoreErrorCode::FvRestoreConfirmation, message, None)
    }

    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(RestoreErrorCode::FvRestoreIo, message, Some(source))
    }

    pub fn io_error_at_path(path: &std::path::Path, source: io::Error) -> Self {
        Self::io_error(format!("I/O error at {}", path.display()), source)
    }

    pub fn code(&self) -> RestoreErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for RestoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<crate::snapshot::SnapshotError> for RestoreError {
    fn from(err: crate::snapshot::SnapshotError) -> Self {
        RestoreError::new(
            RestoreErrorCode::FvRestoreIo,
            format!("snapshot error: {}", err),
            None,
        )
    }
}

/// Result type for restore operations
pub type RestoreResult<T> = Result<T, RestoreError>;
