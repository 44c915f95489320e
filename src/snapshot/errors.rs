//! Snapshot-specific error types
//!
//! Structured error codes in FV_CATEGORY_NAME format with a human-readable
//! message and, where available, the underlying I/O error. Snapshot errors
//! surface through the producer or consumer that hit them; severity and exit
//! semantics are decided there.

use std::fmt;
use std::io;

/// Snapshot error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotErrorCode {
    /// Listing or pointer I/O failure
    FvSnapshotIo,
    /// Manifest read/write/parse failure
    FvSnapshotManifest,
}

impl SnapshotErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotErrorCode::FvSnapshotIo => "FV_SNAPSHOT_IO",
            SnapshotErrorCode::FvSnapshotManifest => "FV_SNAPSHOT_MANIFEST",
        }
    }
}

impl fmt::Display for SnapshotErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot error with full context
#[derive(Debug)]
pub struct SnapshotError {
    code: SnapshotErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl SnapshotError {
    fn new(code: SnapshotErrorCode, message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(SnapshotErrorCode::FvSnapshotIo, message, Some(source))
    }

    pub fn io_error_at_path(path: &std::path::Path, source: io::Error) -> Self {
        Self::io_error(format!("I/O error at {}", path.display()), source)
    }

    pub fn manifest(message: impl Into<String>) -> Self {
        Self::new(SnapshotErrorCode::FvSnapshotManifest, message, None)
    }

    pub fn manifest_with_source(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(SnapshotErrorCode::FvSnapshotManifest, message, Some(source))
    }

    pub fn code(&self) -> SnapshotErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SnapshotErrorCode::FvSnapshotIo.as_str(), "FV_SNAPSHOT_IO");
        assert_eq!(
            SnapshotErrorCode::FvSnapshotManifest.as_str(),
            "FV_SNAPSHOT_MANIFEST"
        );
    }

    #[test]
    fn test_display_includes_source() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = SnapshotError::io_error("could not read listing", io_err);

        let text = err.to_string();
        assert!(text.contains("FV_SNAPSHOT_IO"));
        assert!(text.contains("could not read listing"));
        assert!(text.contains("caused by"));
    }

    #[test]
    fn test_manifest_error() {
        let err = SnapshotError::manifest("bad line");
        assert_eq!(err.code(), SnapshotErrorCode::FvSnapshotManifest);
        assert_eq!(err.message(), "bad line");
    }
}
