//! CLI-specific error types
//!
//! Everything that stops a run before its pipeline starts: bad
//! configuration, a held lock. These always map to exit code 1.

use std::fmt;

use crate::config::ConfigError;
use crate::lock::LockError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration could not be loaded or validated
    ConfigError,
    /// The operation lock could not be acquired
    LockError,
}

impl CliErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CliErrorCode::ConfigError => "FV_CLI_CONFIG_ERROR",
            CliErrorCode::LockError => "FV_CLI_LOCK_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::new(CliErrorCode::ConfigError, e.to_string())
    }
}

impl From<LockError> for CliError {
    fn from(e: LockError) -> Self {
        Self::new(CliErrorCode::LockError, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_code() {
        let err = CliError::new(CliErrorCode::ConfigError, "bad retention");
        let text = err.to_string();
        assert!(text.contains("FV_CLI_CONFIG_ERROR"));
        assert!(text.contains("bad retention"));
    }

    #[test]
    fn test_from_lock_error() {
        let lock_err = LockError::AlreadyHeld("/tmp/x.lock".into());
        let err: CliError = lock_err.into();
        assert_eq!(err.code(), CliErrorCode::LockError);
        assert!(err.message().contains("already in progress"));
    }
}
