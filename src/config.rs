//! Runtime configuration
//!
//! All configuration comes from environment variables, read exactly once by
//! [`Config::from_env`] at process start. Nothing else in the crate touches the
//! ambient environment; producers and consumers receive an explicit `&Config`.
//!
//! Recognized variables and defaults:
//!
//! | Variable                     | Default                      |
//! |------------------------------|------------------------------|
//! | `FINVAULT_DATA_DIR`          | `/srv/finance/data`          |
//! | `FINVAULT_DATABASE_FILE`     | `finance.db`                 |
//! | `FINVAULT_UPLOADS_DIR`       | `/srv/finance/uploads`       |
//! | `FINVAULT_DOCS_DIR`          | unset (docs archive skipped) |
//! | `FINVAULT_BACKUP_ROOT`       | `/srv/finance/backups`       |
//! | `FINVAULT_RETENTION_DAYS`    | `30`                         |
//! | `FINVAULT_SNAPSHOT_PREFIX`   | `finance_backup`             |
//! | `FINVAULT_LOCK_FILE`         | `<backup_root>/.finvault.lock` |
//! | `FINVAULT_REMOTE_DEST`       | unset (mirroring skipped)    |
//! | `FINVAULT_REMOTE_SSH_KEY`    | unset                        |
//! | `FINVAULT_REMOTE_TIMEOUT_SECS` | `60`                       |
//! | `FINVAULT_SERVICE_NAME`      | unset (service steps skipped)|
//! | `FINVAULT_SERVICE_OWNER`     | unset (ownership fix skipped)|

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors (always fatal: the process refuses to start)
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: '{1}' ({2})")]
    InvalidValue(&'static str, String, String),

    #[error("{0} must be set when {1} is set")]
    MissingCompanion(&'static str, &'static str),
}

/// Remote mirror endpoint (rsync over ssh)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// rsync destination, `user@host:/path`
    pub dest: String,
    /// Optional ssh identity file
    pub ssh_key: Option<PathBuf>,
    /// Connect and transfer timeout, seconds
    pub timeout_secs: u64,
}

/// Owner applied to restored files, `user` or `user:group`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub user: String,
    pub group: Option<String>,
}

impl Owner {
    /// Parse `user` or `user:group`. Empty user or group is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(2, ':');
        let user = parts.next()?.trim();
        if user.is_empty() {
            return None;
        }
        let group = match parts.next() {
            Some(g) => {
                let g = g.trim();
                if g.is_empty() {
                    return None;
                }
                Some(g.to_string())
            }
            None => None,
        };
        Some(Owner {
            user: user.to_string(),
            group,
        })
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}:{}", self.user, group),
            None => write!(f, "{}", self.user),
        }
    }
}

/// Complete runtime configuration for a backup or restore run
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing the live database file
    pub data_dir: PathBuf,
    /// Database file name inside `data_dir`
    pub database_file: String,
    /// Live uploads tree (receipts at the root, tax documents under tax_docs/)
    pub uploads_dir: PathBuf,
    /// Optional secondary documents tree
    pub docs_dir: Option<PathBuf>,
    /// Snapshot collection root
    pub backup_root: PathBuf,
    /// Snapshots older than this many days are eligible for deletion
    pub retention_days: u32,
    /// Ordinary snapshot name prefix
    pub snapshot_prefix: String,
    /// Advisory lock file guarding both operations
    pub lock_path: PathBuf,
    /// Remote mirror endpoint, when configured
    pub remote: Option<RemoteConfig>,
    /// systemd unit of the web application, when controllable
    pub service_unit: Option<String>,
    /// Owner applied to restored state, when known
    pub service_owner: Option<Owner>,
}

const DEFAULT_DATA_DIR: &str = "/srv/finance/data";
const DEFAULT_DATABASE_FILE: &str = "finance.db";
const DEFAULT_UPLOADS_DIR: &str = "/srv/finance/uploads";
const DEFAULT_BACKUP_ROOT: &str = "/srv/finance/backups";
const DEFAULT_RETENTION_DAYS: u32 = 30;
const DEFAULT_SNAPSHOT_PREFIX: &str = "finance_backup";
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 60;
const LOCK_FILE_NAME: &str = ".finvault.lock";

impl Config {
    /// Load configuration from the process environment.
    ///
    /// This is the only place the environment is read; call it once at startup
    /// and pass the result down.
    pub fn from_env() -> ConfigResult<Self> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build a configuration from an explicit variable map (testable core of
    /// [`Config::from_env`]).
    pub fn from_vars(vars: &HashMap<String, String>) -> ConfigResult<Self> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let data_dir = PathBuf::from(get("FINVAULT_DATA_DIR").unwrap_or(DEFAULT_DATA_DIR));
        let database_file = get("FINVAULT_DATABASE_FILE")
            .unwrap_or(DEFAULT_DATABASE_FILE)
            .to_string();
        let uploads_dir = PathBuf::from(get("FINVAULT_UPLOADS_DIR").unwrap_or(DEFAULT_UPLOADS_DIR));
        let docs_dir = get("FINVAULT_DOCS_DIR").map(PathBuf::from);
        let backup_root = PathBuf::from(get("FINVAULT_BACKUP_ROOT").unwrap_or(DEFAULT_BACKUP_ROOT));

        let retention_days = match get("FINVAULT_RETENTION_DAYS") {
            Some(raw) => raw.parse::<u32>().map_err(|e| {
                ConfigError::InvalidValue("FINVAULT_RETENTION_DAYS", raw.to_string(), e.to_string())
            })?,
            None => DEFAULT_RETENTION_DAYS,
        };

        let snapshot_prefix = get("FINVAULT_SNAPSHOT_PREFIX")
            .unwrap_or(DEFAULT_SNAPSHOT_PREFIX)
            .to_string();
        if snapshot_prefix.contains('/') {
            return Err(ConfigError::InvalidValue(
                "FINVAULT_SNAPSHOT_PREFIX",
                snapshot_prefix,
                "prefix must not contain '/'".to_string(),
            ));
        }

        let lock_path = get("FINVAULT_LOCK_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| backup_root.join(LOCK_FILE_NAME));

        let remote = match get("FINVAULT_REMOTE_DEST") {
            Some(dest) => {
                if !dest.contains(':') {
                    return Err(ConfigError::InvalidValue(
                        "FINVAULT_REMOTE_DEST",
                        dest.to_string(),
                        "expected user@host:/path".to_string(),
                    ));
                }
                let timeout_secs = match get("FINVAULT_REMOTE_TIMEOUT_SECS") {
                    Some(raw) => raw.parse::<u64>().map_err(|e| {
                        ConfigError::InvalidValue(
                            "FINVAULT_REMOTE_TIMEOUT_SECS",
                            raw.to_string(),
                            e.to_string(),
                        )
                    })?,
                    None => DEFAULT_REMOTE_TIMEOUT_SECS,
                };
                Some(RemoteConfig {
                    dest: dest.to_string(),
                    ssh_key: get("FINVAULT_REMOTE_SSH_KEY").map(PathBuf::from),
                    timeout_secs,
                })
            }
            None => {
                if get("FINVAULT_REMOTE_SSH_KEY").is_some() {
                    return Err(ConfigError::MissingCompanion(
                        "FINVAULT_REMOTE_DEST",
                        "FINVAULT_REMOTE_SSH_KEY",
                    ));
                }
                None
            }
        };

        let service_owner = match get("FINVAULT_SERVICE_OWNER") {
            Some(raw) => Some(Owner::parse(raw).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "FINVAULT_SERVICE_OWNER",
                    raw.to_string(),
                    "expected user or user:group".to_string(),
                )
            })?),
            None => None,
        };

        Ok(Config {
            data_dir,
            database_file,
            uploads_dir,
            docs_dir,
            backup_root,
            retention_days,
            snapshot_prefix,
            lock_path,
            remote,
            service_unit: get("FINVAULT_SERVICE_NAME").map(|s| s.to_string()),
            service_owner,
        })
    }

    /// Full path of the live database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    /// Full path of the live tax documents tree inside uploads
    pub fn tax_docs_path(&self) -> PathBuf {
        self.uploads_dir.join(crate::snapshot::TAX_DOCS_DIR)
    }
}
