//! Remote mirroring over rsync+ssh
//!
//! One-way, delete-aware sync of the whole backup root after each successful
//! local backup. The remote is a best-effort mirror: the producer reports a
//! sync failure and exits 0 anyway, because the local snapshot is already
//! durable and a flaky link must not mask that.
//!
//! Symbolic links are excluded (`--no-links`); the remote medium may not
//! support them, and the `latest` pointer is reconstructable from the
//! directory names. Connect and transfer timeouts are explicit so a hung
//! mount or dead peer fails the step instead of wedging the nightly run.

use std::path::Path;
use std::process::Command;

use crate::config::RemoteConfig;

use super::errors::{BackupError, BackupResult};

/// Mirror `backup_root` to the configured remote destination.
pub fn mirror_to_remote(backup_root: &Path, remote: &RemoteConfig) -> BackupResult<()> {
    let mut ssh = format!(
        "ssh -o BatchMode=yes -o ConnectTimeout={}",
        remote.timeout_secs
    );
    if let Some(ref key) = remote.ssh_key {
        ssh.push_str(&format!(" -i {}", key.display()));
    }

    // Trailing slash: sync the root's contents, not the root directory itself
    let source = format!("{}/", backup_root.display());

    let output = Command::new("rsync")
        .arg("-az")
        .arg("--delete")
        .arg("--no-links")
        .arg(format!("--timeout={}", remote.timeout_secs))
        .arg("-e")
        .arg(&ssh)
        .arg(&source)
        .arg(&remote.dest)
        .output()
        .map_err(|e| {
            BackupError::remote(format!("failed to run rsync: {}", e))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BackupError::remote(format!(
            "rsync to {} exited {}: {}",
            remote.dest,
            output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string()),
            stderr.trim()
        )));
    }

    Ok(())
}
