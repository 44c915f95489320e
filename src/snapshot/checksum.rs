//! File checksums for snapshot manifests
//!
//! crc32 of the database copy, recorded as `crc32:<8 hex digits>` in the
//! manifest and re-verified before a restore overwrites the live database.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crc32fast::Hasher;

use super::errors::{SnapshotError, SnapshotResult};

/// Compute the crc32 of a file, streaming in 8 KiB chunks.
pub fn compute_file_checksum(path: &Path) -> SnapshotResult<u32> {
    let mut file = File::open(path).map_err(|e| SnapshotError::io_error_at_path(path, e))?;

    let mut hasher = Hasher::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buffer)
            .map_err(|e| SnapshotError::io_error_at_path(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

/// Render a checksum as stored in the manifest.
pub fn format_checksum(checksum: u32) -> String {
    format!("crc32:{:08x}", checksum)
}

/// Parse a manifest checksum value back to its raw form.
pub fn parse_checksum(formatted: &str) -> Option<u32> {
    let hex = formatted.strip_prefix("crc32:")?;
    if hex.len() != 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}
