//! tar.gz archiving of upload trees
//!
//! Trees are packed recursively with paths relative to the tree root, in
//! sorted order so identical trees produce identical archives. Symbolic links
//! are skipped: archives may be mirrored to stores that cannot represent
//! them, and the upload trees have no legitimate links.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::Builder;

use super::errors::{BackupError, BackupResult};

/// What went into an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Regular files packed
    pub files: u64,
    /// Finished archive size in bytes
    pub archive_bytes: u64,
}

/// Pack `src_dir` into a gzip'd tar at `dst`.
///
/// The caller decides whether a failure is fatal; on error any partial
/// archive is removed so a snapshot never contains a truncated one.
pub fn archive_tree(src_dir: &Path, dst: &Path) -> BackupResult<ArchiveSummary> {
    let result = archive_tree_inner(src_dir, dst);
    if result.is_err() && dst.exists() {
        let _ = fs::remove_file(dst);
    }
    result
}

fn archive_tree_inner(src_dir: &Path, dst: &Path) -> BackupResult<ArchiveSummary> {
    let file = File::create(dst).map_err(|e| {
        BackupError::archive_with_source(
            format!("failed to create archive: {}", dst.display()),
            e,
        )
    })?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = Builder::new(encoder);

    let mut entries = Vec::new();
    collect_entries(src_dir, Path::new(""), &mut entries)?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut files = 0u64;
    for (relative, fs_path, is_dir) in entries {
        if is_dir {
            builder.append_dir(&relative, &fs_path).map_err(|e| {
                BackupError::archive(format!(
                    "failed to add directory {}: {}",
                    relative.display(),
                    e
                ))
            })?;
        } else {
            let mut f = File::open(&fs_path)
                .map_err(|e| BackupError::io_error_at_path(&fs_path, e))?;
            builder.append_file(&relative, &mut f).map_err(|e| {
                BackupError::archive(format!("failed to add file {}: {}", relative.display(), e))
            })?;
            files += 1;
        }
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| BackupError::archive(format!("failed to finish archive: {}", e)))?;
    let writer = encoder
        .finish()
        .map_err(|e| BackupError::archive(format!("failed to finish compression: {}", e)))?;
    let mut file = writer
        .into_inner()
        .map_err(|e| BackupError::archive(format!("failed to flush archive: {}", e)))?;
    file.flush()
        .map_err(|e| BackupError::io_error_at_path(dst, e))?;
    file.sync_all()
        .map_err(|e| BackupError::io_error_at_path(dst, e))?;

    let archive_bytes = fs::metadata(dst)
        .map_err(|e| BackupError::io_error_at_path(dst, e))?
        .len();

    Ok(ArchiveSummary {
        files,
        archive_bytes,
    })
}

/// Collect (relative, absolute, is_dir) entries, sorted by name per level.
/// Symlinks and special files are skipped.
fn collect_entries(
    dir: &Path,
    prefix: &Path,
    out: &mut Vec<(PathBuf, PathBuf, bool)>,
) -> BackupResult<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .map_err(|e| BackupError::io_error_at_path(dir, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| BackupError::io_error_at_path(dir, e))?;
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    for entry in entries {
        let fs_path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| BackupError::io_error_at_path(&fs_path, e))?;
        if file_type.is_symlink() {
            continue;
        }

        let relative = prefix.join(entry.file_name());
        if file_type.is_dir() {
            out.push((relative.clone(), fs_path.clone(), true));
            collect_entries(&fs_path, &relative, out)?;
        } else if file_type.is_file() {
            out.push((relative, fs_path, false));
        }
    }

    Ok(())
}

/// Count regular files under `dir`, optionally excluding one direct
/// subdirectory. Missing directories count as zero; unreadable subtrees are
/// counted as far as they can be read (counts feed the manifest, they never
/// fail a backup).
pub fn count_files(dir: &Path, exclude_subdir: Option<&str>) -> u64 {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    let mut count = 0u64;
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_symlink() {
            continue;
        }
        if file_type.is_dir() {
            if exclude_subdir.is_some_and(|name| entry.file_name().to_string_lossy() == name) {
                continue;
            }
            count += count_files(&entry.path(), None);
        } else if file_type.is_file() {
            count += 1;
        }
    }
    count
}
