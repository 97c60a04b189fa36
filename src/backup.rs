//! Move an existing output file aside before it is truncated

use crate::error::BackupError;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default prefix for backup file names
pub const DEFAULT_PREFIX: &str = "bck.";

/// Chunk size of the copy fallback
const COPY_CHUNK: usize = 1024;

/// What happened to the previous output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backup {
    /// Original was renamed to this path
    Renamed(PathBuf),
    /// Original was busy; its content was copied here and it stays in place
    Copied(PathBuf),
}

impl Backup {
    pub fn path(&self) -> &Path {
        match self {
            Backup::Renamed(p) | Backup::Copied(p) => p,
        }
    }
}

/// Backup location for `path`: same directory, `prefix` before the file name
pub fn backup_path(path: &Path, prefix: &str) -> Option<PathBuf> {
    let name = path.file_name()?.to_string_lossy();
    Some(path.with_file_name(format!("{}{}", prefix, name)))
}

/// Move `path` to `<dir>/<prefix><name>` if it is a regular file.
///
/// Returns `Ok(None)` when there is nothing to back up. If the rename fails
/// because the file is in use, the content is copied instead and the
/// original is left where it is; the caller truncates it afterwards.
pub fn make_backup(path: &Path, prefix: &str) -> Result<Option<Backup>, BackupError> {
    if !path.is_file() {
        debug!(path = %path.display(), "No previous output to back up");
        return Ok(None);
    }
    let Some(target) = backup_path(path, prefix) else {
        return Ok(None);
    };

    match fs::rename(path, &target) {
        Ok(()) => {
            info!("Moved previous output {} -> {}", path.display(), target.display());
            Ok(Some(Backup::Renamed(target)))
        }
        Err(e) if e.kind() == io::ErrorKind::ResourceBusy => {
            warn!(path = %path.display(), "Output is busy, copying instead of renaming");
            copy_aside(path, &target).map_err(|source| BackupError::Copy {
                from: path.to_path_buf(),
                to: target.clone(),
                source,
            })?;
            info!("Copied previous output {} -> {}", path.display(), target.display());
            Ok(Some(Backup::Copied(target)))
        }
        Err(source) => Err(BackupError::Rename {
            from: path.to_path_buf(),
            to: target,
            source,
        }),
    }
}

fn copy_aside(from: &Path, to: &Path) -> io::Result<u64> {
    let mut input = File::open(from)?;
    let mut output = File::create(to)?;
    let mut chunk = [0u8; COPY_CHUNK];
    let mut copied = 0u64;
    loop {
        let n = match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        output.write_all(&chunk[..n])?;
        copied += n as u64;
    }
    output.flush()?;
    Ok(copied)
}
