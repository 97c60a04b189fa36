//! Stat attributes that can be read straight from file metadata
//!
//! Timestamps are available everywhere; the remaining attributes come from
//! `std::os::unix::fs::MetadataExt` and only exist on unix.

use std::fs::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

/// A numeric attribute of file metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatAttribute {
    Size,
    Mtime,
    Atime,
    Ctime,
    Dev,
    Ino,
    Mode,
    Nlink,
    Uid,
    Gid,
    Rdev,
    Blksize,
    Blocks,
}

impl StatAttribute {
    /// Every attribute, available or not
    pub const ALL: [StatAttribute; 13] = [
        StatAttribute::Size,
        StatAttribute::Mtime,
        StatAttribute::Atime,
        StatAttribute::Ctime,
        StatAttribute::Dev,
        StatAttribute::Ino,
        StatAttribute::Mode,
        StatAttribute::Nlink,
        StatAttribute::Uid,
        StatAttribute::Gid,
        StatAttribute::Rdev,
        StatAttribute::Blksize,
        StatAttribute::Blocks,
    ];

    /// Look up an attribute by its stat member name
    pub fn from_name(name: &str) -> Option<Self> {
        let attr = match name.to_ascii_lowercase().as_str() {
            "size" => StatAttribute::Size,
            "mtime" => StatAttribute::Mtime,
            "atime" => StatAttribute::Atime,
            "ctime" => StatAttribute::Ctime,
            "dev" => StatAttribute::Dev,
            "ino" | "inode" => StatAttribute::Ino,
            "mode" => StatAttribute::Mode,
            "nlink" => StatAttribute::Nlink,
            "uid" => StatAttribute::Uid,
            "gid" => StatAttribute::Gid,
            "rdev" => StatAttribute::Rdev,
            "blksize" => StatAttribute::Blksize,
            "blocks" => StatAttribute::Blocks,
            _ => return None,
        };
        Some(attr)
    }

    pub fn name(&self) -> &'static str {
        match self {
            StatAttribute::Size => "size",
            StatAttribute::Mtime => "mtime",
            StatAttribute::Atime => "atime",
            StatAttribute::Ctime => "ctime",
            StatAttribute::Dev => "dev",
            StatAttribute::Ino => "ino",
            StatAttribute::Mode => "mode",
            StatAttribute::Nlink => "nlink",
            StatAttribute::Uid => "uid",
            StatAttribute::Gid => "gid",
            StatAttribute::Rdev => "rdev",
            StatAttribute::Blksize => "blksize",
            StatAttribute::Blocks => "blocks",
        }
    }

    /// Whether this platform's metadata exposes the attribute
    pub fn is_available(&self) -> bool {
        match self {
            StatAttribute::Size
            | StatAttribute::Mtime
            | StatAttribute::Atime
            | StatAttribute::Ctime => true,
            _ => cfg!(unix),
        }
    }

    /// Read the attribute. `None` when the platform cannot provide it.
    pub fn read(&self, meta: &Metadata) -> Option<i64> {
        match self {
            StatAttribute::Size => Some(saturate(meta.len())),
            StatAttribute::Mtime => meta.modified().ok().map(unix_seconds),
            StatAttribute::Atime => meta.accessed().ok().map(unix_seconds),
            StatAttribute::Ctime => read_ctime(meta),
            _ => read_unix(*self, meta),
        }
    }
}

fn saturate(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Seconds since the epoch, negative for times before it
pub(crate) fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => saturate(d.as_secs()),
        Err(e) => -saturate(e.duration().as_secs()),
    }
}

#[cfg(unix)]
fn read_ctime(meta: &Metadata) -> Option<i64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.ctime())
}

#[cfg(not(unix))]
fn read_ctime(meta: &Metadata) -> Option<i64> {
    meta.created().ok().map(unix_seconds)
}

#[cfg(unix)]
fn read_unix(attr: StatAttribute, meta: &Metadata) -> Option<i64> {
    use std::os::unix::fs::MetadataExt;

    let value = match attr {
        StatAttribute::Dev => saturate(meta.dev()),
        StatAttribute::Ino => saturate(meta.ino()),
        StatAttribute::Mode => i64::from(meta.mode()),
        StatAttribute::Nlink => saturate(meta.nlink()),
        StatAttribute::Uid => i64::from(meta.uid()),
        StatAttribute::Gid => i64::from(meta.gid()),
        StatAttribute::Rdev => saturate(meta.rdev()),
        StatAttribute::Blksize => saturate(meta.blksize()),
        StatAttribute::Blocks => saturate(meta.blocks()),
        StatAttribute::Size
        | StatAttribute::Mtime
        | StatAttribute::Atime
        | StatAttribute::Ctime => return None,
    };
    Some(value)
}

#[cfg(not(unix))]
fn read_unix(_attr: StatAttribute, _meta: &Metadata) -> Option<i64> {
    None
}
