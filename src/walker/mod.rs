//! Traversal collaborators
//!
//! A [`PathSource`] turns a root directory into a stream of raw relative
//! paths of regular files, in the `./dir/file` form `find` prints. The
//! session normalizes each raw path with [`normalize_path`] before use.
//!
//! - [`NativeWalker`]: in-process traversal with `walkdir`, sorted by name
//! - [`FindWalker`]: spawns the system `find` and streams its output

pub mod find;
pub mod native;
pub mod prune;

pub use find::FindWalker;
pub use native::NativeWalker;
pub use prune::{PruneRules, DEFAULT_PRUNE};

use crate::error::{ConfigError, WalkError};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Stream of raw paths; entry errors are yielded inline
pub type PathIter = Box<dyn Iterator<Item = Result<String, WalkError>>>;

/// Produces the raw file paths below a root
pub trait PathSource {
    /// Start traversing `root`. Fails only if traversal cannot start at all.
    fn paths(&self, root: &Path) -> Result<PathIter, WalkError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Which traversal collaborator to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkerKind {
    #[default]
    Native,
    Find,
}

impl WalkerKind {
    /// Build the walker with the given prune rules
    pub fn build(self, prune: PruneRules) -> Box<dyn PathSource> {
        match self {
            WalkerKind::Native => Box::new(NativeWalker::new(prune)),
            WalkerKind::Find => Box::new(FindWalker::new(prune)),
        }
    }
}

impl fmt::Display for WalkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkerKind::Native => write!(f, "native"),
            WalkerKind::Find => write!(f, "find"),
        }
    }
}

impl FromStr for WalkerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "walkdir" => Ok(WalkerKind::Native),
            "find" => Ok(WalkerKind::Find),
            _ => Err(ConfigError::UnknownWalker(s.to_string())),
        }
    }
}

/// Trim a raw path and replace a leading `.` with the root's replacement.
///
/// `./sub/b.bin` with replacement `R:` becomes `R:/sub/b.bin`.
pub fn normalize_path(raw: &str, replacement: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_prefix('.') {
        Some(rest) => format!("{}{}", replacement, rest),
        None => trimmed.to_string(),
    }
}

/// Filesystem location of a raw path below `root`
pub fn resolve_raw(root: &Path, raw: &str) -> std::path::PathBuf {
    let rel = raw.trim();
    let rel = rel.strip_prefix("./").unwrap_or(rel);
    if rel == "." || rel.is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    }
}
