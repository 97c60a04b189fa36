//! In-process traversal with `walkdir`

use crate::error::WalkError;
use crate::walker::{PathIter, PathSource, PruneRules};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Depth-first traversal sorted by file name.
///
/// Symlinks are not followed and only regular files are yielded, matching
/// `find -type f`.
#[derive(Debug, Clone, Default)]
pub struct NativeWalker {
    prune: PruneRules,
}

impl NativeWalker {
    pub fn new(prune: PruneRules) -> Self {
        Self { prune }
    }
}

impl PathSource for NativeWalker {
    fn paths(&self, root: &Path) -> Result<PathIter, WalkError> {
        let meta = std::fs::metadata(root).map_err(|source| WalkError::Io {
            root: root.to_path_buf(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(WalkError::Io {
                root: root.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
            });
        }

        let prune = self.prune.clone();

        let iter = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| entry.depth() == 0 || !prune.is_match(&relative(entry)))
            .filter_map(move |entry| match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    Some(Ok(format!("./{}", relative(&entry))))
                }
                Ok(_) => None,
                Err(e) => Some(Err(WalkError::Entry(e))),
            });

        Ok(Box::new(iter))
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

/// Path below the walk root, `/` separated
fn relative(entry: &DirEntry) -> String {
    let components: Vec<String> = entry
        .path()
        .components()
        .rev()
        .take(entry.depth())
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    components.into_iter().rev().collect::<Vec<_>>().join("/")
}
