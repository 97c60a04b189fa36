//! Prune rules: relative path fragments that are never descended into
//!
//! Patterns follow `find -ipath` semantics: matching is case-insensitive and
//! `*` also matches across `/`. A pattern is matched against the path relative
//! to the root, without a leading `./`.

use crate::error::WalkError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Paths skipped when nothing else is configured
pub const DEFAULT_PRUNE: &[&str] = &[
    "boot*",
    "Sandbox",
    "$Recycle.Bin",
    "$RECYCLE.BIN",
    "$SysReset",
    "Recovery",
    "MinGW",
    "Windows/WinSxS",
];

/// Compiled prune list
#[derive(Debug, Clone)]
pub struct PruneRules {
    patterns: Vec<String>,
    set: GlobSet,
}

impl PruneRules {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, WalkError> {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            let fragment = clean_fragment(pattern.as_ref());
            if fragment.is_empty() {
                continue;
            }
            let glob = GlobBuilder::new(fragment)
                .case_insensitive(true)
                .literal_separator(false)
                .backslash_escape(false)
                .build()
                .map_err(|e| WalkError::InvalidPrunePattern {
                    pattern: pattern.as_ref().to_string(),
                    reason: e.kind().to_string(),
                })?;
            builder.add(glob);
            kept.push(fragment.to_string());
        }

        let set = builder
            .build()
            .map_err(|e| WalkError::InvalidPrunePattern {
                pattern: kept.join(", "),
                reason: e.to_string(),
            })?;

        Ok(Self {
            patterns: kept,
            set,
        })
    }

    /// Rules that prune nothing
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    /// Check a path relative to the root (`a/b`, `./a/b` and `a\b` are equivalent)
    pub fn is_match(&self, relative: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let rel = relative.replace('\\', "/");
        self.set.is_match(rel.trim_start_matches("./"))
    }

    /// Cleaned pattern fragments, in configuration order
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for PruneRules {
    fn default() -> Self {
        Self::empty()
    }
}

fn clean_fragment(pattern: &str) -> &str {
    pattern
        .trim()
        .trim_start_matches("./")
        .trim_start_matches('/')
        .trim_end_matches('/')
}
