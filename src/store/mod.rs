//! Pluggable storage backends for file listings
//!
//! Every backend follows the same lifecycle:
//!
//! ```text
//!  create ──► setup ──► declare_schema ──► insert* ──► finish
//!  (no I/O)   (open     (records layout,    (first row   (closing framing,
//!              output)   no I/O)             writes       release handle)
//!                                            framing)
//! ```
//!
//! - Text: tab separated, header line, flushed per row
//! - JSON: `{"schema": {...}, "data": [ row, row, ]}`
//! - SQLite: one table with an autoincrement key and one column per field
//!
//! [`StoreGuard`] owns an opened backend and guarantees `finish` runs even
//! when the listing is aborted by an error.

pub mod json;
pub mod schema;
pub mod sqlite;
pub mod text;

pub use json::JsonStore;
pub use schema::{Schema, SchemaState};
pub use sqlite::SqliteStore;
pub use text::TextStore;

use crate::error::{ConfigError, StoreResult};
use crate::fields::{ExtractedRow, FieldSpec};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Default field separator for text output
pub const DEFAULT_SEPARATOR: &str = "\t";

/// Default table name for SQLite output
pub const DEFAULT_TABLE: &str = "items";

/// Storage flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Text,
    Json,
    Sqlite,
}

impl StoreKind {
    pub fn name(&self) -> &'static str {
        match self {
            StoreKind::Text => "text",
            StoreKind::Json => "json",
            StoreKind::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" | "tsv" => Ok(StoreKind::Text),
            "js" | "json" => Ok(StoreKind::Json),
            "sqlite" | "sqlite3" | "db" => Ok(StoreKind::Sqlite),
            _ => Err(ConfigError::UnknownStore(s.to_string())),
        }
    }
}

/// Lifecycle position of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreState {
    #[default]
    Constructed,
    Open,
    Finished,
}

/// Backend-specific knobs
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Separator between text columns
    pub separator: String,
    /// Emit strictly valid JSON (no trailing comma after the last row)
    pub strict_json: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            strict_json: false,
        }
    }
}

/// One of the storage flavors behind a uniform write contract
#[derive(Debug)]
pub enum StoreBackend {
    Text(TextStore),
    Json(JsonStore),
    Sqlite(SqliteStore),
}

impl StoreBackend {
    /// Construct a backend for `path`. No I/O happens until [`setup`](Self::setup).
    pub fn create(kind: StoreKind, path: &Path, options: &StoreOptions) -> Self {
        match kind {
            StoreKind::Text => StoreBackend::Text(TextStore::new(path, &options.separator)),
            StoreKind::Json => StoreBackend::Json(JsonStore::new(path, options.strict_json)),
            StoreKind::Sqlite => StoreBackend::Sqlite(SqliteStore::new(path)),
        }
    }

    /// Open the output resource
    pub fn setup(&mut self) -> StoreResult<()> {
        debug!(store = %self.kind(), path = %self.path().display(), "Opening store");
        match self {
            StoreBackend::Text(s) => s.setup(),
            StoreBackend::Json(s) => s.setup(),
            StoreBackend::Sqlite(s) => s.setup(),
        }
    }

    /// Record the field layout (and table name) before the first row
    pub fn declare_schema(&mut self, table: Option<&str>, spec: &FieldSpec) -> StoreResult<()> {
        match self {
            StoreBackend::Text(s) => s.declare_schema(table, spec),
            StoreBackend::Json(s) => s.declare_schema(table, spec),
            StoreBackend::Sqlite(s) => s.declare_schema(table, spec),
        }
    }

    /// Write one row
    pub fn insert(&mut self, row: &ExtractedRow) -> StoreResult<()> {
        match self {
            StoreBackend::Text(s) => s.insert(row),
            StoreBackend::Json(s) => s.insert(row),
            StoreBackend::Sqlite(s) => s.insert(row),
        }
    }

    /// Write closing framing and release the resource. Safe to call twice.
    pub fn finish(&mut self) -> StoreResult<()> {
        match self {
            StoreBackend::Text(s) => s.finish(),
            StoreBackend::Json(s) => s.finish(),
            StoreBackend::Sqlite(s) => s.finish(),
        }
    }

    pub fn kind(&self) -> StoreKind {
        match self {
            StoreBackend::Text(_) => StoreKind::Text,
            StoreBackend::Json(_) => StoreKind::Json,
            StoreBackend::Sqlite(_) => StoreKind::Sqlite,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            StoreBackend::Text(s) => s.path(),
            StoreBackend::Json(s) => s.path(),
            StoreBackend::Sqlite(s) => s.path(),
        }
    }

    pub fn state(&self) -> StoreState {
        match self {
            StoreBackend::Text(s) => s.state(),
            StoreBackend::Json(s) => s.state(),
            StoreBackend::Sqlite(s) => s.state(),
        }
    }

    /// Rows successfully written so far
    pub fn rows_written(&self) -> u64 {
        match self {
            StoreBackend::Text(s) => s.rows_written(),
            StoreBackend::Json(s) => s.rows_written(),
            StoreBackend::Sqlite(s) => s.rows_written(),
        }
    }
}

/// Scoped owner of an opened backend.
///
/// Dropping the guard without calling [`StoreGuard::finish`] still finishes
/// the backend, so closing framing is written on early returns and unwinds.
#[derive(Debug)]
pub struct StoreGuard {
    store: StoreBackend,
    finished: bool,
}

impl StoreGuard {
    /// Run `setup` and take ownership of the backend
    pub fn open(mut store: StoreBackend) -> StoreResult<Self> {
        store.setup()?;
        Ok(Self {
            store,
            finished: false,
        })
    }

    /// Finish explicitly, surfacing any error
    pub fn finish(mut self) -> StoreResult<PathBuf> {
        self.finished = true;
        self.store.finish()?;
        Ok(self.store.path().to_path_buf())
    }
}

impl Deref for StoreGuard {
    type Target = StoreBackend;

    fn deref(&self) -> &StoreBackend {
        &self.store
    }
}

impl DerefMut for StoreGuard {
    fn deref_mut(&mut self) -> &mut StoreBackend {
        &mut self.store
    }
}

impl Drop for StoreGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.store.finish() {
            warn!(
                path = %self.store.path().display(),
                "Failed to finish store during cleanup: {}", e
            );
        }
    }
}
