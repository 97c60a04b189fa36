//! Error types for allfiles
//!
//! This module defines the error hierarchy that covers:
//! - Per-file extraction errors (recoverable, logged and skipped)
//! - Field specification errors (configuration defects, fail fast)
//! - Storage backend errors
//! - Backup, traversal and configuration errors
//!
//! Library code uses thiserror; the binary wraps everything in anyhow.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the allfiles application
#[derive(Error, Debug)]
pub enum ListerError {
    /// Field extraction errors
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Field specification errors
    #[error("Field specification error: {0}")]
    Spec(#[from] SpecError),

    /// Storage backend errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Backup errors
    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),

    /// Traversal errors
    #[error("Walk error: {0}")]
    Walk(#[from] WalkError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Interrupted by signal
    #[error("Operation interrupted by signal")]
    Interrupted,
}

/// Errors while turning one discovered path into a row
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// File vanished, permission denied, symlink loop...
    #[error("Failed to stat '{path}': {source}")]
    StatFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Field has neither a stat attribute nor a known derivation
    #[error("Custom field '{name}' is not implemented")]
    UnimplementedField { name: String },
}

impl ExtractionError {
    /// Check if this error only affects a single file
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ExtractionError::StatFailed { .. })
    }
}

/// Field specification errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// Field names must be unique within a spec
    #[error("Duplicate field name '{name}'")]
    DuplicateField { name: String },

    /// Field names must not be empty
    #[error("Field name must not be empty")]
    EmptyName,

    /// Stat attribute type does not fit the declared type
    #[error("Field '{name}' reads stat attribute '{attribute}' which is numeric, but is declared as {declared}")]
    TypeMismatch {
        name: String,
        attribute: String,
        declared: String,
    },

    /// Unknown declared type name in configuration
    #[error("Unknown field type '{0}' (expected text, number, boolean or object)")]
    UnknownType(String),
}

/// Storage backend errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error on the output file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend needs a declared schema before the first row
    #[error("{store} store requires a schema")]
    SchemaRequired { store: &'static str },

    /// Relational backend needs a table name
    #[error("{store} store requires a table name")]
    TableNameRequired { store: &'static str },

    /// Schema may only be declared once
    #[error("Schema has already been declared")]
    SchemaAlreadyDeclared,

    /// Schema must be declared before the first row
    #[error("Schema cannot be declared after rows were written")]
    SchemaAfterInsert,

    /// Backend used before setup
    #[error("{store} store is not open - call setup first")]
    NotOpen { store: &'static str },

    /// Backend used after finish
    #[error("{store} store has already been finished")]
    Finished { store: &'static str },
}

impl StoreError {
    /// Check if a failed insert only affects that one row.
    ///
    /// Text output is never recoverable: a half-written line breaks the
    /// delimiter alignment of everything after it.
    pub fn is_row_recoverable(&self) -> bool {
        match self {
            StoreError::Json(_) => true,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}

/// Errors while moving an existing output aside
#[derive(Error, Debug)]
pub enum BackupError {
    /// Rename failed for a reason other than the file being busy
    #[error("Failed to rename '{from}' to '{to}': {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copy fallback failed
    #[error("Failed to copy '{from}' to '{to}': {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Traversal errors
#[derive(Error, Debug)]
pub enum WalkError {
    /// I/O error while reading traversal output
    #[error("I/O error while walking '{root}': {source}")]
    Io {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// External traversal command could not be started
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A directory entry could not be read
    #[error("Failed to read entry: {0}")]
    Entry(#[from] walkdir::Error),

    /// Prune pattern could not be compiled
    #[error("Invalid prune pattern '{pattern}': {reason}")]
    InvalidPrunePattern { pattern: String, reason: String },
}

impl WalkError {
    /// Check if the traversal can carry on after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WalkError::Entry(_))
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Nothing to walk
    #[error("No root paths configured - pass a root directory or add [[roots]] to the config file")]
    NoRoots,

    /// Root path is missing or not a directory
    #[error("Supplied root path '{path}' is not a directory")]
    RootNotDirectory { path: PathBuf },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },

    /// Store flavor is not known
    #[error("Database flavor '{0}' is not (yet) implemented")]
    UnknownStore(String),

    /// Walker kind is not known
    #[error("Unknown walker '{0}' (expected native or find)")]
    UnknownWalker(String),

    /// Invalid stage size
    #[error("Invalid stage size {size}: must be between 1 and {max}")]
    InvalidStageSize { size: usize, max: usize },

    /// Field separator is empty
    #[error("Field separator must not be empty")]
    EmptySeparator,

    /// Config file could not be read or parsed
    #[error("Cannot load config file '{path}': {reason}")]
    ConfigFile { path: PathBuf, reason: String },

    /// Prune pattern is invalid
    #[error("Invalid prune pattern '{pattern}': {reason}")]
    InvalidPrunePattern { pattern: String, reason: String },

    /// Field layout is invalid
    #[error("Invalid field layout: {0}")]
    Spec(#[from] SpecError),
}

/// Result type alias for ListerError
pub type Result<T> = std::result::Result<T, ListerError>;

/// Result type alias for StoreError
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for ExtractionError
pub type ExtractResult<T> = std::result::Result<T, ExtractionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_recoverable() {
        let stat_failed = ExtractionError::StatFailed {
            path: "/gone".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(stat_failed.is_recoverable());

        let unimplemented = ExtractionError::UnimplementedField {
            name: "md5".into(),
        };
        assert!(!unimplemented.is_recoverable());
    }

    #[test]
    fn test_error_conversion() {
        let err = StoreError::SchemaRequired { store: "Text" };
        let top: ListerError = err.into();
        assert!(matches!(top, ListerError::Store(_)));
        assert_eq!(
            top.to_string(),
            "Store error: Text store requires a schema"
        );
    }

    #[test]
    fn test_store_error_row_recoverable() {
        let io = StoreError::Io(std::io::Error::from(std::io::ErrorKind::Other));
        assert!(!io.is_row_recoverable());
        assert!(!StoreError::Finished { store: "JSON" }.is_row_recoverable());
    }

    #[test]
    fn test_spec_error_message() {
        let err = SpecError::DuplicateField {
            name: "filepath".into(),
        };
        assert_eq!(err.to_string(), "Duplicate field name 'filepath'");
    }
}
