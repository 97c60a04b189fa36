//! allfiles - flat file listings for later browsing and searching
//!
//! Walks one or more root directories and writes one row per regular file
//! to a text, JSON or SQLite output. What goes into a row is described by a
//! [`FieldSpec`]: an ordered list of typed fields, each read from file
//! metadata or computed by a named derivation (human readable size, path).
//!
//! # Architecture
//!
//! ```text
//!   ┌──────────────────────┐
//!   │  PathSource          │  walkdir (native) or `find`
//!   │  "./sub/b.bin" ...   │  prune rules applied here
//!   └──────────┬───────────┘
//!              │ one raw path at a time
//!              ▼
//!   ┌──────────────────────┐
//!   │  ListingSession      │  normalize "./" -> "R:/", stat,
//!   │                      │  stage reports, totals
//!   └──────────┬───────────┘
//!              │
//!              ▼
//!   ┌──────────────────────┐
//!   │  FieldExtractor      │  FieldSpec -> ExtractedRow
//!   └──────────┬───────────┘
//!              │
//!              ▼
//!   ┌──────────────────────┐
//!   │  StoreGuard          │  Text | JSON | SQLite
//!   │   └ StoreBackend     │  finish() always runs
//!   └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # List /cygdrive/c into allfiles.db (tab separated text)
//! allfiles -f /cygdrive/c
//!
//! # SQLite output with a custom root prefix
//! allfiles -f /mnt/data --new-root R: --store sqlite -o data.db
//! ```

pub mod backup;
pub mod config;
pub mod error;
pub mod fields;
pub mod notify;
pub mod progress;
pub mod session;
pub mod store;
pub mod walker;

pub use config::{CliArgs, ListingConfig, RootMapping};
pub use error::{ListerError, Result};
pub use fields::{FieldDescriptor, FieldSpec};
pub use session::{ListingReport, ListingSession};
pub use store::{StoreBackend, StoreGuard, StoreKind};
