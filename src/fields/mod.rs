//! Schema-driven field extraction
//!
//! ```text
//!   FieldSpec (ordered, validated)
//!        │
//!        ▼
//!   FieldExtractor::new ── resolves each field to a stat attribute
//!        │                 or a named derivation (fails fast)
//!        ▼
//!   extract(path, metadata) ──► ExtractedRow [(name, value), ...]
//! ```

pub mod extract;
pub mod size;
pub mod spec;
pub mod stat;
pub mod value;

pub use extract::{stat_path, CustomField, FieldExtractor};
pub use size::human_size;
pub use spec::{FieldDescriptor, FieldSource, FieldSpec};
pub use stat::StatAttribute;
pub use value::{DeclaredType, ExtractedRow, FieldValue};
