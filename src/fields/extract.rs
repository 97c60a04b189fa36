//! Per-file field extraction
//!
//! A [`FieldExtractor`] resolves every descriptor of a [`FieldSpec`] once,
//! up front, so an unknown custom field fails before the first file is
//! visited instead of once per row.

use crate::error::{ExtractResult, ExtractionError, Result, SpecError};
use crate::fields::size::human_size;
use crate::fields::spec::{FieldSource, FieldSpec};
use crate::fields::stat::StatAttribute;
use crate::fields::value::{DeclaredType, ExtractedRow, FieldValue};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::Metadata;
use std::path::Path;
use tracing::debug;

/// Named derivations available to custom fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomField {
    /// Normalized path after root substitution
    FilePath,
    /// Size as `1.5K` style text
    SizeHuman,
    /// Final path component
    FileName,
    /// Lowercased extension without the dot
    Extension,
    /// Modification time as RFC 3339 (UTC)
    Modified,
}

impl CustomField {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "filepath" => Some(CustomField::FilePath),
            "sizehuman" => Some(CustomField::SizeHuman),
            "filename" => Some(CustomField::FileName),
            "extension" => Some(CustomField::Extension),
            "modified" => Some(CustomField::Modified),
            _ => None,
        }
    }

    fn derive(&self, path: &str, meta: &Metadata) -> FieldValue {
        match self {
            CustomField::FilePath => FieldValue::Text(path.to_string()),
            CustomField::SizeHuman => FieldValue::Text(human_size(meta.len())),
            CustomField::FileName => file_name(path)
                .map(|n| FieldValue::Text(n.to_string()))
                .unwrap_or(FieldValue::Null),
            CustomField::Extension => extension(path)
                .map(FieldValue::Text)
                .unwrap_or(FieldValue::Null),
            CustomField::Modified => meta
                .modified()
                .ok()
                .map(|t| {
                    let dt: DateTime<Utc> = t.into();
                    FieldValue::Text(dt.to_rfc3339_opts(SecondsFormat::Secs, true))
                })
                .unwrap_or(FieldValue::Null),
        }
    }
}

/// How one field gets its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolved {
    Stat(StatAttribute),
    Custom(CustomField),
}

/// Compiled extraction plan for a field spec
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    plan: Vec<(String, Resolved)>,
}

impl FieldExtractor {
    /// Resolve every field of `spec`.
    ///
    /// A stat-backed field whose attribute does not exist on this platform
    /// is looked up as a custom field by its name; if that fails too the
    /// whole spec is rejected with [`ExtractionError::UnimplementedField`].
    pub fn new(spec: &FieldSpec) -> Result<Self> {
        let mut plan = Vec::with_capacity(spec.len());

        for field in spec {
            let stat_attr = match field.source() {
                FieldSource::Stat(name) => StatAttribute::from_name(&name)
                    .filter(StatAttribute::is_available)
                    .map(|attr| (name, attr)),
                FieldSource::Custom => None,
            };

            let resolved = match stat_attr {
                Some((attr_name, attr)) => {
                    if field.declared_type != DeclaredType::Number {
                        return Err(SpecError::TypeMismatch {
                            name: field.name.clone(),
                            attribute: attr_name,
                            declared: field.declared_type.to_string(),
                        }
                        .into());
                    }
                    Resolved::Stat(attr)
                }
                None => {
                    if let Some(attr) = &field.stat {
                        debug!(
                            field = %field.name,
                            attribute = %attr,
                            "Stat attribute unavailable, trying custom derivation"
                        );
                    }
                    let custom = CustomField::from_name(&field.name).ok_or_else(|| {
                        ExtractionError::UnimplementedField {
                            name: field.name.clone(),
                        }
                    })?;
                    Resolved::Custom(custom)
                }
            };

            plan.push((field.name.clone(), resolved));
        }

        Ok(Self { plan })
    }

    /// Build the row for one file.
    ///
    /// `path` is the normalized path written to `filepath`; `meta` is the
    /// metadata of the file it refers to.
    pub fn extract(&self, path: &str, meta: &Metadata) -> ExtractedRow {
        let mut row = ExtractedRow::with_capacity(self.plan.len());
        for (name, resolved) in &self.plan {
            let value = match resolved {
                Resolved::Stat(attr) => attr
                    .read(meta)
                    .map(FieldValue::Number)
                    .unwrap_or(FieldValue::Null),
                Resolved::Custom(custom) => custom.derive(path, meta),
            };
            row.push(name.as_str(), value);
        }
        row
    }

    /// Stat `fs_path` and extract a row for it
    pub fn extract_path(&self, display_path: &str, fs_path: &Path) -> ExtractResult<ExtractedRow> {
        let meta = stat_path(fs_path)?;
        Ok(self.extract(display_path, &meta))
    }

    pub fn field_count(&self) -> usize {
        self.plan.len()
    }
}

/// Stat a path, following symlinks
pub fn stat_path(path: &Path) -> ExtractResult<Metadata> {
    std::fs::metadata(path).map_err(|source| ExtractionError::StatFailed {
        path: path.display().to_string(),
        source,
    })
}

fn file_name(path: &str) -> Option<&str> {
    path.rsplit(['/', '\\']).next().filter(|n| !n.is_empty())
}

fn extension(path: &str) -> Option<String> {
    let name = file_name(path)?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() >= 10 {
        return None;
    }
    Some(ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListerError;
    use crate::fields::spec::FieldDescriptor;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_spec_extracts_in_order() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("report.txt");
        fs::write(&file, vec![b'x'; 1536]).unwrap();

        let extractor = FieldExtractor::new(&FieldSpec::default()).unwrap();
        let row = extractor.extract_path("R:/report.txt", &file).unwrap();

        let pairs: Vec<_> = row.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        assert_eq!(
            pairs,
            vec![
                ("sizehuman".to_string(), FieldValue::from("1.5K")),
                ("filepath".to_string(), FieldValue::from("R:/report.txt")),
            ]
        );
    }

    #[test]
    fn test_stat_field() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("data.bin");
        fs::write(&file, [0u8; 42]).unwrap();

        let spec = FieldSpec::new(vec![FieldDescriptor::stat(
            "sizebytes",
            DeclaredType::Number,
            "size",
        )])
        .unwrap();
        let extractor = FieldExtractor::new(&spec).unwrap();
        let row = extractor.extract_path("x", &file).unwrap();
        assert_eq!(row.get("sizebytes"), Some(&FieldValue::Number(42)));
    }

    #[test]
    fn test_unimplemented_field_fails_fast() {
        let spec = FieldSpec::new(vec![
            FieldDescriptor::custom("filepath", DeclaredType::Text),
            FieldDescriptor::custom("md5", DeclaredType::Text),
        ])
        .unwrap();

        let err = FieldExtractor::new(&spec).unwrap_err();
        assert!(matches!(
            err,
            ListerError::Extraction(ExtractionError::UnimplementedField { ref name }) if name == "md5"
        ));
    }

    #[test]
    fn test_unknown_stat_attribute_falls_back_to_custom() {
        // "filepath" is not a stat member, but is a known derivation
        let spec = FieldSpec::new(vec![FieldDescriptor::stat(
            "filepath",
            DeclaredType::Text,
            "no_such_member",
        )])
        .unwrap();
        assert!(FieldExtractor::new(&spec).is_ok());

        let spec = FieldSpec::new(vec![FieldDescriptor::stat(
            "whatever",
            DeclaredType::Number,
            "no_such_member",
        )])
        .unwrap();
        assert!(FieldExtractor::new(&spec).is_err());
    }

    #[test]
    fn test_stat_type_mismatch() {
        let spec = FieldSpec::new(vec![FieldDescriptor::stat(
            "size_as_text",
            DeclaredType::Text,
            "size",
        )])
        .unwrap();
        let err = FieldExtractor::new(&spec).unwrap_err();
        assert!(matches!(err, ListerError::Spec(SpecError::TypeMismatch { .. })));
    }

    #[test]
    fn test_stat_failed_for_missing_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("vanished.bin");

        let extractor = FieldExtractor::new(&FieldSpec::default()).unwrap();
        let err = extractor.extract_path("R:/vanished.bin", &missing).unwrap_err();
        match err {
            ExtractionError::StatFailed { path, source } => {
                assert!(path.ends_with("vanished.bin"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_supplementary_custom_fields() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("Photo.JPG");
        fs::write(&file, b"jpeg").unwrap();

        let spec = FieldSpec::new(vec![
            FieldDescriptor::custom("filename", DeclaredType::Text),
            FieldDescriptor::custom("extension", DeclaredType::Text),
            FieldDescriptor::custom("modified", DeclaredType::Text),
        ])
        .unwrap();
        let extractor = FieldExtractor::new(&spec).unwrap();
        let row = extractor.extract_path("c:/pics/Photo.JPG", &file).unwrap();

        assert_eq!(row.get("filename"), Some(&FieldValue::from("Photo.JPG")));
        assert_eq!(row.get("extension"), Some(&FieldValue::from("jpg")));
        match row.get("modified") {
            Some(FieldValue::Text(ts)) => assert!(ts.ends_with('Z'), "{ts}"),
            other => panic!("unexpected modified value: {other:?}"),
        }
    }

    #[test]
    fn test_extension_rules() {
        assert_eq!(extension("a/b/archive.tar.GZ"), Some("gz".to_string()));
        assert_eq!(extension("a/.bashrc"), None);
        assert_eq!(extension("README"), None);
        assert_eq!(extension("x.verylongextension"), None);
        assert_eq!(file_name("c:\\dir\\file.txt"), Some("file.txt"));
    }
}
