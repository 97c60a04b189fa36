//! Field layout: which values are collected per file, in which order
//!
//! A [`FieldSpec`] is the single source of column order for every backend.
//! It is validated once at construction and then shared read-only.

use crate::error::SpecError;
use crate::fields::value::DeclaredType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Where a field's value comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldSource {
    /// Read the named attribute from file metadata
    Stat(String),
    /// Computed by a named derivation (see [`crate::fields::extract`])
    Custom,
}

/// One named, typed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,

    #[serde(rename = "type")]
    pub declared_type: DeclaredType,

    /// Stat member to read; absent for custom fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat: Option<String>,
}

impl FieldDescriptor {
    /// A field computed by a named derivation
    pub fn custom(name: impl Into<String>, declared_type: DeclaredType) -> Self {
        Self {
            name: name.into(),
            declared_type,
            stat: None,
        }
    }

    /// A field read from a stat attribute
    pub fn stat(
        name: impl Into<String>,
        declared_type: DeclaredType,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type,
            stat: Some(attribute.into()),
        }
    }

    pub fn source(&self) -> FieldSource {
        match &self.stat {
            Some(attr) => FieldSource::Stat(attr.clone()),
            None => FieldSource::Custom,
        }
    }
}

/// Ordered list of field descriptors with unique names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    fields: Vec<FieldDescriptor>,
}

impl FieldSpec {
    /// Validate and build a spec. Order is preserved as given.
    ///
    /// Names are compared case-insensitively: SQLite column names are.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, SpecError> {
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(SpecError::EmptyName);
            }
            if !seen.insert(field.name.to_lowercase()) {
                return Err(SpecError::DuplicateField {
                    name: field.name.clone(),
                });
            }
        }
        Ok(Self { fields })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared type of a field, if the spec has it
    pub fn type_of(&self, name: &str) -> Option<DeclaredType> {
        self.get(name).map(|f| f.declared_type)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for FieldSpec {
    /// Human-readable size followed by the normalized path
    fn default() -> Self {
        Self {
            fields: vec![
                FieldDescriptor::custom("sizehuman", DeclaredType::Text),
                FieldDescriptor::custom("filepath", DeclaredType::Text),
            ],
        }
    }
}

impl<'a> IntoIterator for &'a FieldSpec {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let spec = FieldSpec::default();
        let names: Vec<_> = spec.names().collect();
        assert_eq!(names, vec!["sizehuman", "filepath"]);
        assert_eq!(spec.type_of("filepath"), Some(DeclaredType::Text));
        assert_eq!(spec.type_of("missing"), None);
    }

    #[test]
    fn test_duplicate_rejected() {
        let result = FieldSpec::new(vec![
            FieldDescriptor::custom("filepath", DeclaredType::Text),
            FieldDescriptor::stat("filepath", DeclaredType::Number, "size"),
        ]);
        assert_eq!(
            result,
            Err(SpecError::DuplicateField {
                name: "filepath".into()
            })
        );
    }

    #[test]
    fn test_duplicate_differs_only_in_case() {
        let result = FieldSpec::new(vec![
            FieldDescriptor::custom("FilePath", DeclaredType::Text),
            FieldDescriptor::custom("filepath", DeclaredType::Text),
        ]);
        assert!(matches!(result, Err(SpecError::DuplicateField { .. })));
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = FieldSpec::new(vec![FieldDescriptor::custom(" ", DeclaredType::Text)]);
        assert_eq!(result, Err(SpecError::EmptyName));
    }

    #[test]
    fn test_order_preserved() {
        let spec = FieldSpec::new(vec![
            FieldDescriptor::stat("zz_inode", DeclaredType::Number, "ino"),
            FieldDescriptor::custom("filepath", DeclaredType::Text),
            FieldDescriptor::stat("aa_size", DeclaredType::Number, "size"),
        ])
        .unwrap();
        let names: Vec<_> = spec.names().collect();
        assert_eq!(names, vec!["zz_inode", "filepath", "aa_size"]);
    }

    #[test]
    fn test_descriptor_from_toml() {
        #[derive(Deserialize)]
        struct Layout {
            fields: Vec<FieldDescriptor>,
        }

        let layout: Layout = toml::from_str(
            r#"
            [[fields]]
            name = "sizebytes"
            type = "number"
            stat = "size"

            [[fields]]
            name = "filepath"
            type = "text"
            "#,
        )
        .unwrap();

        assert_eq!(
            layout.fields[0].source(),
            FieldSource::Stat("size".into())
        );
        assert_eq!(layout.fields[1].source(), FieldSource::Custom);
    }
}
