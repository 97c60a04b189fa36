//! Dynamically typed field values and ordered rows
//!
//! Rows are ordered `(name, value)` sequences rather than maps: the field
//! order of the field spec is the column order of every backend.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::SpecError;

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    /// UTF-8 text
    #[serde(alias = "string")]
    Text,
    /// Signed 64-bit integer
    #[serde(alias = "numeric", alias = "integer")]
    Number,
    /// true/false
    #[serde(alias = "bool")]
    Boolean,
    /// List or map
    #[serde(alias = "array", alias = "hash")]
    Object,
}

impl DeclaredType {
    /// Name used in config files and the JSON schema header
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclaredType::Text => "text",
            DeclaredType::Number => "number",
            DeclaredType::Boolean => "boolean",
            DeclaredType::Object => "object",
        }
    }

    /// Native SQLite column type
    pub fn sql_type(&self) -> &'static str {
        match self {
            DeclaredType::Text => "TEXT",
            DeclaredType::Number => "INTEGER",
            DeclaredType::Boolean => "BOOLEAN",
            DeclaredType::Object => "TEXT",
        }
    }

    /// Value substituted for a missing (null) value
    pub fn zero_value(&self) -> Option<FieldValue> {
        match self {
            DeclaredType::Text => Some(FieldValue::Text(String::new())),
            DeclaredType::Number => Some(FieldValue::Number(0)),
            DeclaredType::Object => Some(FieldValue::Map(Vec::new())),
            DeclaredType::Boolean => None,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeclaredType {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "string" => Ok(DeclaredType::Text),
            "number" | "numeric" | "integer" => Ok(DeclaredType::Number),
            "boolean" | "bool" => Ok(DeclaredType::Boolean),
            "object" | "array" | "hash" | "list" | "map" => Ok(DeclaredType::Object),
            _ => Err(SpecError::UnknownType(s.to_string())),
        }
    }
}

/// A single extracted value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Text(String),
    Number(i64),
    Boolean(bool),
    List(Vec<FieldValue>),
    /// Ordered key/value pairs
    Map(Vec<(String, FieldValue)>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Replace a null by the zero value of `declared`, if it has one
    pub fn coerce(self, declared: Option<DeclaredType>) -> Self {
        match (self, declared) {
            (FieldValue::Null, Some(ty)) => ty.zero_value().unwrap_or(FieldValue::Null),
            (value, _) => value,
        }
    }

    /// Plain rendering used for delimited text rows
    pub fn to_plain(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::List(_) | FieldValue::Map(_) => self.inspect(),
        }
    }

    /// Structural representation of a value: `["a", 1]`, `{"k": 1}`
    pub fn inspect(&self) -> String {
        match self {
            FieldValue::Null => "nil".to_string(),
            FieldValue::Text(s) => format!("{:?}", s),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::List(items) => {
                let inner: Vec<String> = items.iter().map(FieldValue::inspect).collect();
                format!("[{}]", inner.join(", "))
            }
            FieldValue::Map(pairs) => {
                let inner: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{:?}: {}", k, v.inspect()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
        }
    }

    /// Diagnostic rendering according to the declared type.
    ///
    /// Text is quoted and escaped, objects use [`FieldValue::inspect`],
    /// everything else falls back to the plain rendering.
    pub fn repr(&self, declared: Option<DeclaredType>) -> String {
        match declared {
            Some(DeclaredType::Text) => match self {
                FieldValue::Text(s) => format!("{:?}", s),
                other => format!("{:?}", other.to_plain()),
            },
            Some(DeclaredType::Object) => self.inspect(),
            _ => self.to_plain(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_plain())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Number(n) => serializer.serialize_i64(*n),
            FieldValue::Boolean(b) => serializer.serialize_bool(*b),
            FieldValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            FieldValue::Map(pairs) => serialize_pairs(pairs, serializer),
        }
    }
}

fn serialize_pairs<S: Serializer>(
    pairs: &[(String, FieldValue)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (key, value) in pairs {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

/// One row of extracted values, in field-spec order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedRow {
    values: Vec<(String, FieldValue)>,
}

impl ExtractedRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Append a value; order of calls is the column order
    pub fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        self.values.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for ExtractedRow {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl Serialize for ExtractedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_pairs(&self.values, serializer)
    }
}
