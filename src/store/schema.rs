//! Schema bookkeeping shared by every backend
//!
//! Backends record the declared schema here and use it for value coercion.
//! Declaring is allowed once, and only before the first row.

use crate::error::{StoreError, StoreResult};
use crate::fields::{DeclaredType, ExtractedRow, FieldSpec, FieldValue};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Declared table name and ordered column types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    table: Option<String>,
    columns: Vec<(String, DeclaredType)>,
}

impl Schema {
    pub fn from_spec(table: Option<&str>, spec: &FieldSpec) -> Self {
        Self {
            table: table.map(str::to_string),
            columns: spec
                .iter()
                .map(|f| (f.name.clone(), f.declared_type))
                .collect(),
        }
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn columns(&self) -> &[(String, DeclaredType)] {
        &self.columns
    }

    pub fn type_of(&self, name: &str) -> Option<DeclaredType> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, ty)| *ty)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Serializes as an ordered `name -> type` map for the JSON header
impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, ty) in &self.columns {
            map.serialize_entry(name, ty)?;
        }
        map.end()
    }
}

/// Schema slot and row counter of one backend
#[derive(Debug, Default)]
pub struct SchemaState {
    schema: Option<Schema>,
    rows: u64,
}

impl SchemaState {
    pub fn declare(&mut self, table: Option<&str>, spec: &FieldSpec) -> StoreResult<()> {
        if self.schema.is_some() {
            return Err(StoreError::SchemaAlreadyDeclared);
        }
        if self.rows > 0 {
            return Err(StoreError::SchemaAfterInsert);
        }
        self.schema = Some(Schema::from_spec(table, spec));
        Ok(())
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Schema, or `SchemaRequired` for backends that cannot run without one
    pub fn require(&self, store: &'static str) -> StoreResult<&Schema> {
        self.schema
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or(StoreError::SchemaRequired { store })
    }

    /// Apply null coercion to every value of a row.
    ///
    /// Without a declared schema values pass through unchanged.
    pub fn coerce_row(&self, row: &ExtractedRow) -> Vec<(String, FieldValue)> {
        row.iter()
            .map(|(name, value)| {
                let declared = self.schema.as_ref().and_then(|s| s.type_of(name));
                (name.to_string(), value.clone().coerce(declared))
            })
            .collect()
    }

    /// Values of `row` in declared column order.
    ///
    /// A field the row lacks is treated as null and coerced like one.
    pub fn column_values(&self, row: &ExtractedRow) -> Option<Vec<FieldValue>> {
        let schema = self.schema.as_ref()?;
        let values = schema
            .columns()
            .iter()
            .map(|(name, ty)| {
                row.get(name)
                    .cloned()
                    .unwrap_or(FieldValue::Null)
                    .coerce(Some(*ty))
            })
            .collect();
        Some(values)
    }

    pub fn record_row(&mut self) {
        self.rows += 1;
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }
}
