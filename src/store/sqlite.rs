//! SQLite table output
//!
//! The table is created lazily on the first row with an autoincrement key
//! followed by one column per declared field. An existing database file is
//! opened and appended to; an existing table with the same name is reused.

use crate::error::{StoreError, StoreResult};
use crate::fields::{ExtractedRow, FieldSpec, FieldValue};
use crate::store::schema::{Schema, SchemaState};
use crate::store::StoreState;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::path::{Path, PathBuf};
use tracing::debug;

const STORE_NAME: &str = "SQLite";

/// Preferred name of the autoincrement key column
const KEY_COLUMN: &str = "index";

/// Pragmas applied when the connection is opened
const WRITE_PRAGMAS: &str = r#"
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -16000;     -- 16MB cache
PRAGMA temp_store = MEMORY;
"#;

#[derive(Debug)]
pub struct SqliteStore {
    path: PathBuf,
    conn: Option<Connection>,
    schema: SchemaState,
    insert_sql: Option<String>,
    state: StoreState,
}

impl SqliteStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            conn: None,
            schema: SchemaState::default(),
            insert_sql: None,
            state: StoreState::Constructed,
        }
    }

    pub fn setup(&mut self) -> StoreResult<()> {
        if self.state == StoreState::Finished {
            return Err(StoreError::Finished { store: STORE_NAME });
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(WRITE_PRAGMAS)?;
        self.conn = Some(conn);
        self.state = StoreState::Open;
        Ok(())
    }

    pub fn declare_schema(&mut self, table: Option<&str>, spec: &FieldSpec) -> StoreResult<()> {
        self.schema.declare(table, spec)
    }

    pub fn insert(&mut self, row: &ExtractedRow) -> StoreResult<()> {
        let conn = match self.state {
            StoreState::Constructed => return Err(StoreError::NotOpen { store: STORE_NAME }),
            StoreState::Finished => return Err(StoreError::Finished { store: STORE_NAME }),
            StoreState::Open => self
                .conn
                .as_ref()
                .ok_or(StoreError::NotOpen { store: STORE_NAME })?,
        };

        if self.insert_sql.is_none() {
            let schema = self.schema.require(STORE_NAME)?;
            let table = schema
                .table()
                .filter(|t| !t.trim().is_empty())
                .ok_or(StoreError::TableNameRequired { store: STORE_NAME })?;
            let create = create_table_sql(table, schema);
            debug!(sql = %create, "Creating table");
            conn.execute(&create, [])?;
            self.insert_sql = Some(insert_sql(table, schema));
        }
        let sql = self
            .insert_sql
            .as_deref()
            .ok_or(StoreError::SchemaRequired { store: STORE_NAME })?;

        let values = self
            .schema
            .column_values(row)
            .ok_or(StoreError::SchemaRequired { store: STORE_NAME })?;

        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(sql)?;
            stmt.execute(params_from_iter(values))?;
        }
        tx.commit()?;

        self.schema.record_row();
        Ok(())
    }

    /// Close the connection. A no-op when already finished.
    pub fn finish(&mut self) -> StoreResult<()> {
        if self.state == StoreState::Finished {
            return Ok(());
        }
        self.state = StoreState::Finished;
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| e)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn rows_written(&self) -> u64 {
        self.schema.rows()
    }
}

/// Quote an identifier for use in SQL
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Key column name that does not collide with any field
fn key_column(schema: &Schema) -> String {
    let taken = |candidate: &str| {
        schema
            .columns()
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(candidate))
    };
    let mut key = KEY_COLUMN.to_string();
    while taken(&key) {
        key.push('_');
    }
    key
}

fn create_table_sql(table: &str, schema: &Schema) -> String {
    let mut columns = vec![format!(
        "{} INTEGER PRIMARY KEY AUTOINCREMENT",
        quote_ident(&key_column(schema))
    )];
    columns.extend(
        schema
            .columns()
            .iter()
            .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql_type())),
    );
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table),
        columns.join(", ")
    )
}

fn insert_sql(table: &str, schema: &Schema) -> String {
    let names: Vec<String> = schema
        .columns()
        .iter()
        .map(|(name, _)| quote_ident(name))
        .collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        placeholders.join(", ")
    )
}

/// Booleans are stored as integers, lists and maps as JSON text
impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
            FieldValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            FieldValue::Number(n) => ToSqlOutput::Owned(Value::Integer(*n)),
            FieldValue::Boolean(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            FieldValue::List(_) | FieldValue::Map(_) => {
                let json = serde_json::to_string(self)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                ToSqlOutput::Owned(Value::Text(json))
            }
        })
    }
}
