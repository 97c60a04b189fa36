//! JSON document output
//!
//! Layout of a finished file:
//!
//! ```text
//! {
//! "schema": {
//!   "sizehuman": "text",
//!   "filepath": "text"
//! },"data": [
//! {
//!   "sizehuman": "10.0B",
//!   "filepath": "R:/a.txt"
//! },
//! ]}
//! ```
//!
//! Every row is followed by `,` which leaves a trailing comma before the
//! closing bracket. Consumers of these files expect that shape, so strict
//! output is opt-in via [`JsonStore::new`].

use crate::error::{StoreError, StoreResult};
use crate::fields::{ExtractedRow, FieldSpec};
use crate::store::schema::SchemaState;
use crate::store::StoreState;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const STORE_NAME: &str = "JSON";

#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    strict: bool,
    writer: Option<BufWriter<File>>,
    schema: SchemaState,
    head_written: bool,
    foot_written: bool,
    state: StoreState,
}

impl JsonStore {
    pub fn new(path: &Path, strict: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            strict,
            writer: None,
            schema: SchemaState::default(),
            head_written: false,
            foot_written: false,
            state: StoreState::Constructed,
        }
    }

    pub fn setup(&mut self) -> StoreResult<()> {
        if self.state == StoreState::Finished {
            return Err(StoreError::Finished { store: STORE_NAME });
        }
        let file = File::create(&self.path)?;
        self.writer = Some(BufWriter::new(file));
        self.state = StoreState::Open;
        Ok(())
    }

    pub fn declare_schema(&mut self, table: Option<&str>, spec: &FieldSpec) -> StoreResult<()> {
        self.schema.declare(table, spec)
    }

    pub fn insert(&mut self, row: &ExtractedRow) -> StoreResult<()> {
        match self.state {
            StoreState::Constructed => return Err(StoreError::NotOpen { store: STORE_NAME }),
            StoreState::Finished => return Err(StoreError::Finished { store: STORE_NAME }),
            StoreState::Open => {}
        }

        // Serialize before touching the file so a bad row leaves no partial output
        let coerced: ExtractedRow = self.schema.coerce_row(row).into_iter().collect();
        let body = serde_json::to_string_pretty(&coerced)?;

        self.write_head()?;
        let first = self.schema.rows() == 0;
        let strict = self.strict;
        let writer = self.writer()?;
        if strict {
            if !first {
                writer.write_all(b",\n")?;
            }
            writer.write_all(body.as_bytes())?;
        } else {
            writeln!(writer, "{},", body)?;
        }

        self.schema.record_row();
        Ok(())
    }

    /// Close the document. Writes the header first when no row was inserted;
    /// calling it again is a no-op.
    pub fn finish(&mut self) -> StoreResult<()> {
        if self.state == StoreState::Finished {
            return Ok(());
        }
        if self.state == StoreState::Open && !self.foot_written {
            self.write_head()?;
            let strict_tail = self.strict && self.schema.rows() > 0;
            let writer = self.writer()?;
            if strict_tail {
                writer.write_all(b"\n")?;
            }
            writer.write_all(b"]}\n")?;
            writer.flush()?;
            self.foot_written = true;
        }
        self.state = StoreState::Finished;
        self.writer = None;
        Ok(())
    }

    fn write_head(&mut self) -> StoreResult<()> {
        if self.head_written {
            return Ok(());
        }
        let schema = match self.schema.schema() {
            Some(schema) => serde_json::to_string_pretty(schema)?,
            None => "{}".to_string(),
        };
        let writer = self.writer()?;
        write!(writer, "{{\n\"schema\": {},\"data\": [\n", schema)?;
        self.head_written = true;
        Ok(())
    }

    fn writer(&mut self) -> StoreResult<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or(StoreError::NotOpen { store: STORE_NAME })
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
