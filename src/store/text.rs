//! Delimited text output
//!
//! ```text
//! sizehuman<TAB>filepath
//! 10.0B<TAB>R:/a.txt
//! 2.0M<TAB>R:/sub/b.bin
//! ```

use crate::error::{StoreError, StoreResult};
use crate::fields::{ExtractedRow, FieldSpec, FieldValue};
use crate::store::schema::SchemaState;
use crate::store::StoreState;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const STORE_NAME: &str = "Text";

/// Separator-joined rows with a header line
#[derive(Debug)]
pub struct TextStore {
    path: PathBuf,
    separator: String,
    writer: Option<BufWriter<File>>,
    schema: SchemaState,
    header_written: bool,
    state: StoreState,
}

impl TextStore {
    pub fn new(path: &Path, separator: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            separator: separator.to_string(),
            writer: None,
            schema: SchemaState::default(),
            header_written: false,
            state: StoreState::Constructed,
        }
    }

    /// Create (truncate) the output file
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
        let writer = match self.state {
            StoreState::Constructed => return Err(StoreError::NotOpen { store: STORE_NAME }),
            StoreState::Finished => return Err(StoreError::Finished { store: STORE_NAME }),
            StoreState::Open => self
                .writer
                .as_mut()
                .ok_or(StoreError::NotOpen { store: STORE_NAME })?,
        };

        let schema = self.schema.require(STORE_NAME)?;
        if !self.header_written {
            let header: Vec<&str> = schema.columns().iter().map(|(n, _)| n.as_str()).collect();
            writeln!(writer, "{}", header.join(&self.separator))?;
            self.header_written = true;
        }

        let line: Vec<String> = self
            .schema
            .column_values(row)
            .ok_or(StoreError::SchemaRequired { store: STORE_NAME })?
            .iter()
            .map(FieldValue::to_plain)
            .collect();
        writeln!(writer, "{}", line.join(&self.separator))?;
        writer.flush()?;

        self.schema.record_row();
        Ok(())
    }

    /// Flush and close. A store that was never opened finishes as a no-op.
    pub fn finish(&mut self) -> StoreResult<()> {
        if self.state == StoreState::Finished {
            return Ok(());
        }
        self.state = StoreState::Finished;
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
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
