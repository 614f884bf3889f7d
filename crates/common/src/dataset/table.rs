//! In-memory tables read from GraphRAG index artifacts

use parquet::file::reader::{FileReader, SerializedFileReader};
use serde_json::{Map, Value};
use std::fs::File;
use std::path::Path;

use crate::errors::{AppError, Result};

/// Row of a table, keyed by column name
pub type Row = Map<String, Value>;

/// A named, column-ordered collection of rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from column names and positional row values.
    ///
    /// Missing trailing values become `null`; extra values are dropped.
    pub fn from_rows<I, R>(name: impl Into<String>, columns: &[&str], rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = Value>,
    {
        let mut table = Self::new(name, columns.iter().map(|c| c.to_string()).collect());
        for values in rows {
            let mut values = values.into_iter();
            let row = table
                .columns
                .iter()
                .map(|column| (column.clone(), values.next().unwrap_or(Value::Null)))
                .collect();
            table.rows.push(row);
        }
        table
    }

    /// Read a Parquet file into a table
    pub fn read_parquet(name: impl Into<String>, path: &Path) -> Result<Self> {
        let name = name.into();
        let load_error = |message: String| AppError::DatasetLoad {
            artifact: name.clone(),
            message,
        };

        let file = File::open(path)
            .map_err(|e| load_error(format!("{}: {}", path.display(), e)))?;
        let reader = SerializedFileReader::new(file)
            .map_err(|e| load_error(e.to_string()))?;

        let columns = reader
            .metadata()
            .file_metadata()
            .schema()
            .get_fields()
            .iter()
            .map(|field| field.name().to_string())
            .collect();

        let mut table = Self::new(name.clone(), columns);
        let rows = reader
            .get_row_iter(None)
            .map_err(|e| load_error(e.to_string()))?;

        for row in rows {
            let row = row.map_err(|e| load_error(e.to_string()))?;
            match row.to_json_value() {
                Value::Object(map) => table.rows.push(map),
                other => {
                    return Err(load_error(format!("unexpected row shape: {}", other)));
                }
            }
        }

        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Convert to a list of records, one JSON object per row.
    ///
    /// Columns absent from a row are emitted as `null` so every record
    /// carries the full column set.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let record: Map<String, Value> = self
                    .columns
                    .iter()
                    .map(|column| {
                        (column.clone(), row.get(column).cloned().unwrap_or(Value::Null))
                    })
                    .collect();
                Value::Object(record)
            })
            .collect()
    }
}
