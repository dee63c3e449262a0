//! # Source Table
//!
//! The person table a batch is generated from: an ordered list of rows, each a
//! mapping from column name to text. Every cell is kept as text exactly as it
//! appears in the file, so identification numbers keep their leading zeros.
use crate::contract::mapping::FieldMapping;
use crate::contract::Field;
use crate::error::ContractError;
use crate::error::ResultMessage;
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

mod decode;

/// Errors raised while loading a table.
#[derive(Error, Debug)]
pub enum TableError {
    /// Neither UTF-8 nor TIS-620 accepts the bytes
    #[error("Table is neither valid UTF-8 nor TIS-620 text")]
    DecodingError,

    /// The table text is not well-formed CSV
    #[error("Malformed table: {0}")]
    MalformedTable(String),

    #[error("{0}")]
    Csv(#[from] csv::Error),
}

/// One record of the table, addressed by column name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    values: HashMap<String, String>,
}

impl Row {
    /// Builds a row from `(column, value)` pairs.
    pub fn new<I, K, V>(pairs: I) -> Row
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Row {
            values: pairs
                .into_iter()
                .map(|(column, value)| (column.into(), value.into()))
                .collect(),
        }
    }

    /// Returns the text stored under `column`, or None if the row has no such column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

/// An ordered, read-only table of rows sharing one column set.
#[derive(Clone, Debug, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Builds a table from a header and its records.
    ///
    /// Records shorter than the header are padded with empty cells; longer
    /// ones are rejected. Header names are normalised: a blank name becomes `Unnamed: <index>`
    /// and repeats of a name get `.1`, `.2`, ... suffixes.
    pub fn new(header: Vec<String>, records: Vec<Vec<String>>) -> Result<Table, TableError> {
        let columns = normalize_header(header);
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(index, mut record)| {
                if record.len() <= columns.len() {
                    record.resize(columns.len(), String::new());
                    Ok(Row::new(columns.iter().cloned().zip(record)))
                } else {
                    Err(TableError::MalformedTable(format!(
                        "record {} has {} fields, header has {}",
                        index + 1,
                        record.len(),
                        columns.len()
                    )))
                }
            })
            .collect::<Result<Vec<Row>, TableError>>()?;
        Ok(Table { columns, rows })
    }

    /// Parses CSV bytes, decoding them as UTF-8 or, failing that, TIS-620.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Table, TableError> {
        let (text, encoding) = decode::decode(bytes)?;
        tracing::debug!("Decoded table as {}", encoding.name());
        Self::from_csv_str(&text)
    }

    /// Parses CSV text whose first record is the header.
    pub fn from_csv_str(text: &str) -> Result<Table, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());
        let header = reader.headers()?.iter().map(str::to_owned).collect();
        let records = reader
            .records()
            .map(|record| record.map(|record| record.iter().map(str::to_owned).collect()))
            .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;
        Self::new(header, records)
    }

    /// Reads and parses a CSV file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Table, ContractError> {
        let path = path.as_ref();
        std::fs::read(path)
            .map_err(ContractError::from)
            .and_then(|bytes| Ok(Self::from_csv_bytes(&bytes)?))
            .with_prefix(&format!("Read table '{}' failed", path.display()))
    }

    /// Column names in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows in file order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The row at `index` (0-based), if present.
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Human-readable label of every row: prefix, given name and surname.
    pub fn labels(&self, mapping: &FieldMapping) -> Vec<String> {
        self.rows.iter().map(|row| label(row, mapping)).collect()
    }
}

/// Display label of a single row; missing cells are left out.
pub(crate) fn label(row: &Row, mapping: &FieldMapping) -> String {
    [Field::Prefix, Field::GivenName, Field::Surname]
        .iter()
        .filter_map(|field| row.get(mapping.column(*field)))
        .filter(|value| !value.is_empty())
        .collect::<Vec<&str>>()
        .join(" ")
}

fn normalize_header(header: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::<String>::new();
    header
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let name = if name.trim().is_empty() {
                format!("Unnamed: {index}")
            } else {
                name
            };
            let mut candidate = name.clone();
            let mut suffix = 1usize;
            while seen.contains(&candidate) {
                candidate = format!("{name}.{suffix}");
                suffix += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}
