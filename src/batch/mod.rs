//! # Batch Generation
//!
//! Drives the sequencer, context builder and renderer over a selection of
//! table rows and bundles the documents into one zip archive. A batch is
//! all-or-nothing: the first failing row aborts it and no archive is returned.

pub mod archive;

use crate::batch::archive::sanitize_entry_name;
use crate::batch::archive::ArchiveBuilder;
use crate::contract::context::RowContext;
use crate::contract::mapping::FieldMapping;
use crate::contract::sequence;
use crate::contract::SignNameMode;
use crate::document::Template;
use crate::error::ContractError;
use crate::error::ResultRow;
use crate::table;
use crate::table::Table;
use chrono::NaiveDateTime;
use std::collections::BTreeSet;
use thiserror::Error;
use zip::result::ZipError;

/// Extension of every generated document
const DOCUMENT_EXTENSION: &str = "docx";

/// Errors raised by batch orchestration.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("No rows selected")]
    EmptySelection,

    #[error("Row {row} is out of range: the table has {rows} rows")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("Archive error: {0}")]
    ArchiveError(#[from] ZipError),
}

/// Row indices chosen for a batch.
///
/// Always iterated in table order, whatever order the indices were picked in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    rows: BTreeSet<usize>,
}

impl Selection {
    /// Selects every row of `table`.
    pub fn all(table: &Table) -> Selection {
        (0..table.len()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Selected row indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows.iter().copied()
    }

    /// Checks that every index addresses a row of a table with `rows` rows.
    pub fn validate(&self, rows: usize) -> Result<(), BatchError> {
        match self.rows.iter().find(|&&row| row >= rows) {
            Some(&row) => Err(BatchError::RowOutOfRange { row, rows }),
            None => Ok(()),
        }
    }
}

impl FromIterator<usize> for Selection {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Selection {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Knobs applied to every document of a run.
#[derive(Clone, Debug, Default)]
pub struct GenerationOptions {
    pub sign_name_mode: SignNameMode,
    /// Fail on placeholders that match no context key instead of rendering them blank
    pub strict_placeholders: bool,
    /// Modification time stamped on archive entries
    pub timestamp: Option<NaiveDateTime>,
}

/// One rendered document.
#[derive(Clone, Debug)]
pub struct GeneratedDocument {
    /// Archive entry name, or suggested file name in single-row mode
    pub name: String,
    pub contract_id: String,
    pub bytes: Vec<u8>,
}

/// Outcome of a successful batch.
#[derive(Clone, Debug)]
pub struct BatchResult {
    /// Zip archive holding every document
    pub archive: Vec<u8>,
    /// Documents in table order, named as stored in the archive
    pub documents: Vec<GeneratedDocument>,
    pub count: usize,
    pub start_id: String,
}

/// Generates one document per selected row and packages them into an archive.
///
/// # Arguments
/// * `table` - Source table
/// * `mapping` - Column bound to each contract field
/// * `selection` - Rows to process; processed in table order
/// * `template` - Template rendered afresh for every row
/// * `start_id` - Identifier of the first selected row
/// * `options` - Sign-name mode, placeholder strictness and archive timestamp
///
/// # Returns
/// The archive and its documents, or the first error; a failing row is
/// reported with its index and label and nothing is produced
pub fn generate(
    table: &Table,
    mapping: &FieldMapping,
    selection: &Selection,
    template: &Template,
    start_id: &str,
    options: &GenerationOptions,
) -> Result<BatchResult, ContractError> {
    if selection.is_empty() {
        Err(BatchError::EmptySelection)?;
    }
    mapping.validate(table.columns())?;
    selection.validate(table.len())?;

    let mut archive = ArchiveBuilder::new(options.timestamp);
    let mut documents = Vec::with_capacity(selection.len());
    for (n, index) in selection.iter().enumerate() {
        let row = table.row(index).ok_or(BatchError::RowOutOfRange {
            row: index,
            rows: table.len(),
        })?;
        let label = table::label(row, mapping);
        let contract_id = sequence::nth(start_id, n);
        let context = RowContext::build(row, mapping, &contract_id, options.sign_name_mode).at_row(index, &label)?;
        let bytes = template
            .render(&context, options.strict_placeholders)
            .at_row(index, &label)?;

        let name = format!("{}_{}.{}", contract_id, context.name, DOCUMENT_EXTENSION);
        let name = archive.append(&name, &bytes).at_row(index, &label)?;
        tracing::debug!("Row {} ({}) rendered as {}", index, label, name);
        documents.push(GeneratedDocument {
            name,
            contract_id,
            bytes,
        });
    }

    let archive = archive.finish()?;
    tracing::info!(
        "Generated {} contracts starting at {} ({} bytes archive)",
        documents.len(),
        start_id,
        archive.len()
    );
    Ok(BatchResult {
        archive,
        count: documents.len(),
        documents,
        start_id: start_id.to_owned(),
    })
}

/// Generates the document of a single row, identified by `contract_id`.
///
/// The document is named `Contract_<given_name>_<surname>.docx`.
pub fn generate_single(
    table: &Table,
    mapping: &FieldMapping,
    row: usize,
    template: &Template,
    contract_id: &str,
    options: &GenerationOptions,
) -> Result<GeneratedDocument, ContractError> {
    mapping.validate(table.columns())?;
    let record = table.row(row).ok_or(BatchError::RowOutOfRange {
        row,
        rows: table.len(),
    })?;
    let label = table::label(record, mapping);
    let context = RowContext::build(record, mapping, contract_id, options.sign_name_mode).at_row(row, &label)?;
    let bytes = template
        .render(&context, options.strict_placeholders)
        .at_row(row, &label)?;
    let name = sanitize_entry_name(&format!(
        "Contract_{}_{}.{}",
        context.name, context.surname, DOCUMENT_EXTENSION
    ));
    tracing::info!("Generated {} for row {} ({})", name, row, label);
    Ok(GeneratedDocument {
        name,
        contract_id: contract_id.to_owned(),
        bytes,
    })
}
