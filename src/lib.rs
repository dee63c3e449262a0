//! # Rusty Contract
//!
//! Batch generation of filled `.docx` contracts from a person table.
//!
//! A run reads a CSV table (UTF-8, or TIS-620 for legacy Thai exports), binds
//! the contract fields to table columns, and renders a template once per
//! selected row. Each document gets the next identifier of a sequence derived
//! from one starting identifier, and the documents are bundled into a single
//! zip archive.
//!
//! ## Features
//!
//! - **Encoding fallback**: UTF-8 first, TIS-620 second, every cell kept as text
//! - **Positional default mapping**: prefix, given name, surname, identification
//!   number and address are proposed from columns 2, 3, 4, 5 and 9, and can be rebound
//! - **Identifier sequence**: trailing digits are incremented keeping their width
//! - **Template rendering**: `{{ key }}` placeholders in the main document, headers,
//!   footers, footnotes and endnotes, even when split across text runs
//! - **All-or-nothing batches**: the first failing row aborts the batch and names
//!   the row; archive entry names never collide
//!
//! ## Template Keys
//!
//! `contract_id`, `prefix`, `name`, `surname`, `id_card`, `address`, `sign_name`
pub mod batch;
pub mod contract;
pub mod document;
pub mod error;
mod helpers;
pub mod table;

pub use crate::batch::generate;
pub use crate::batch::generate_single;
pub use crate::batch::BatchResult;
pub use crate::batch::GeneratedDocument;
pub use crate::batch::GenerationOptions;
pub use crate::batch::Selection;
pub use crate::contract::context::RowContext;
pub use crate::contract::mapping::FieldMapping;
pub use crate::contract::Field;
pub use crate::contract::SignNameMode;
pub use crate::document::Template;
pub use crate::error::ContractError;
pub use crate::table::Table;
