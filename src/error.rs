use thiserror::Error;

/// Main error type for contract generation.
/// Aggregates errors from the standard library, dependencies, and the domain modules.
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("{0}")]
    WithContextError(String),

    /// A single row failed inside a batch; the whole batch is discarded.
    #[error("Row {row} ({label}): {source}")]
    RowError {
        row: usize,
        label: String,
        #[source]
        source: Box<ContractError>,
    },

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    // Third-party library errors
    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Domain module errors
    #[error("{0}")]
    TableError(#[from] crate::table::TableError),

    #[error("{0}")]
    MappingError(#[from] crate::contract::mapping::MappingError),

    #[error("{0}")]
    ContextError(#[from] crate::contract::context::ContextError),

    #[error("{0}")]
    RenderError(#[from] crate::document::RenderError),

    #[error("{0}")]
    BatchError(#[from] crate::batch::BatchError),
}

impl ContractError {
    /// Strips any row wrapper and returns the error that actually failed.
    pub fn root(&self) -> &ContractError {
        match self {
            ContractError::RowError { source, .. } => source.root(),
            _ => self,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, ContractError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| ContractError::WithContextError(format!("{}: {}", message, e)))
    }
}

pub(crate) trait ResultRow<T> {
    /// Attaches the table row index and display label to a failure.
    fn at_row(self, row: usize, label: &str) -> Result<T, ContractError>;
}

impl<T, E: Into<ContractError>> ResultRow<T> for Result<T, E> {
    fn at_row(self, row: usize, label: &str) -> Result<T, ContractError> {
        self.map_err(|e| ContractError::RowError {
            row,
            label: label.to_owned(),
            source: Box::new(e.into()),
        })
    }
}
