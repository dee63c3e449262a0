//! Binding of logical contract fields to table columns.

use crate::contract::Field;
use thiserror::Error;

/// Errors related to field mappings.
#[derive(Error, Debug)]
pub enum MappingError {
    /// A field is bound to a column the table does not have
    #[error("Invalid mapping: field '{field}' is bound to unknown column '{column}'")]
    InvalidMapping { field: &'static str, column: String },

    #[error("Cannot map fields of a table without columns")]
    NoColumns,

    #[error("Unknown contract field '{0}'")]
    UnknownField(String),
}

/// Column bound to each logical field.
///
/// A plain value: it holds column names only, never the table itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMapping {
    columns: [String; 5],
}

impl FieldMapping {
    /// Proposes the positional default binding for a table with these columns.
    ///
    /// Each field takes the column at its default position, or the first column
    /// when the table is too narrow for that position.
    pub fn propose(columns: &[String]) -> Result<FieldMapping, MappingError> {
        let first = columns.first().ok_or(MappingError::NoColumns)?;
        Ok(FieldMapping {
            columns: Field::ALL.map(|field| {
                columns
                    .get(field.default_index())
                    .unwrap_or(first)
                    .to_owned()
            }),
        })
    }

    /// Rebinds `field` to `column`, which must be one of `columns`.
    pub fn bind(&mut self, field: Field, column: &str, columns: &[String]) -> Result<(), MappingError> {
        if !columns.iter().any(|name| name == column) {
            return Err(MappingError::InvalidMapping {
                field: field.as_str(),
                column: column.to_owned(),
            });
        }
        self.columns[field.position()] = column.to_owned();
        Ok(())
    }

    /// Column currently bound to `field`.
    pub fn column(&self, field: Field) -> &str {
        &self.columns[field.position()]
    }

    /// Checks that every bound column exists in `columns`.
    pub fn validate(&self, columns: &[String]) -> Result<(), MappingError> {
        Field::ALL
            .iter()
            .find(|field| !columns.iter().any(|name| name == self.column(**field)))
            .map_or(Ok(()), |field| {
                Err(MappingError::InvalidMapping {
                    field: field.as_str(),
                    column: self.column(*field).to_owned(),
                })
            })
    }

    /// Iterates `(field, column)` pairs in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL.into_iter().map(|field| (field, self.column(field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(count: usize) -> Vec<String> {
        (0..count).map(|index| format!("c{index}")).collect()
    }

    #[test]
    fn propose_positional_defaults() {
        let mapping = FieldMapping::propose(&columns(10)).unwrap();
        assert_eq!(mapping.column(Field::Prefix), "c2");
        assert_eq!(mapping.column(Field::GivenName), "c3");
        assert_eq!(mapping.column(Field::Surname), "c4");
        assert_eq!(mapping.column(Field::IdNumber), "c5");
        assert_eq!(mapping.column(Field::Address), "c9");
    }

    #[test]
    fn propose_clamps_to_first_column() {
        let mapping = FieldMapping::propose(&columns(4)).unwrap();
        assert_eq!(mapping.column(Field::Prefix), "c2");
        assert_eq!(mapping.column(Field::GivenName), "c3");
        assert_eq!(mapping.column(Field::Surname), "c0");
        assert_eq!(mapping.column(Field::IdNumber), "c0");
        assert_eq!(mapping.column(Field::Address), "c0");
    }

    #[test]
    fn propose_without_columns() {
        assert!(matches!(FieldMapping::propose(&[]), Err(MappingError::NoColumns)));
    }

    #[test]
    fn bind_overrides() {
        let columns = columns(10);
        let mut mapping = FieldMapping::propose(&columns).unwrap();
        mapping.bind(Field::Address, "c7", &columns).unwrap();
        assert_eq!(mapping.column(Field::Address), "c7");
        assert!(mapping.validate(&columns).is_ok());
    }

    #[test]
    fn bind_rejects_unknown_column() {
        let columns = columns(10);
        let mut mapping = FieldMapping::propose(&columns).unwrap();
        let result = mapping.bind(Field::Surname, "nickname", &columns);
        assert!(matches!(
            result,
            Err(MappingError::InvalidMapping { field: "surname", .. })
        ));
        assert_eq!(mapping.column(Field::Surname), "c4");
    }

    #[test]
    fn validate_against_other_table() {
        let mapping = FieldMapping::propose(&columns(10)).unwrap();
        let result = mapping.validate(&columns(6));
        assert!(matches!(
            result,
            Err(MappingError::InvalidMapping { field: "address", .. })
        ));
    }
}
