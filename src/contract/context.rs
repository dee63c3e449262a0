//! Per-row rendering context.

use crate::contract::mapping::FieldMapping;
use crate::contract::Field;
use crate::contract::SignNameMode;
use crate::table::Row;
use thiserror::Error;

/// Errors raised while building a row context.
#[derive(Error, Debug)]
pub enum ContextError {
    /// The row has no value for a mapped column
    #[error("Missing field '{field}': row has no column '{column}'")]
    MissingField { field: &'static str, column: String },
}

/// Flat key/value context substituted into a template for one person.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowContext {
    pub contract_id: String,
    pub prefix: String,
    pub name: String,
    pub surname: String,
    pub id_card: String,
    pub address: String,
    pub sign_name: String,
}

impl RowContext {
    /// Template keys, in the order they are listed to users.
    pub const KEYS: [&'static str; 7] = [
        "contract_id",
        "prefix",
        "name",
        "surname",
        "id_card",
        "address",
        "sign_name",
    ];

    /// Builds the context of `row` under `mapping`, identified by `sequence_id`.
    pub fn build(
        row: &Row,
        mapping: &FieldMapping,
        sequence_id: &str,
        mode: SignNameMode,
    ) -> Result<RowContext, ContextError> {
        let value = |field: Field| {
            let column = mapping.column(field);
            row.get(column)
                .map(str::to_owned)
                .ok_or_else(|| ContextError::MissingField {
                    field: field.as_str(),
                    column: column.to_owned(),
                })
        };

        let prefix = value(Field::Prefix)?;
        let name = value(Field::GivenName)?;
        let surname = value(Field::Surname)?;
        let sign_name = sign_name(&prefix, &name, &surname, mode);
        Ok(RowContext {
            contract_id: sequence_id.to_owned(),
            prefix,
            name,
            surname,
            id_card: value(Field::IdNumber)?,
            address: value(Field::Address)?,
            sign_name,
        })
    }

    /// Looks up a template key (case-sensitive).
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "contract_id" => Some(&self.contract_id),
            "prefix" => Some(&self.prefix),
            "name" => Some(&self.name),
            "surname" => Some(&self.surname),
            "id_card" => Some(&self.id_card),
            "address" => Some(&self.address),
            "sign_name" => Some(&self.sign_name),
            _ => None,
        }
    }

    /// Iterates `(key, value)` pairs in `KEYS` order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        Self::KEYS
            .into_iter()
            .filter_map(|key| self.get(key).map(|value| (key, value)))
    }
}

/// Joins the name parts selected by `mode` with single spaces, skipping blanks.
fn sign_name(prefix: &str, name: &str, surname: &str, mode: SignNameMode) -> String {
    let parts = match mode {
        SignNameMode::Full => vec![prefix, name, surname],
        SignNameMode::GivenAndSurname => vec![name, surname],
        SignNameMode::GivenOnly => vec![name],
    };
    parts
        .into_iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<&str>>()
        .join(" ")
}
