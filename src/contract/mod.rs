//! # Contract Fields
//!
//! The logical fields a contract needs from a person row, the sign-name modes,
//! and the three pure building blocks of a batch: the identifier sequencer,
//! the field mapping, and the per-row context builder.
use crate::contract::mapping::MappingError;

pub mod context;
pub mod mapping;
pub mod sequence;

/// Logical contract fields bound to table columns.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// Title such as นาย / นางสาว / Mr.
    Prefix,
    GivenName,
    Surname,
    /// National identification number
    IdNumber,
    Address,
}

impl Field {
    /// All fields in binding order.
    pub const ALL: [Field; 5] = [
        Field::Prefix,
        Field::GivenName,
        Field::Surname,
        Field::IdNumber,
        Field::Address,
    ];

    /// Returns the field name used in messages and on the command line.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Prefix => "prefix",
            Self::GivenName => "given_name",
            Self::Surname => "surname",
            Self::IdNumber => "id_number",
            Self::Address => "address",
        }
    }

    /// Column position proposed for this field before the user adjusts it.
    pub const fn default_index(&self) -> usize {
        match self {
            Self::Prefix => 2,
            Self::GivenName => 3,
            Self::Surname => 4,
            Self::IdNumber => 5,
            Self::Address => 9,
        }
    }

    /// Parses a field from its name.
    ///
    /// Accepts the field names plus the template key aliases (case-insensitive):
    /// - GivenName: "given_name", "name"
    /// - IdNumber: "id_number", "id_card"
    pub fn parse(name: &str) -> Result<Self, MappingError> {
        match name.to_ascii_lowercase().as_str() {
            "prefix" => Ok(Self::Prefix),
            "given_name" | "name" => Ok(Self::GivenName),
            "surname" => Ok(Self::Surname),
            "id_number" | "id_card" => Ok(Self::IdNumber),
            "address" => Ok(Self::Address),
            _ => Err(MappingError::UnknownField(name.to_owned())),
        }
    }

    pub(crate) const fn position(&self) -> usize {
        *self as usize
    }
}

/// Which name parts appear on the signature line.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SignNameMode {
    /// prefix, given name and surname
    #[default]
    Full,
    GivenAndSurname,
    GivenOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_parse_aliases() {
        assert_eq!(Field::parse("name").unwrap(), Field::GivenName);
        assert_eq!(Field::parse("ID_CARD").unwrap(), Field::IdNumber);
        assert!(matches!(Field::parse("phone"), Err(MappingError::UnknownField(_))));
    }

    #[test]
    fn field_positions_follow_binding_order() {
        for (index, field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.position(), index);
        }
    }
}
