//! Error types

use crate::binary::read::ReadEof;
use crate::tag::DisplayTag;
use std::fmt;

/// Errors that originate when decoding binary data
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ParseError {
    BadEof,
    BadValue,
    NotImplemented,
}

impl From<ReadEof> for ParseError {
    fn from(_error: ReadEof) -> Self {
        ParseError::BadEof
    }
}

impl From<std::num::TryFromIntError> for ParseError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        ParseError::BadValue
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::BadEof => write!(f, "end of data reached unexpectedly"),
            ParseError::BadValue => write!(f, "invalid value"),
            ParseError::NotImplemented => write!(f, "feature not implemented"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors that originate when writing binary data
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum WriteError {
    BadValue,
    NotImplemented,
    PlaceholderMismatch,
    /// A field type name that the type codec does not know.
    UnsupportedType(String),
    /// A nested table ended up further than 65535 bytes from the start of the named table.
    OffsetOverflow(String),
    /// An override value whose type differs from the named field's type.
    FieldTypeMismatch(String),
}

impl From<std::num::TryFromIntError> for WriteError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        WriteError::BadValue
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::BadValue => write!(f, "write: bad value"),
            WriteError::NotImplemented => write!(f, "writing in this format is not implemented"),
            WriteError::PlaceholderMismatch => {
                write!(f, "data written to placeholder did not match expected size")
            }
            WriteError::UnsupportedType(name) => write!(f, "unsupported field type '{}'", name),
            WriteError::OffsetOverflow(table) => {
                write!(f, "table '{}' is too big for 16-bit offsets", table)
            }
            WriteError::FieldTypeMismatch(field) => {
                write!(f, "override for field '{}' has the wrong type", field)
            }
        }
    }
}

impl std::error::Error for WriteError {}

/// Errors raised while building or editing layout tables
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum LayoutError {
    /// A Coverage or ClassDef format selector other than 1 or 2, or a format that cannot be
    /// modified in place.
    InvalidFormat { table: &'static str, format: u16 },
    /// A script without a default language system.
    MissingRequiredField { script: u32 },
    /// No subtable builder is registered for this lookup type.
    UnsupportedLookupType(u16),
    /// A substitution rule with the wrong shape.
    InvalidArgument(&'static str),
    /// The feature tag has no substitution handler.
    UnsupportedFeature(u32),
    /// A lookup holds a subtable that does not belong to its lookup type.
    SubtableMismatch { lookup_type: u16 },
    /// A coverage table covers a different number of glyphs than its parallel array holds.
    CoverageMismatch { coverage: usize, array: usize },
    Write(WriteError),
}

impl From<WriteError> for LayoutError {
    fn from(error: WriteError) -> Self {
        LayoutError::Write(error)
    }
}

impl From<std::num::TryFromIntError> for LayoutError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        LayoutError::Write(WriteError::BadValue)
    }
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::InvalidFormat { table, format } => {
                write!(f, "{} format {} is not supported here", table, format)
            }
            LayoutError::MissingRequiredField { script } => write!(
                f,
                "script '{}' has no default language system",
                DisplayTag(*script)
            ),
            LayoutError::UnsupportedLookupType(lookup_type) => {
                write!(f, "unable to write lookup type {} tables", lookup_type)
            }
            LayoutError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            LayoutError::UnsupportedFeature(tag) => {
                write!(f, "no substitution handler for feature '{}'", DisplayTag(*tag))
            }
            LayoutError::SubtableMismatch { lookup_type } => {
                write!(f, "lookup of type {} holds a foreign subtable", lookup_type)
            }
            LayoutError::CoverageMismatch { coverage, array } => write!(
                f,
                "coverage lists {} glyphs but the subtable holds {} entries",
                coverage, array
            ),
            LayoutError::Write(err) => write!(f, "write error: {}", err),
        }
    }
}

impl std::error::Error for LayoutError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag;

    #[test]
    fn test_missing_default_langsys_names_script() {
        let err = LayoutError::MissingRequiredField { script: tag::LATN };
        assert_eq!(
            err.to_string(),
            "script 'latn' has no default language system"
        );
    }

    #[test]
    fn test_write_error_converts() {
        let err: LayoutError = WriteError::OffsetOverflow(String::from("GSUB")).into();
        assert_eq!(
            err.to_string(),
            "write error: table 'GSUB' is too big for 16-bit offsets"
        );
    }
}
