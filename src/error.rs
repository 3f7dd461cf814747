//! Error taxonomy of the calendrical engine.

use thiserror::Error;

use crate::fields::Field;

/// Errors reported by [`Calendar`](crate::Calendar) operations.
///
/// Range and combination problems surface when a representation is
/// completed (strict mode), not at `set` time, so that lenient
/// normalization remains possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CalendarError {
    /// A user-set field value lies outside its valid range for the
    /// calendar system (strict mode only).
    #[error("{field:?} = {value} outside valid range {min}..={max}")]
    FieldOutOfRange {
        field: Field,
        value: i32,
        min: i32,
        max: i32,
    },
    /// The combination of user-set fields names a date that does not
    /// exist in the calendar system (e.g. Adar I in a non-leap year).
    #[error("invalid field combination: {0}")]
    InvalidFieldCombination(&'static str),
    /// The field is not supported by the requested operation.
    #[error("{field:?} not supported by {operation}")]
    UnsupportedField {
        field: Field,
        operation: &'static str,
    },
    /// The resulting instant cannot be represented.
    #[error("date outside the supported range")]
    DateOutOfRange,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CalendarError>;
