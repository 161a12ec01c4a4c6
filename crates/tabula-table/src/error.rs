use crate::value::Value;

pub type TableResult<T> = Result<T, TableError>;

/// Coarse classification of a [`TableError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Declared/inferred field set does not match the row data.
    Schema,
    /// A field name that does not exist.
    ColumnNotFound,
    /// A column, mask or rename list of the wrong length.
    LengthMismatch,
    /// Positional access beyond bounds.
    IndexOutOfRange,
    /// Invalid call shape.
    Argument,
    /// Values that cannot be compared or combined.
    Type,
    /// Arithmetic failure inside an aggregation.
    Arithmetic,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("row {row}: expected {expected}, got {actual}")]
    RowShape {
        row: usize,
        expected: String,
        actual: String,
    },

    #[error("cannot infer field names from positional rows; pass explicit field names")]
    MissingFieldNames,

    #[error("cannot append a positional row to a table without fields")]
    NoSchema,

    #[error("invalid field name {field:?}: field names must be non-empty")]
    InvalidFieldName { field: String },

    #[error("duplicate field name: {field}")]
    DuplicateField { field: String },

    #[error("requested field {field} is not present in the source rows")]
    UnknownField { field: String },

    #[error("{operation}: field sets differ (expected {expected:?}, got {actual:?})")]
    FieldSetMismatch {
        operation: &'static str,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("column not found: {field}")]
    ColumnNotFound { field: String },

    #[error("{what} length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{what} index {index} out of range for length {len}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("cannot compare {left:?} with {right:?}")]
    Incomparable { left: Value, right: Value },

    #[error("{operation} does not accept {value:?}")]
    InvalidOperand {
        operation: &'static str,
        value: Value,
    },

    #[error("{operation}: division by zero")]
    DivisionByZero { operation: &'static str },
}

impl TableError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TableError::RowShape { .. }
            | TableError::MissingFieldNames
            | TableError::NoSchema
            | TableError::InvalidFieldName { .. }
            | TableError::DuplicateField { .. }
            | TableError::UnknownField { .. }
            | TableError::FieldSetMismatch { .. } => ErrorKind::Schema,
            TableError::ColumnNotFound { .. } => ErrorKind::ColumnNotFound,
            TableError::LengthMismatch { .. } => ErrorKind::LengthMismatch,
            TableError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            TableError::Argument(_) => ErrorKind::Argument,
            TableError::Incomparable { .. } | TableError::InvalidOperand { .. } => ErrorKind::Type,
            TableError::DivisionByZero { .. } => ErrorKind::Arithmetic,
        }
    }

    pub(crate) fn column_not_found(field: &str) -> Self {
        TableError::ColumnNotFound {
            field: field.to_owned(),
        }
    }
}
