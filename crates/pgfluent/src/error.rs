//! Error types for pgfluent

use thiserror::Error;

/// Result type alias for pgfluent operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for query construction and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// A window, page or direction argument was out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No operator table entry matched the method name.
    #[error("Unrecognized method '{method}'")]
    UnrecognizedMethod { method: String },

    /// The operator needs a value and none was given.
    #[error("Missing argument for method '{method}'")]
    MissingArgument { method: String },

    /// The method names a field the entity does not declare.
    #[error("Unrecognized field '{field}' on entity '{entity}' (method '{method}')")]
    UnrecognizedField {
        entity: String,
        field: String,
        method: String,
    },

    /// More than one row came back where at most one was expected.
    #[error("Non-unique result: expected at most one row, got {0}")]
    NonUniqueResult(usize),

    /// No row came back where exactly one was expected.
    #[error("No result: expected exactly one row, got none")]
    NoResult,

    /// Entity metadata is missing or malformed.
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a metadata error
    pub fn metadata(message: impl Into<String>) -> Self {
        Self::Metadata(message.into())
    }

    pub fn unrecognized_method(method: impl Into<String>) -> Self {
        Self::UnrecognizedMethod {
            method: method.into(),
        }
    }

    pub fn missing_argument(method: impl Into<String>) -> Self {
        Self::MissingArgument {
            method: method.into(),
        }
    }

    pub fn unrecognized_field(
        entity: impl Into<String>,
        field: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self::UnrecognizedField {
            entity: entity.into(),
            field: field.into(),
            method: method.into(),
        }
    }

    /// Check if this is a "no result" error
    pub fn is_no_result(&self) -> bool {
        matches!(self, Self::NoResult)
    }

    /// Check if this is a "non-unique result" error
    pub fn is_non_unique(&self) -> bool {
        matches!(self, Self::NonUniqueResult(_))
    }

    /// Check if this error was raised while compiling a dynamic call
    pub fn is_dynamic_call_error(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedMethod { .. }
                | Self::MissingArgument { .. }
                | Self::UnrecognizedField { .. }
        )
    }
}
