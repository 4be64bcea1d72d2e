//! Store errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A filter carried an operator the store cannot evaluate.
    #[error("unknown operator '{operator}' on field '{field}'")]
    UnknownOperator { field: String, operator: String },

    #[error("no document found with id '{id}'")]
    NotFound { id: String },

    /// A unique field already holds this value.
    #[error("duplicate {field}: {value}")]
    Duplicate { field: String, value: String },

    #[error("invalid document: {0}")]
    InvalidDocument(String),
}
