//! Error types for SOQL to SQL conversion

use thiserror::Error;

/// Errors that can occur during SOQL to SQL conversion
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Unknown SObject: {0}")]
    UnknownObject(String),

    #[error("Unknown field '{field}' on object '{object}'")]
    UnknownField { object: String, field: String },

    #[error("Field '{0}' is not a relationship field")]
    NotARelationship(String),

    #[error("Relationship depth exceeded (max: {max}, actual: {actual})")]
    RelationshipDepthExceeded { max: u8, actual: u8 },

    #[error("Variable does not exist: {0}")]
    UnboundVariable(String),

    #[error("Bind variable '{0}' holds a list; use it with IN")]
    ListBindOutsideIn(String),

    #[error("Invalid SOQL expression: {0}")]
    InvalidExpression(String),
}

/// Result type for conversion operations
pub type ConversionResult<T> = Result<T, ConversionError>;
