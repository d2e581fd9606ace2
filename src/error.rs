//! Error type for DML operations and the store

use thiserror::Error;

use crate::id::{InvalidRecordId, RecordId};
use crate::parser::ParseError;
use crate::sql::ConversionError;

/// Errors raised by DML calls, queries and the reconciler.
///
/// Any error returned inside a unit of work leaves it uncommitted; the
/// caller drops it (or `Store::transaction` does) and every write rolls back.
#[derive(Error, Debug)]
pub enum DmlError {
    #[error("SOQL parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("SOQL conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    InvalidId(#[from] InvalidRecordId),

    #[error("Required fields are missing on {object}: [{fields}]")]
    RequiredFieldMissing { object: String, fields: String },

    #[error("{object} record has no Id; {operation} needs one")]
    MissingId {
        object: &'static str,
        operation: &'static str,
    },

    #[error("cannot specify Id in an insert call: {0}")]
    IdAlreadySet(RecordId),

    #[error("entity is deleted or does not exist: {0}")]
    NotFound(RecordId),

    #[error("invalid id {id} for {object}")]
    InvalidIdForObject { object: &'static str, id: RecordId },

    #[error("duplicate name in desired set: {0}")]
    DuplicateName(String),

    #[error("{count} {object} records match {field} = '{value}'")]
    DuplicateKey {
        object: &'static str,
        field: String,
        value: String,
        count: usize,
    },

    #[error("query is against {actual}, expected {expected}")]
    ObjectMismatch {
        expected: &'static str,
        actual: String,
    },

    #[error("invalid persisted data: {0}")]
    InvalidData(String),

    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

/// Result type for DML operations
pub type DmlResult<T> = Result<T, DmlError>;
