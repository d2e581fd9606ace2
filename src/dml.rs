//! The DML surface every operation is written against

use chrono::NaiveDate;
use serde::Serialize;

use crate::binds::Binds;
use crate::error::DmlResult;
use crate::id::RecordId;
use crate::sobject::{Record, SObject};

/// Result of upserting one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub id: RecordId,
    pub created: bool,
}

/// Insert/update/upsert/delete and SOQL reads inside one unit of work.
///
/// Every write call is atomic over its batch: either all records are
/// written or none are, and ids are assigned to the caller's records only
/// after the whole batch succeeds.
pub trait Dml {
    /// Insert new records and assign their ids
    fn insert<T: SObject>(&mut self, records: &mut [T]) -> DmlResult<Vec<RecordId>>;

    /// Write the populated fields of existing records
    fn update<T: SObject>(&mut self, records: &[T]) -> DmlResult<()>;

    /// Update records that carry an id, insert the rest
    fn upsert<T: SObject>(&mut self, records: &mut [T]) -> DmlResult<Vec<UpsertOutcome>>;

    /// Match records on a natural-key field instead of the id
    fn upsert_by_key<T: SObject>(
        &mut self,
        key_field: &str,
        records: &mut [T],
    ) -> DmlResult<Vec<UpsertOutcome>>;

    fn delete<T: SObject>(&mut self, records: &[T]) -> DmlResult<()>;

    fn delete_ids<T: SObject>(&mut self, ids: &[RecordId]) -> DmlResult<()>;

    /// Typed SOQL read; the FROM object must be `T`
    fn query<T: SObject>(&self, soql: &str, binds: &Binds) -> DmlResult<Vec<T>>;

    /// SOQL read into untyped rows keyed by field path
    fn query_records(&self, soql: &str, binds: &Binds) -> DmlResult<Vec<Record>>;

    /// Run a `SELECT COUNT() ...` query
    fn count(&self, soql: &str, binds: &Binds) -> DmlResult<i64>;

    /// The date this unit of work treats as today
    fn today(&self) -> NaiveDate;
}
