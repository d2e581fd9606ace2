//! Explicit unit of work over a SQLite transaction

use std::time::Instant;

use chrono::NaiveDate;
use log::{debug, info};
use rusqlite::{params, params_from_iter, OptionalExtension, Transaction};

use super::migrations::ID_SEQUENCE_TABLE;
use crate::binds::Binds;
use crate::dml::{Dml, UpsertOutcome};
use crate::error::{DmlError, DmlResult};
use crate::id::RecordId;
use crate::sobject::{FieldValue, Record, SObject};
use crate::sql::{
    ConversionConfig, ConversionError, SObjectDescribe, SalesforceSchema, SoqlToSqlConverter,
    SqlConversion, SqliteDialect,
};

const SAVEPOINT: &str = "dml_batch";

/// A transaction against the store.
///
/// Dropping it without [`UnitOfWork::commit`] rolls back every write.
pub struct UnitOfWork<'s> {
    tx: Transaction<'s>,
    schema: &'s SalesforceSchema,
    dialect: SqliteDialect,
    today: NaiveDate,
    max_relationship_depth: u8,
}

impl<'s> UnitOfWork<'s> {
    pub(crate) fn new(
        tx: Transaction<'s>,
        schema: &'s SalesforceSchema,
        today: NaiveDate,
        max_relationship_depth: u8,
    ) -> Self {
        Self {
            tx,
            schema,
            dialect: SqliteDialect,
            today,
            max_relationship_depth,
        }
    }

    pub fn commit(self) -> DmlResult<()> {
        self.tx.commit()?;
        info!("event=uow_commit module=store status=ok");
        Ok(())
    }

    pub fn rollback(self) -> DmlResult<()> {
        self.tx.rollback()?;
        info!("event=uow_rollback module=store status=ok");
        Ok(())
    }

    pub fn schema(&self) -> &SalesforceSchema {
        self.schema
    }

    fn describe<T: SObject>(&self) -> DmlResult<&'s SObjectDescribe> {
        let schema = self.schema;
        schema
            .get_object(T::API_NAME)
            .ok_or_else(|| ConversionError::UnknownObject(T::API_NAME.to_string()).into())
    }

    /// Run `f` so that its writes land together or not at all
    fn in_savepoint<R>(&self, f: impl FnOnce(&Self) -> DmlResult<R>) -> DmlResult<R> {
        self.tx.execute_batch(&format!("SAVEPOINT {};", SAVEPOINT))?;
        match f(self) {
            Ok(value) => {
                self.tx.execute_batch(&format!("RELEASE {};", SAVEPOINT))?;
                Ok(value)
            }
            Err(err) => {
                self.tx.execute_batch(&format!(
                    "ROLLBACK TO {sp}; RELEASE {sp};",
                    sp = SAVEPOINT
                ))?;
                Err(err)
            }
        }
    }

    fn next_id(&self, describe: &SObjectDescribe) -> DmlResult<RecordId> {
        let sequence: i64 = self.tx.query_row(
            &format!(
                "INSERT INTO {table} (key_prefix, last_value) VALUES (?1, 1)
                 ON CONFLICT(key_prefix) DO UPDATE SET last_value = {table}.last_value + 1
                 RETURNING last_value",
                table = ID_SEQUENCE_TABLE
            ),
            params![describe.key_prefix],
            |row| row.get(0),
        )?;
        let sequence = u64::try_from(sequence)
            .map_err(|_| DmlError::InvalidData(format!("negative id sequence {}", sequence)))?;
        Ok(RecordId::from_sequence(&describe.key_prefix, sequence))
    }

    /// Fields to write, as (column, value), rejecting names the schema lacks
    fn columns<T: SObject>(
        &self,
        describe: &SObjectDescribe,
        record: &T,
    ) -> DmlResult<Vec<(String, FieldValue)>> {
        record
            .field_values()
            .into_iter()
            .map(|(name, value)| {
                let field = describe
                    .get_field(name)
                    .ok_or_else(|| ConversionError::UnknownField {
                        object: describe.name.clone(),
                        field: name.to_string(),
                    })?;
                Ok((field.column_name.clone(), value))
            })
            .collect()
    }

    fn validate_required<T: SObject>(&self, describe: &SObjectDescribe, record: &T) -> DmlResult<()> {
        let values = record.field_values();
        let missing: Vec<&str> = describe
            .required_fields()
            .filter(|field| {
                !values
                    .iter()
                    .any(|(name, value)| field.name.eq_ignore_ascii_case(name) && !value.is_null())
            })
            .map(|field| field.name.as_str())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DmlError::RequiredFieldMissing {
                object: describe.name.clone(),
                fields: missing.join(", "),
            })
        }
    }

    fn check_id<T: SObject>(&self, describe: &SObjectDescribe, id: &RecordId) -> DmlResult<()> {
        if id.key_prefix() == describe.key_prefix {
            Ok(())
        } else {
            Err(DmlError::InvalidIdForObject {
                object: T::API_NAME,
                id: id.clone(),
            })
        }
    }

    fn insert_one<T: SObject>(&self, describe: &SObjectDescribe, record: &T) -> DmlResult<RecordId> {
        let id = self.next_id(describe)?;
        let columns = self.columns(describe, record)?;

        let mut names = vec![self.dialect.quote_identifier("id")];
        names.extend(columns.iter().map(|(c, _)| self.dialect.quote_identifier(c)));
        let placeholders: Vec<String> = (1..=names.len())
            .map(|i| self.dialect.parameter_placeholder(i))
            .collect();

        let mut values = vec![FieldValue::from(&id)];
        values.extend(columns.into_iter().map(|(_, v)| v));

        self.tx.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.dialect.quote_identifier(&describe.table_name),
                names.join(", "),
                placeholders.join(", ")
            ),
            params_from_iter(values.iter()),
        )?;
        Ok(id)
    }

    fn update_one<T: SObject>(
        &self,
        describe: &SObjectDescribe,
        id: &RecordId,
        record: &T,
    ) -> DmlResult<()> {
        self.check_id::<T>(describe, id)?;
        let columns = self.columns(describe, record)?;
        let table = self.dialect.quote_identifier(&describe.table_name);

        let changed = if columns.is_empty() {
            // Nothing to write; the record still has to exist
            self.tx
                .query_row(
                    &format!("SELECT 1 FROM {} WHERE \"id\" = ?1", table),
                    params![id],
                    |_| Ok(()),
                )
                .optional()?
                .map_or(0, |_| 1)
        } else {
            let assignments: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(i, (c, _))| {
                    format!(
                        "{} = {}",
                        self.dialect.quote_identifier(c),
                        self.dialect.parameter_placeholder(i + 1)
                    )
                })
                .collect();
            let mut values: Vec<FieldValue> = columns.into_iter().map(|(_, v)| v).collect();
            values.push(FieldValue::from(id));

            self.tx.execute(
                &format!(
                    "UPDATE {} SET {} WHERE \"id\" = {}",
                    table,
                    assignments.join(", "),
                    self.dialect.parameter_placeholder(values.len())
                ),
                params_from_iter(values.iter()),
            )?
        };

        if changed == 0 {
            return Err(DmlError::NotFound(id.clone()));
        }
        Ok(())
    }

    fn delete_one<T: SObject>(&self, describe: &SObjectDescribe, id: &RecordId) -> DmlResult<()> {
        self.check_id::<T>(describe, id)?;
        let changed = self.tx.execute(
            &format!(
                "DELETE FROM {} WHERE \"id\" = ?1",
                self.dialect.quote_identifier(&describe.table_name)
            ),
            params![id],
        )?;
        if changed == 0 {
            return Err(DmlError::NotFound(id.clone()));
        }
        Ok(())
    }

    /// Ids of rows whose `key_field` equals `value`
    fn ids_by_key(
        &self,
        describe: &SObjectDescribe,
        column: &str,
        value: &FieldValue,
    ) -> DmlResult<Vec<RecordId>> {
        let mut stmt = self.tx.prepare(&format!(
            "SELECT \"id\" FROM {} WHERE {} = ?1",
            self.dialect.quote_identifier(&describe.table_name),
            self.dialect.quote_identifier(column)
        ))?;
        let ids = stmt
            .query_map(params![value], |row| row.get::<_, RecordId>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn convert(&self, soql: &str, binds: &Binds) -> DmlResult<SqlConversion> {
        let query = crate::parser::parse(soql)?;
        let config = ConversionConfig::new(self.today)
            .with_max_relationship_depth(self.max_relationship_depth);
        let conversion = SoqlToSqlConverter::new(self.schema, config).convert(&query, binds)?;
        debug!(
            "event=soql_convert module=store object={} params={} sql={:?}",
            conversion.object,
            conversion.parameters.len(),
            conversion.sql
        );
        Ok(conversion)
    }

    fn log_batch(&self, operation: &str, object: &str, count: usize, started_at: Instant) {
        info!(
            "event=dml_{} module=store status=ok object={} count={} duration_ms={}",
            operation,
            object,
            count,
            started_at.elapsed().as_millis()
        );
    }
}

impl Dml for UnitOfWork<'_> {
    fn insert<T: SObject>(&mut self, records: &mut [T]) -> DmlResult<Vec<RecordId>> {
        let started_at = Instant::now();
        let describe = self.describe::<T>()?;

        for record in records.iter() {
            if let Some(id) = record.id() {
                return Err(DmlError::IdAlreadySet(id.clone()));
            }
            self.validate_required(describe, record)?;
        }

        let ids = self.in_savepoint(|uow| {
            records
                .iter()
                .map(|record| uow.insert_one(describe, record))
                .collect::<DmlResult<Vec<_>>>()
        })?;

        for (record, id) in records.iter_mut().zip(&ids) {
            record.set_id(id.clone());
        }
        self.log_batch("insert", T::API_NAME, ids.len(), started_at);
        Ok(ids)
    }

    fn update<T: SObject>(&mut self, records: &[T]) -> DmlResult<()> {
        let started_at = Instant::now();
        let describe = self.describe::<T>()?;

        let ids = records
            .iter()
            .map(|record| {
                record.id().cloned().ok_or(DmlError::MissingId {
                    object: T::API_NAME,
                    operation: "update",
                })
            })
            .collect::<DmlResult<Vec<_>>>()?;

        self.in_savepoint(|uow| {
            records
                .iter()
                .zip(&ids)
                .try_for_each(|(record, id)| uow.update_one(describe, id, record))
        })?;

        self.log_batch("update", T::API_NAME, records.len(), started_at);
        Ok(())
    }

    fn upsert<T: SObject>(&mut self, records: &mut [T]) -> DmlResult<Vec<UpsertOutcome>> {
        let started_at = Instant::now();
        let describe = self.describe::<T>()?;

        for record in records.iter().filter(|r| r.id().is_none()) {
            self.validate_required(describe, record)?;
        }

        let outcomes = self.in_savepoint(|uow| {
            records
                .iter()
                .map(|record| match record.id() {
                    Some(id) => {
                        uow.update_one(describe, id, record)?;
                        Ok(UpsertOutcome {
                            id: id.clone(),
                            created: false,
                        })
                    }
                    None => Ok(UpsertOutcome {
                        id: uow.insert_one(describe, record)?,
                        created: true,
                    }),
                })
                .collect::<DmlResult<Vec<_>>>()
        })?;

        for (record, outcome) in records.iter_mut().zip(&outcomes) {
            if outcome.created {
                record.set_id(outcome.id.clone());
            }
        }
        self.log_batch("upsert", T::API_NAME, outcomes.len(), started_at);
        Ok(outcomes)
    }

    fn upsert_by_key<T: SObject>(
        &mut self,
        key_field: &str,
        records: &mut [T],
    ) -> DmlResult<Vec<UpsertOutcome>> {
        let started_at = Instant::now();
        let describe = self.describe::<T>()?;
        let field = describe
            .get_field(key_field)
            .ok_or_else(|| ConversionError::UnknownField {
                object: describe.name.clone(),
                field: key_field.to_string(),
            })?;

        let keys = records
            .iter()
            .map(|record| {
                record
                    .field_values()
                    .into_iter()
                    .find(|(name, value)| field.name.eq_ignore_ascii_case(name) && !value.is_null())
                    .map(|(_, value)| value)
                    .ok_or_else(|| DmlError::RequiredFieldMissing {
                        object: describe.name.clone(),
                        fields: field.name.clone(),
                    })
            })
            .collect::<DmlResult<Vec<_>>>()?;

        // Records are matched one at a time, so a key repeated in the batch
        // inserts once and then updates that row.
        let outcomes = self.in_savepoint(|uow| {
            records
                .iter()
                .zip(&keys)
                .map(|(record, key)| {
                    let matches = uow.ids_by_key(describe, &field.column_name, key)?;
                    match matches.as_slice() {
                        [] => {
                            uow.validate_required(describe, record)?;
                            Ok(UpsertOutcome {
                                id: uow.insert_one(describe, record)?,
                                created: true,
                            })
                        }
                        [id] => {
                            uow.update_one(describe, id, record)?;
                            Ok(UpsertOutcome {
                                id: id.clone(),
                                created: false,
                            })
                        }
                        many => Err(DmlError::DuplicateKey {
                            object: T::API_NAME,
                            field: field.name.clone(),
                            value: format!("{:?}", key),
                            count: many.len(),
                        }),
                    }
                })
                .collect::<DmlResult<Vec<_>>>()
        })?;

        for (record, outcome) in records.iter_mut().zip(&outcomes) {
            record.set_id(outcome.id.clone());
        }
        self.log_batch("upsert_by_key", T::API_NAME, outcomes.len(), started_at);
        Ok(outcomes)
    }

    fn delete<T: SObject>(&mut self, records: &[T]) -> DmlResult<()> {
        let ids = records
            .iter()
            .map(|record| {
                record.id().cloned().ok_or(DmlError::MissingId {
                    object: T::API_NAME,
                    operation: "delete",
                })
            })
            .collect::<DmlResult<Vec<_>>>()?;
        self.delete_ids::<T>(&ids)
    }

    fn delete_ids<T: SObject>(&mut self, ids: &[RecordId]) -> DmlResult<()> {
        let started_at = Instant::now();
        let describe = self.describe::<T>()?;

        self.in_savepoint(|uow| {
            ids.iter()
                .try_for_each(|id| uow.delete_one::<T>(describe, id))
        })?;

        self.log_batch("delete", T::API_NAME, ids.len(), started_at);
        Ok(())
    }

    fn query<T: SObject>(&self, soql: &str, binds: &Binds) -> DmlResult<Vec<T>> {
        let conversion = self.convert(soql, binds)?;
        if conversion.aggregate || conversion.object != T::API_NAME {
            return Err(DmlError::ObjectMismatch {
                expected: T::API_NAME,
                actual: if conversion.aggregate {
                    format!("aggregate over {}", conversion.object)
                } else {
                    conversion.object
                },
            });
        }

        let mut stmt = self.tx.prepare(&conversion.sql)?;
        let rows = stmt
            .query_map(params_from_iter(conversion.parameters.iter()), |row| {
                T::from_row(row)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn query_records(&self, soql: &str, binds: &Binds) -> DmlResult<Vec<Record>> {
        let conversion = self.convert(soql, binds)?;
        let mut stmt = self.tx.prepare(&conversion.sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let rows = stmt
            .query_map(params_from_iter(conversion.parameters.iter()), |row| {
                names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| Ok((name.clone(), FieldValue::from(row.get_ref(i)?))))
                    .collect::<rusqlite::Result<Record>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn count(&self, soql: &str, binds: &Binds) -> DmlResult<i64> {
        let conversion = self.convert(soql, binds)?;
        if !conversion.aggregate {
            return Err(ConversionError::InvalidExpression(
                "count() needs a SELECT COUNT() query".to_string(),
            )
            .into());
        }
        let count = self.tx.query_row(
            &conversion.sql,
            params_from_iter(conversion.parameters.iter()),
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Account, Contact, Lead};
    use crate::store::Store;

    fn store() -> Store {
        Store::open_in_memory()
            .unwrap()
            .with_today(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap())
    }

    #[test]
    fn test_sequential_ids_per_object() {
        let mut store = store();
        let mut uow = store.begin().unwrap();

        let mut accounts = vec![Account::new("A"), Account::new("B")];
        let ids = uow.insert(&mut accounts).unwrap();
        let mut leads = vec![Lead::new("L", "Co")];
        let lead_ids = uow.insert(&mut leads).unwrap();

        assert_eq!(ids[0], RecordId::from_sequence("001", 1));
        assert_eq!(ids[1], RecordId::from_sequence("001", 2));
        assert_eq!(lead_ids[0], RecordId::from_sequence("00Q", 1));
        assert_eq!(accounts[1].id.as_ref(), Some(&ids[1]));
    }

    #[test]
    fn test_failed_batch_rolls_back_sequence() {
        let mut store = store();
        let mut uow = store.begin().unwrap();

        let missing_parent = RecordId::from_sequence("001", 40);
        let mut contacts = vec![
            Contact::with_last_name("Ok"),
            Contact::with_last_name("Orphan").with_account(missing_parent),
        ];
        assert!(uow.insert(&mut contacts).is_err());
        assert!(contacts.iter().all(|c| c.id.is_none()));

        let mut retry = vec![Contact::with_last_name("Ok")];
        let ids = uow.insert(&mut retry).unwrap();
        assert_eq!(ids[0], RecordId::from_sequence("003", 1));
    }

    #[test]
    fn test_update_writes_only_set_fields() {
        let mut store = store();
        let mut uow = store.begin().unwrap();

        let mut accounts = vec![Account::new("Acme").with_industry("Energy")];
        let ids = uow.insert(&mut accounts).unwrap();

        let patch = Account {
            id: Some(ids[0].clone()),
            description: Some("Patched".into()),
            ..Default::default()
        };
        uow.update(&[patch]).unwrap();

        let rows: Vec<Account> = uow
            .query(
                "SELECT Name, Industry, Description FROM Account",
                &Binds::new(),
            )
            .unwrap();
        assert_eq!(rows[0].industry.as_deref(), Some("Energy"));
        assert_eq!(rows[0].description.as_deref(), Some("Patched"));
    }

    #[test]
    fn test_update_rejects_foreign_id() {
        let mut store = store();
        let mut uow = store.begin().unwrap();

        let contact = Contact {
            id: Some(RecordId::from_sequence("001", 1)),
            last_name: Some("X".into()),
            ..Default::default()
        };
        assert!(matches!(
            uow.update(&[contact]),
            Err(DmlError::InvalidIdForObject { object: "Contact", .. })
        ));
    }

    #[test]
    fn test_query_object_must_match() {
        let mut store = store();
        let uow = store.begin().unwrap();
        let result: DmlResult<Vec<Account>> = uow.query("SELECT Id FROM Lead", &Binds::new());
        assert!(matches!(result, Err(DmlError::ObjectMismatch { expected: "Account", .. })));
    }

    #[test]
    fn test_query_records_keys() {
        let mut store = store();
        let mut uow = store.begin().unwrap();
        let ids = uow.insert(&mut [Account::new("Acme")]).unwrap();
        uow.insert(&mut [Contact::with_last_name("Doe").with_account(ids[0].clone())])
            .unwrap();

        let rows = uow
            .query_records("SELECT LastName, Account.Name FROM Contact", &Binds::new())
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["LastName"], FieldValue::Text("Doe".into()));
        assert_eq!(rows[0]["Account.Name"], FieldValue::Text("Acme".into()));
        assert!(rows[0].contains_key("Id"));
    }
}
