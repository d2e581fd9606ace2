//! SQLite-backed record store.
//!
//! A [`Store`] owns the connection and the object schema. All reads and
//! writes go through a [`UnitOfWork`], which is an explicit transaction:
//! commit it to keep the writes, drop it (or return an error from
//! [`Store::transaction`]) to roll them back.

mod migrations;
mod open;
mod unit_of_work;

use std::path::Path;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use log::warn;
use rusqlite::Connection;

use crate::config::StoreConfig;
use crate::error::DmlResult;
use crate::sql::{create_crm_schema, SalesforceSchema};

pub use migrations::latest_version;
pub use unit_of_work::UnitOfWork;

use open::{open_connection, OpenMode};

pub struct Store {
    conn: Connection,
    schema: SalesforceSchema,
    config: StoreConfig,
    /// Fixed date for every unit of work; the UTC clock when unset
    today: Option<NaiveDate>,
}

impl Store {
    /// Open (or create) a database file with default settings
    pub fn open(path: impl AsRef<Path>) -> DmlResult<Self> {
        Self::open_with(Some(path.as_ref()), StoreConfig::default())
    }

    pub fn open_in_memory() -> DmlResult<Self> {
        Self::open_with(None, StoreConfig::default())
    }

    /// Open the database named by `config.path`, in memory when unset
    pub fn from_config(config: &StoreConfig) -> DmlResult<Self> {
        Self::open_with(config.path.as_deref(), config.clone())
    }

    fn open_with(path: Option<&Path>, config: StoreConfig) -> DmlResult<Self> {
        let schema = create_crm_schema();
        let mode = match path {
            Some(path) => OpenMode::File(path),
            None => OpenMode::Memory,
        };
        let conn = open_connection(mode, Duration::from_millis(config.busy_timeout_ms))?;
        Ok(Self {
            conn,
            schema,
            config,
            today: None,
        })
    }

    /// Pin the date units of work resolve date literals and defaults against
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn schema(&self) -> &SalesforceSchema {
        &self.schema
    }

    /// Schema version recorded in the database
    pub fn schema_version(&self) -> DmlResult<u32> {
        migrations::current_user_version(&self.conn)
    }

    /// Start a unit of work
    pub fn begin(&mut self) -> DmlResult<UnitOfWork<'_>> {
        let today = self.today.unwrap_or_else(|| Utc::now().date_naive());
        let tx = self
            .conn
            .transaction_with_behavior(self.config.locking.into())?;
        Ok(UnitOfWork::new(
            tx,
            &self.schema,
            today,
            self.config.max_relationship_depth,
        ))
    }

    /// Run `f` in a unit of work: commit on `Ok`, roll back on `Err`
    pub fn transaction<T, F>(&mut self, f: F) -> DmlResult<T>
    where
        F: FnOnce(&mut UnitOfWork<'_>) -> DmlResult<T>,
    {
        let mut uow = self.begin()?;
        match f(&mut uow) {
            Ok(value) => {
                uow.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback() {
                    warn!(
                        "event=uow_rollback module=store status=error error={}",
                        rollback_err
                    );
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_applies_migrations() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.schema_version().unwrap(), latest_version());
    }

    #[test]
    fn test_reopen_file_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crm.db");

        drop(Store::open(&path).unwrap());
        let store = Store::open(&path).unwrap();
        assert_eq!(store.schema_version().unwrap(), latest_version());
    }

    #[test]
    fn test_newer_schema_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crm.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("PRAGMA user_version = 99;").unwrap();
        }

        match Store::open(&path) {
            Err(crate::DmlError::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            }) => {
                assert_eq!(db_version, 99);
                assert_eq!(latest_supported, latest_version());
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected version error"),
        }
    }
}
