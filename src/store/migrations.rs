//! Schema migrations, tracked through `PRAGMA user_version`
//!
//! Applied migrations never change. A change to the object schema ships as
//! a new migration appended to [`MIGRATIONS`].

use rusqlite::Connection;

use crate::error::{DmlError, DmlResult};

const INIT_SQL: &str = include_str!("migrations/0001_init.sql");

/// Table holding the last id sequence value per key prefix
pub(crate) const ID_SEQUENCE_TABLE: &str = "_id_sequence";

#[derive(Clone, Copy)]
struct Migration {
    version: u32,
    apply: fn(&Connection) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        apply: create_object_tables,
    },
    Migration {
        version: 2,
        apply: create_id_sequence,
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations in one transaction.
pub fn apply_migrations(conn: &mut Connection) -> DmlResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DmlError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        (migration.apply)(&tx)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    Ok(())
}

pub(crate) fn current_user_version(conn: &Connection) -> DmlResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn create_object_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(INIT_SQL)
}

fn create_id_sequence(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            key_prefix TEXT PRIMARY KEY,
            last_value INTEGER NOT NULL
        );",
        ID_SEQUENCE_TABLE
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::create_crm_schema;

    fn columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info(\"{}\")", table))
            .unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_migrated_tables_cover_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();

        for object in create_crm_schema().objects() {
            let present = columns(&conn, &object.table_name);
            for field in object.fields() {
                assert!(
                    present.contains(&field.column_name),
                    "{}.{} has no column; add a migration",
                    object.name,
                    field.name
                );
            }
        }
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        apply_migrations(&mut conn).unwrap();
        assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    }
}
