//! Connection bootstrap for the record store.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.

use std::path::Path;
use std::time::{Duration, Instant};

use log::{error, info};
use rusqlite::Connection;

use super::migrations::apply_migrations;
use crate::error::DmlResult;

pub(crate) enum OpenMode<'p> {
    File(&'p Path),
    Memory,
}

impl OpenMode<'_> {
    fn label(&self) -> &'static str {
        match self {
            OpenMode::File(_) => "file",
            OpenMode::Memory => "memory",
        }
    }
}

/// Opens a database and applies all pending migrations.
///
/// Emits `db_open` logging events with duration and status.
pub(crate) fn open_connection(
    mode: OpenMode<'_>,
    busy_timeout: Duration,
) -> DmlResult<Connection> {
    let started_at = Instant::now();
    let label = mode.label();
    info!("event=db_open module=store status=start mode={}", label);

    let opened = match mode {
        OpenMode::File(path) => Connection::open(path),
        OpenMode::Memory => Connection::open_in_memory(),
    };
    let mut conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=store status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                label,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, busy_timeout) {
        Ok(()) => {
            info!(
                "event=db_open module=store status=ok mode={} duration_ms={}",
                label,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=store status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                label,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(
    conn: &mut Connection,
    busy_timeout: Duration,
) -> DmlResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    apply_migrations(conn)?;
    Ok(())
}
