pub mod migrations;
pub mod queries;

use std::sync::{Arc, Mutex};

use anyhow::Context;
use rusqlite::Connection;

/// Opens the reservation book and brings its schema up to date.
pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open reservation database at {path}"))?;

    // Owner tools may read the file while calls are writing to it.
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

pub fn open_shared(path: &str) -> anyhow::Result<Arc<Mutex<Connection>>> {
    Ok(Arc::new(Mutex::new(init_db(path)?)))
}
