//! Database connection management

#![allow(clippy::result_large_err)]

use crate::config::ConnectionConfig;
use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use rusqlite::Connection;
use std::path::Path;

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open(path).map_err(from_rusqlite)?;
    configure(&conn)?;
    Ok(conn)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().map_err(from_rusqlite)?;
    configure(&conn)?;
    Ok(conn)
}

/// Enforce foreign keys and switch file databases to WAL
pub fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON")
        .map_err(from_rusqlite)?;

    // In-memory databases answer "memory" and keep it
    let _mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .map_err(from_rusqlite)?;

    Ok(())
}

/// Open the database a connection config names and bring its schema up to date
///
/// Server, port and credentials are not used by the embedded backend.
pub fn connect(config: &ConnectionConfig) -> Result<Connection> {
    let mut conn = open(&config.database)?;
    apply_migrations(&mut conn)?;
    tracing::debug!(database = %config.database, "Opened import database");
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_in_memory().unwrap();
        let on: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |r| r.get(0))
            .unwrap();
        assert_eq!(on, 1);
    }

    #[test]
    fn test_connect_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConnectionConfig::for_database(dir.path().join("germbank.db"));
        let conn = connect(&config).unwrap();

        let countries: i64 = conn
            .query_row("SELECT COUNT(*) FROM countries", [], |r| r.get(0))
            .unwrap();
        assert!(countries > 0);
    }
}
