//! Error handling for germbank-store
//!
//! Wraps the core `ExError` with store-specific constructors

use germbank_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// An applied migration no longer matches its embedded SQL
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// A referenced subject entity is not in the store
pub fn unresolved(table: &str, key: impl Into<String>) -> ExError {
    let key = key.into();
    ExError::new(ExErrorKind::UnresolvedReference)
        .with_op("resolve")
        .with_table(table)
        .with_message(format!(
            "Referenced {} entry not found: {}. Make sure it is imported first.",
            table, key
        ))
        .with_natural_key(key)
}

/// A required field of a record is empty or invalid
pub fn invalid_input(op: &str, message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op(op)
        .with_message(message)
}

/// A delete issued during rollback failed
pub fn rollback_error(table: &str, err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Rollback)
        .with_op("delete_created")
        .with_table(table)
        .with_message(err.to_string())
}

/// Create a configuration error
pub fn config_error(message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Config)
        .with_op("load_config")
        .with_message(message)
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// A broken assumption about the store's contents
pub fn internal_error(op: &str, message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op(op)
        .with_message(message)
}
