//! SHA-256 checksums of migration SQL

use sha2::{Digest, Sha256};

use crate::errors::{checksum_mismatch, Result};

pub fn compute_checksum(sql: &str) -> String {
    hex::encode(Sha256::digest(sql.as_bytes()))
}

/// Compare a recorded checksum against the embedded SQL
///
/// Rows written without a checksum are accepted.
pub fn verify_checksum(migration_id: &str, recorded: Option<&str>, sql: &str) -> Result<()> {
    let actual = compute_checksum(sql);
    match recorded {
        Some(expected) if expected != actual => {
            Err(checksum_mismatch(migration_id, expected, &actual))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_hex_sha256() {
        let checksum = compute_checksum("SELECT 1");
        assert_eq!(checksum.len(), 64);
        assert!(checksum.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_verify_detects_edit() {
        let recorded = compute_checksum("CREATE TABLE a (id INTEGER)");
        assert!(verify_checksum("001", Some(&recorded), "CREATE TABLE a (id INTEGER)").is_ok());
        assert!(verify_checksum("001", Some(&recorded), "CREATE TABLE b (id INTEGER)").is_err());
        assert!(verify_checksum("001", None, "anything").is_ok());
    }
}
