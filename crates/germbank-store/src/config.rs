//! Connection and import settings
//!
//! Both halves can come from one TOML file:
//!
//! ```toml
//! [connection]
//! database = "germbank.db"
//! username = "importer"
//!
//! [import]
//! batch_size = 5000
//! on_unresolved = "skip"
//! ```
//!
//! The CLI layers its flags and environment on top of whatever the file
//! provides.

#![allow(clippy::result_large_err)]

use std::path::{Path, PathBuf};

use germbank_core_types::Sensitive;
use serde::Deserialize;

use crate::errors::{config_error, io_error, Result};

/// Default number of fact rows buffered before a flush
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

fn default_database() -> String {
    "germbank.db".to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_true() -> bool {
    true
}

/// Where the import store lives
///
/// The embedded backend only reads `database`, as a file path. The other
/// fields name a networked server and are kept so one config file serves
/// every deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Sensitive<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server: None,
            database: default_database(),
            username: None,
            password: Sensitive::default(),
            port: None,
        }
    }
}

impl ConnectionConfig {
    pub fn for_database(path: impl AsRef<Path>) -> Self {
        Self {
            database: path.as_ref().to_string_lossy().into_owned(),
            ..Self::default()
        }
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.database)
    }
}

/// What happens to a record whose subject entity is not in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    /// Fail the run with `ERR_UNRESOLVED_REFERENCE`
    #[default]
    Abort,
    /// Drop the record and list it in the run summary
    Skip,
}

impl std::str::FromStr for UnresolvedPolicy {
    type Err = germbank_core::ExError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(UnresolvedPolicy::Abort),
            "skip" => Ok(UnresolvedPolicy::Skip),
            other => Err(config_error(format!(
                "Unknown unresolved-reference policy '{}' (expected abort or skip)",
                other
            ))),
        }
    }
}

/// Per-run import behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub on_unresolved: UnresolvedPolicy,
    /// Undo a failed run before returning; when off, every row the run
    /// committed is kept, prerequisite stages included
    #[serde(default = "default_true")]
    pub rollback_on_failure: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            on_unresolved: UnresolvedPolicy::Abort,
            rollback_on_failure: true,
        }
    }
}

impl ImportConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_unresolved(mut self, policy: UnresolvedPolicy) -> Self {
        self.on_unresolved = policy;
        self
    }

    /// Reject settings no run can honour
    ///
    /// # Errors
    ///
    /// `ERR_CONFIG` when the batch size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(config_error("batch_size must be at least 1"));
        }
        Ok(())
    }
}

/// Contents of a settings file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

impl Settings {
    /// Parse settings from TOML text
    ///
    /// # Errors
    ///
    /// `ERR_CONFIG` on malformed TOML or an invalid import section.
    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(text).map_err(|e| config_error(format!("Invalid settings: {}", e)))?;
        settings.import.validate()?;
        Ok(settings)
    }

    /// Read and parse a settings file
    ///
    /// # Errors
    ///
    /// `ERR_IO` when the file cannot be read, otherwise as [`Settings::from_toml`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| io_error("load_config", e))?;
        Self::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use germbank_core::ExErrorKind;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.connection.database, "germbank.db");
        assert_eq!(settings.import.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(settings.import.on_unresolved, UnresolvedPolicy::Abort);
        assert!(settings.import.rollback_on_failure);
    }

    #[test]
    fn test_full_file() {
        let settings = Settings::from_toml(
            r#"
            [connection]
            server = "db.example.org"
            database = "/data/germinate.db"
            username = "importer"
            password = "s3cret"
            port = 3306

            [import]
            batch_size = 250
            on_unresolved = "skip"
            rollback_on_failure = false
            "#,
        )
        .unwrap();

        assert_eq!(settings.connection.port, Some(3306));
        assert_eq!(settings.connection.password.expose(), "s3cret");
        assert!(!format!("{:?}", settings.connection).contains("s3cret"));
        assert_eq!(settings.import.batch_size, 250);
        assert_eq!(settings.import.on_unresolved, UnresolvedPolicy::Skip);
        assert!(!settings.import.rollback_on_failure);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = Settings::from_toml("[import]\nbatch_size = 0\n").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Config);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = Settings::from_toml("[import\n").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Config);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Skip".parse::<UnresolvedPolicy>().unwrap(), UnresolvedPolicy::Skip);
        assert!("ignore".parse::<UnresolvedPolicy>().is_err());
    }
}
