//! Correlation identifiers for import runs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one pipeline invocation.
///
/// Every importer stage started by the same pipeline shares the run id, so
/// a failed compound-data import can be traced back through its metadata
/// and compound stages in the logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Generate a new time-ordered RunId (UUIDv7)
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an existing id, e.g. one supplied by a calling tool
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
