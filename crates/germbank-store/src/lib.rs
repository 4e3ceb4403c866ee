//! Germbank Store - relational persistence for template imports
//!
//! Provides:
//! - SQLite connection management and embedded migrations
//! - Connection and import settings
//! - Per-run natural-key caches and resolvers
//! - Batched fact-row writes
//! - Tracking and rollback of created rows

pub mod batch;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;
pub mod resolver;
pub mod rollback;
pub mod table;

// Re-export key types
pub use batch::{BatchRow, BatchWriter, WriteOutcome};
pub use cache::{KeyCache, KeyF64, NaturalKey};
pub use config::{ConnectionConfig, ImportConfig, Settings, UnresolvedPolicy};
pub use errors::Result;
pub use resolver::{Resolution, Resolver};
pub use rollback::{RollbackReport, RollbackTracker};
pub use table::Table;
