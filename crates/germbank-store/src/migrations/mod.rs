//! Migration framework
//!
//! - Migration runner with checksums
//! - Idempotent application
//! - Embedded SQL migrations: schema plus country reference data

mod checksums;
mod embedded;
mod runner;

pub use embedded::migration_ids;
pub use runner::{apply_migrations, applied_migrations};
