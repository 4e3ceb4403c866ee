//! Core types shared across the germbank crates
//!
//! - **Correlation**: `RunId` ties every log line and summary of one
//!   pipeline invocation together
//! - **Sensitive data**: `Sensitive<T>` keeps database credentials out of
//!   logs and debug output
//! - **Schema constants**: canonical logging field keys and event names

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::RunId;
pub use sensitive::Sensitive;
