//! Germbank core: the pieces of the template import engine that do not
//! touch the store
//!
//! - Error facility (`ExError`, `ExErrorKind`, `TemplateError`)
//! - Structured logging facility
//! - Typed records for accessions, datasets, compounds, phenotypes and
//!   pedigrees
//! - Template workbooks and the batch and streaming readers over them

pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod template;

// Macros expand to paths under this re-export
#[doc(hidden)]
pub use germbank_core_types;

pub use errors::{ExError, ExErrorKind, Result, TemplateError};
pub use template::{BatchReader, Workbook};
