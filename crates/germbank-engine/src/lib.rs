//! Germbank Engine - Import orchestration layer
//!
//! Drives template readers into the store: one importer per template
//! sheet family, chained by a pipeline per template kind.
//!
//! ## Logging Ownership
//!
//! Importers and the pipeline emit the lifecycle events (`start`, `end`,
//! `end_error`) of each run. Store and readers log at debug level only.

pub mod importers;
pub mod pipeline;
pub mod run;

pub use importers::{Importer, StageContext};
pub use pipeline::{open_template, ImportKind, Pipeline, PipelineFailure, PipelineRun, ReaderKind};
pub use run::{ImportRun, ImportState, ImportSummary, SkippedRecord};
