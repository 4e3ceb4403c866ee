//! Per-entity importers
//!
//! One importer per entity family. An importer opens its reader on the
//! workbook, preloads the natural keys it deduplicates against and drives
//! the records through its sink with [`run_import`](crate::run::run_import).
//! Every row it inserts is tracked so the run can be undone with
//! [`Importer::rollback`].

#![allow(clippy::result_large_err)]

use std::time::Instant;

use germbank_core::{log_op_end, log_op_error, log_op_start, Workbook};
use germbank_core_types::RunId;
use germbank_store::errors::{invalid_input, Result};
use germbank_store::{
    BatchRow, BatchWriter, ImportConfig, Resolution, RollbackReport, RollbackTracker, Table,
    UnresolvedPolicy, WriteOutcome,
};
use rusqlite::Connection;

use crate::run::ImportSummary;

pub mod attribute;
pub mod collaborator;
pub mod compound;
pub mod compound_data;
pub mod marker;
pub mod metadata;
pub mod passport;
pub mod pedigree;
pub mod pedigree_string;
pub mod phenotype;
pub mod phenotype_data;

pub use attribute::AttributeDataImporter;
pub use collaborator::CollaboratorImporter;
pub use compound::CompoundImporter;
pub use compound_data::CompoundDataImporter;
pub use marker::MarkerImporter;
pub use metadata::MetadataImporter;
pub use passport::PassportImporter;
pub use pedigree::PedigreeImporter;
pub use pedigree_string::PedigreeStringImporter;
pub use phenotype::PhenotypeImporter;
pub use phenotype_data::PhenotypeDataImporter;

/// State shared by the stages of one pipeline run
#[derive(Debug, Clone)]
pub struct StageContext {
    pub run_id: RunId,
    pub config: ImportConfig,
    /// Set by the metadata stage; fact importers attach their rows to it
    pub dataset_id: Option<i64>,
}

impl StageContext {
    pub fn new(config: ImportConfig) -> Self {
        Self {
            run_id: RunId::new(),
            config,
            dataset_id: None,
        }
    }

    pub fn policy(&self) -> UnresolvedPolicy {
        self.config.on_unresolved
    }

    /// The dataset a fact importer writes into
    ///
    /// # Errors
    ///
    /// `ERR_INVALID_INPUT` when no metadata stage has run.
    pub fn require_dataset(&self, op: &str) -> Result<i64> {
        self.dataset_id.ok_or_else(|| {
            invalid_input(op, "No dataset for this run; import the template metadata first")
        })
    }
}

/// One entity family's import from a template workbook
pub trait Importer {
    /// Short name used in summaries and log events
    fn name(&self) -> &'static str;

    /// Import every record of the workbook this importer reads
    ///
    /// Rows committed before a failure stay in the store and stay tracked,
    /// so the caller can still [`Importer::rollback`] them.
    ///
    /// # Errors
    ///
    /// The first reader, resolution or store error of the run.
    fn import(
        &mut self,
        conn: &mut Connection,
        workbook: &Workbook,
        ctx: &mut StageContext,
    ) -> Result<ImportSummary>;

    fn tracker(&self) -> &RollbackTracker;

    fn tracker_mut(&mut self) -> &mut RollbackTracker;

    /// Delete every row the last [`Importer::import`] created
    fn rollback(&mut self, conn: &Connection) -> RollbackReport {
        self.tracker_mut().delete_created(conn)
    }
}

/// Wrap one importer run in start/end/error events
pub(crate) fn logged<F>(op: &'static str, run_id: &RunId, f: F) -> Result<ImportSummary>
where
    F: FnOnce() -> Result<ImportSummary>,
{
    let start = Instant::now();
    log_op_start!(op, run_id = run_id.as_str());

    match f() {
        Ok(summary) => {
            log_op_end!(
                op,
                duration_ms = start.elapsed().as_millis() as u64,
                run_id = run_id.as_str(),
                records = summary.records,
                created = summary.total_created(),
                skipped = summary.skipped.len(),
            );
            Ok(summary)
        }
        Err(e) => {
            log_op_error!(
                op,
                &e,
                duration_ms = start.elapsed().as_millis() as u64,
                run_id = run_id.as_str(),
            );
            Err(e)
        }
    }
}

/// Id of a resolution, tracking it when a row was inserted
pub(crate) fn tracked(tracker: &mut RollbackTracker, table: Table, resolution: Resolution) -> i64 {
    if resolution.is_created() {
        tracker.track(table, resolution.id());
    }
    resolution.id()
}

/// Buffer a fact row, tracking the ids of any flush it triggers
pub(crate) fn write_row<R: BatchRow>(
    writer: &mut BatchWriter<R>,
    tracker: &mut RollbackTracker,
    conn: &mut Connection,
    row: R,
) -> Result<()> {
    if let WriteOutcome::Flushed(ids) = writer.write(conn, row)? {
        tracker.track_all(R::TABLE, ids);
    }
    Ok(())
}

/// Flush a writer's remainder and track its ids
pub(crate) fn flush_rows<R: BatchRow>(
    writer: &mut BatchWriter<R>,
    tracker: &mut RollbackTracker,
    conn: &mut Connection,
) -> Result<()> {
    let ids = writer.flush(conn)?;
    tracker.track_all(R::TABLE, ids);
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use germbank_core::Workbook;
    use germbank_store::db::open_in_memory;
    use germbank_store::migrations::apply_migrations;
    use rusqlite::Connection;

    pub fn setup_test_db() -> Connection {
        let mut conn = open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        conn
    }

    /// Write `<SHEET>.tsv` files into `dir` and open them as a workbook
    pub fn workbook(dir: &Path, sheets: &[(&str, &str)]) -> Workbook {
        for (name, content) in sheets {
            std::fs::write(dir.join(format!("{}.tsv", name)), content).unwrap();
        }
        Workbook::open(dir).unwrap()
    }

    pub fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .unwrap()
    }

    pub fn insert_accessions(conn: &Connection, identifiers: &[&str]) {
        for id in identifiers {
            conn.execute(
                "INSERT INTO accessions (general_identifier, name) VALUES (?1, ?1)",
                [id],
            )
            .unwrap();
        }
    }
}
