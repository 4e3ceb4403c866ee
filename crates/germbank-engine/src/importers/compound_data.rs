//! Compound measurements of a dataset
//!
//! Accessions and compounds must already exist; the measurements are
//! written through a batch writer deduplicated against the dataset's
//! existing rows.

#![allow(clippy::result_large_err)]

use germbank_core::model::CompoundDatum;
use germbank_core::template::CompoundDataReader;
use germbank_core::Workbook;
use germbank_store::errors::Result;
use germbank_store::repo::facts::preload_compound_data;
use germbank_store::repo::keys::iso_date;
use germbank_store::repo::reference::preload_by_name;
use germbank_store::repo::CompoundDataRow;
use germbank_store::{BatchWriter, Resolver, RollbackTracker, Table};
use rusqlite::Connection;

use super::{flush_rows, logged, write_row, Importer, StageContext};
use crate::run::{run_import, ImportSummary, RecordSink};

#[derive(Debug, Default)]
pub struct CompoundDataImporter {
    tracker: RollbackTracker,
    flush_sizes: Vec<usize>,
}

impl CompoundDataImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sizes of the flushes of the last import
    pub fn flush_sizes(&self) -> &[usize] {
        &self.flush_sizes
    }
}

struct CompoundDataSink<'a> {
    dataset_id: i64,
    accessions: Resolver<String>,
    compounds: Resolver<String>,
    writer: BatchWriter<CompoundDataRow>,
    tracker: &'a mut RollbackTracker,
}

impl RecordSink for CompoundDataSink<'_> {
    type Record = CompoundDatum;

    fn accept(&mut self, conn: &mut Connection, datum: CompoundDatum) -> Result<()> {
        let accession_id = self.accessions.require(&datum.accession)?;
        let compound_id = self.compounds.require(&datum.compound)?;

        let row = CompoundDataRow {
            compound_id,
            accession_id,
            dataset_id: self.dataset_id,
            value: datum.value,
            recording_date: iso_date(datum.recording_date),
        };
        write_row(&mut self.writer, self.tracker, conn, row)
    }

    fn finish(&mut self, conn: &mut Connection) -> Result<()> {
        flush_rows(&mut self.writer, self.tracker, conn)
    }
}

impl Importer for CompoundDataImporter {
    fn name(&self) -> &'static str {
        "compound-data"
    }

    fn import(
        &mut self,
        conn: &mut Connection,
        workbook: &Workbook,
        ctx: &mut StageContext,
    ) -> Result<ImportSummary> {
        let run_id = ctx.run_id.clone();

        logged("import_compound_data", &run_id, || {
            self.tracker.reset();
            self.flush_sizes.clear();
            let dataset_id = ctx.require_dataset("import_compound_data")?;
            let records = CompoundDataReader::open(workbook)?;

            let mut accessions = Resolver::new(Table::Accessions);
            preload_by_name(&mut accessions, conn)?;
            let mut compounds = Resolver::new(Table::Compounds);
            preload_by_name(&mut compounds, conn)?;
            let mut writer = BatchWriter::new(ctx.config.batch_size);
            preload_compound_data(&mut writer, conn, dataset_id)?;

            let mut sink = CompoundDataSink {
                dataset_id,
                accessions,
                compounds,
                writer,
                tracker: &mut self.tracker,
            };
            let result = run_import(conn, records, &mut sink, ctx.policy());
            self.flush_sizes = sink.writer.flush_sizes().to_vec();
            let run = result?;

            Ok(ImportSummary::new(self.name(), run, &self.tracker))
        })
    }

    fn tracker(&self) -> &RollbackTracker {
        &self.tracker
    }

    fn tracker_mut(&mut self) -> &mut RollbackTracker {
        &mut self.tracker
    }
}
