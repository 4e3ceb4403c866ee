//! Free-form accession attributes from `ADDITIONAL_ATTRIBUTES`

#![allow(clippy::result_large_err)]

use germbank_core::model::AttributeDatum;
use germbank_core::template::AttributeDataReader;
use germbank_core::Workbook;
use germbank_store::errors::Result;
use germbank_store::repo::facts::preload_attribute_data;
use germbank_store::repo::reference::{insert_attribute, preload_by_name};
use germbank_store::repo::AttributeDataRow;
use germbank_store::{BatchWriter, Resolver, RollbackTracker, Table};
use rusqlite::Connection;

use super::{flush_rows, logged, tracked, write_row, Importer, StageContext};
use crate::run::{run_import, ImportSummary, RecordSink};

/// Data type recorded for attributes created from a template
const ATTRIBUTE_DATA_TYPE: &str = "char";

#[derive(Debug, Default)]
pub struct AttributeDataImporter {
    tracker: RollbackTracker,
}

impl AttributeDataImporter {
    pub fn new() -> Self {
        Self::default()
    }
}

struct AttributeSink<'a> {
    accessions: Resolver<String>,
    attributes: Resolver<String>,
    writer: BatchWriter<AttributeDataRow>,
    tracker: &'a mut RollbackTracker,
}

impl RecordSink for AttributeSink<'_> {
    type Record = AttributeDatum;

    fn accept(&mut self, conn: &mut Connection, datum: AttributeDatum) -> Result<()> {
        let accession_id = self.accessions.require(&datum.accession)?;
        let attribute = self
            .attributes
            .resolve_or_create(datum.attribute, |name| {
                insert_attribute(conn, name, ATTRIBUTE_DATA_TYPE)
            })?;
        let attribute_id = tracked(self.tracker, Table::Attributes, attribute);

        let row = AttributeDataRow {
            attribute_id,
            accession_id,
            value: datum.value,
        };
        write_row(&mut self.writer, self.tracker, conn, row)
    }

    fn finish(&mut self, conn: &mut Connection) -> Result<()> {
        flush_rows(&mut self.writer, self.tracker, conn)
    }
}

impl Importer for AttributeDataImporter {
    fn name(&self) -> &'static str {
        "attributes"
    }

    fn import(
        &mut self,
        conn: &mut Connection,
        workbook: &Workbook,
        ctx: &mut StageContext,
    ) -> Result<ImportSummary> {
        let run_id = ctx.run_id.clone();

        logged("import_attribute_data", &run_id, || {
            self.tracker.reset();
            let records = AttributeDataReader::open(workbook)?;

            let mut accessions = Resolver::new(Table::Accessions);
            preload_by_name(&mut accessions, conn)?;
            let mut attributes = Resolver::new(Table::Attributes);
            preload_by_name(&mut attributes, conn)?;
            let mut writer = BatchWriter::new(ctx.config.batch_size);
            preload_attribute_data(&mut writer, conn)?;

            let mut sink = AttributeSink {
                accessions,
                attributes,
                writer,
                tracker: &mut self.tracker,
            };
            let run = run_import(conn, records, &mut sink, ctx.policy())?;

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
