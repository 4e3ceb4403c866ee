//! Phenotype definitions and their units

#![allow(clippy::result_large_err)]

use germbank_core::model::Phenotype;
use germbank_core::template::PhenotypeReader;
use germbank_core::{BatchReader, Workbook};
use germbank_store::errors::Result;
use germbank_store::repo::keys::UnitKey;
use germbank_store::repo::reference::{insert_phenotype, preload_by_name, preload_units};
use germbank_store::{Resolver, RollbackTracker, Table};
use rusqlite::Connection;

use super::compound::resolve_unit;
use super::{logged, tracked, Importer, StageContext};
use crate::run::{run_import, ImportSummary, RecordSink};

#[derive(Debug, Default)]
pub struct PhenotypeImporter {
    tracker: RollbackTracker,
}

impl PhenotypeImporter {
    pub fn new() -> Self {
        Self::default()
    }
}

struct PhenotypeSink<'a> {
    units: Resolver<UnitKey>,
    phenotypes: Resolver<String>,
    tracker: &'a mut RollbackTracker,
}

impl RecordSink for PhenotypeSink<'_> {
    type Record = Phenotype;

    fn accept(&mut self, conn: &mut Connection, phenotype: Phenotype) -> Result<()> {
        let unit_id = resolve_unit(&mut self.units, self.tracker, conn, phenotype.unit.as_ref())?;

        let resolution = self
            .phenotypes
            .resolve_or_create(phenotype.name.clone(), |_| {
                insert_phenotype(conn, &phenotype, unit_id)
            })?;
        tracked(self.tracker, Table::Phenotypes, resolution);
        Ok(())
    }

    fn finish(&mut self, _conn: &mut Connection) -> Result<()> {
        Ok(())
    }
}

impl Importer for PhenotypeImporter {
    fn name(&self) -> &'static str {
        "phenotypes"
    }

    fn import(
        &mut self,
        conn: &mut Connection,
        workbook: &Workbook,
        ctx: &mut StageContext,
    ) -> Result<ImportSummary> {
        let run_id = ctx.run_id.clone();

        logged("import_phenotypes", &run_id, || {
            self.tracker.reset();
            let records = PhenotypeReader.read_all(workbook)?;

            let mut units = Resolver::new(Table::Units);
            preload_units(&mut units, conn)?;
            let mut phenotypes = Resolver::new(Table::Phenotypes);
            preload_by_name(&mut phenotypes, conn)?;

            let mut sink = PhenotypeSink {
                units,
                phenotypes,
                tracker: &mut self.tracker,
            };
            let run = run_import(conn, records.into_iter().map(Ok), &mut sink, ctx.policy())?;

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
