//! Trial observations of a dataset
//!
//! A row naming a rep is recorded against a plot: a `plant_plot` accession
//! named `<accession>-<dataset id>-<rep>` whose parent is the row's
//! accession. Plots and treatments are created on demand; accessions and
//! phenotypes must already exist.

#![allow(clippy::result_large_err)]

use std::collections::HashMap;

use germbank_core::model::{Accession, EntityType, PhenotypeDatum};
use germbank_core::template::PhenotypeDataReader;
use germbank_core::Workbook;
use germbank_store::errors::Result;
use germbank_store::repo::facts::preload_phenotype_data;
use germbank_store::repo::keys::iso_date;
use germbank_store::repo::reference::{
    accession_name, insert_accession, insert_treatment, preload_by_name,
};
use germbank_store::repo::{AccessionLinks, PhenotypeDataRow};
use germbank_store::{BatchWriter, Resolver, RollbackTracker, Table};
use rusqlite::Connection;

use super::{flush_rows, logged, tracked, write_row, Importer, StageContext};
use crate::run::{run_import, ImportSummary, RecordSink};

#[derive(Debug, Default)]
pub struct PhenotypeDataImporter {
    tracker: RollbackTracker,
}

impl PhenotypeDataImporter {
    pub fn new() -> Self {
        Self::default()
    }
}

fn plot(name: String) -> Accession {
    Accession {
        number: Some(name.clone()),
        entity_type: EntityType::PlantPlot,
        ..Accession::named(name)
    }
}

struct PhenotypeDataSink<'a> {
    dataset_id: i64,
    accessions: Resolver<String>,
    parent_names: HashMap<i64, String>,
    phenotypes: Resolver<String>,
    treatments: Resolver<String>,
    writer: BatchWriter<PhenotypeDataRow>,
    tracker: &'a mut RollbackTracker,
}

impl PhenotypeDataSink<'_> {
    fn plot_id(&mut self, conn: &Connection, parent_id: i64, rep: &str) -> Result<i64> {
        let parent_name = match self.parent_names.get(&parent_id) {
            Some(name) => name.clone(),
            None => {
                let name = accession_name(conn, parent_id)?;
                self.parent_names.insert(parent_id, name.clone());
                name
            }
        };

        let name = format!("{}-{}-{}", parent_name, self.dataset_id, rep);
        let links = AccessionLinks {
            parent_id: Some(parent_id),
            ..AccessionLinks::default()
        };
        let resolution = self
            .accessions
            .resolve_or_create(name, |n| insert_accession(conn, &plot(n.clone()), links))?;
        Ok(tracked(self.tracker, Table::Accessions, resolution))
    }
}

impl RecordSink for PhenotypeDataSink<'_> {
    type Record = PhenotypeDatum;

    fn accept(&mut self, conn: &mut Connection, datum: PhenotypeDatum) -> Result<()> {
        let accession_id = self.accessions.require(&datum.accession)?;
        let phenotype_id = self.phenotypes.require(&datum.phenotype)?;

        let subject_id = match datum.rep.as_deref() {
            Some(rep) => self.plot_id(conn, accession_id, rep)?,
            None => accession_id,
        };

        let treatment_id = match datum.treatment {
            Some(name) => {
                let resolution = self
                    .treatments
                    .resolve_or_create(name, |n| insert_treatment(conn, n))?;
                Some(tracked(self.tracker, Table::Treatments, resolution))
            }
            None => None,
        };

        let row = PhenotypeDataRow {
            phenotype_id,
            accession_id: subject_id,
            dataset_id: self.dataset_id,
            treatment_id,
            value: datum.value,
            recording_date: iso_date(datum.recording_date),
        };
        write_row(&mut self.writer, self.tracker, conn, row)
    }

    fn finish(&mut self, conn: &mut Connection) -> Result<()> {
        flush_rows(&mut self.writer, self.tracker, conn)
    }
}

impl Importer for PhenotypeDataImporter {
    fn name(&self) -> &'static str {
        "phenotype-data"
    }

    fn import(
        &mut self,
        conn: &mut Connection,
        workbook: &Workbook,
        ctx: &mut StageContext,
    ) -> Result<ImportSummary> {
        let run_id = ctx.run_id.clone();

        logged("import_phenotype_data", &run_id, || {
            self.tracker.reset();
            let dataset_id = ctx.require_dataset("import_phenotype_data")?;
            let records = PhenotypeDataReader::open(workbook)?;

            let mut accessions = Resolver::new(Table::Accessions);
            preload_by_name(&mut accessions, conn)?;
            let mut phenotypes = Resolver::new(Table::Phenotypes);
            preload_by_name(&mut phenotypes, conn)?;
            let mut treatments = Resolver::new(Table::Treatments);
            preload_by_name(&mut treatments, conn)?;
            let mut writer = BatchWriter::new(ctx.config.batch_size);
            preload_phenotype_data(&mut writer, conn, dataset_id)?;

            let mut sink = PhenotypeDataSink {
                dataset_id,
                accessions,
                parent_names: HashMap::new(),
                phenotypes,
                treatments,
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
