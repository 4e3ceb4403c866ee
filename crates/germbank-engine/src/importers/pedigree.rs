//! Parent links between accessions

#![allow(clippy::result_large_err)]

use germbank_core::model::{Pedigree, PedigreeDescription};
use germbank_core::template::PedigreeReader;
use germbank_core::Workbook;
use germbank_store::errors::Result;
use germbank_store::repo::facts::preload_pedigrees;
use germbank_store::repo::reference::{insert_pedigree_description, preload_by_name};
use germbank_store::repo::PedigreeRow;
use germbank_store::{BatchWriter, Resolver, RollbackTracker, Table};
use rusqlite::Connection;

use super::{flush_rows, logged, tracked, write_row, Importer, StageContext};
use crate::run::{run_import, ImportSummary, RecordSink};

#[derive(Debug, Default)]
pub struct PedigreeImporter {
    tracker: RollbackTracker,
}

impl PedigreeImporter {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Pedigree descriptions are created on first use by both pedigree sheets
pub(crate) fn resolve_description(
    descriptions: &mut Resolver<String>,
    tracker: &mut RollbackTracker,
    conn: &Connection,
    description: Option<&PedigreeDescription>,
) -> Result<Option<i64>> {
    let Some(description) = description else {
        return Ok(None);
    };
    let resolution = descriptions.resolve_or_create(description.name.clone(), |_| {
        insert_pedigree_description(conn, description)
    })?;
    Ok(Some(tracked(tracker, Table::PedigreeDescriptions, resolution)))
}

struct PedigreeSink<'a> {
    accessions: Resolver<String>,
    descriptions: Resolver<String>,
    writer: BatchWriter<PedigreeRow>,
    tracker: &'a mut RollbackTracker,
}

impl RecordSink for PedigreeSink<'_> {
    type Record = Pedigree;

    fn accept(&mut self, conn: &mut Connection, pedigree: Pedigree) -> Result<()> {
        let accession_id = self.accessions.require(&pedigree.accession)?;
        let parent_id = self.accessions.require(&pedigree.parent)?;
        let description_id = resolve_description(
            &mut self.descriptions,
            self.tracker,
            conn,
            pedigree.description.as_ref(),
        )?;

        let row = PedigreeRow {
            accession_id,
            parent_id,
            description_id,
            relationship: pedigree.relationship_description,
        };
        write_row(&mut self.writer, self.tracker, conn, row)
    }

    fn finish(&mut self, conn: &mut Connection) -> Result<()> {
        flush_rows(&mut self.writer, self.tracker, conn)
    }
}

impl Importer for PedigreeImporter {
    fn name(&self) -> &'static str {
        "pedigree"
    }

    fn import(
        &mut self,
        conn: &mut Connection,
        workbook: &Workbook,
        ctx: &mut StageContext,
    ) -> Result<ImportSummary> {
        let run_id = ctx.run_id.clone();

        logged("import_pedigree", &run_id, || {
            self.tracker.reset();
            let records = PedigreeReader::open(workbook)?;

            let mut accessions = Resolver::new(Table::Accessions);
            preload_by_name(&mut accessions, conn)?;
            let mut descriptions = Resolver::new(Table::PedigreeDescriptions);
            preload_by_name(&mut descriptions, conn)?;
            let mut writer = BatchWriter::new(ctx.config.batch_size);
            preload_pedigrees(&mut writer, conn)?;

            let mut sink = PedigreeSink {
                accessions,
                descriptions,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importers::test_support::{count, insert_accessions, setup_test_db, workbook};
    use germbank_core::ExErrorKind;
    use germbank_store::ImportConfig;

    const DATA: &str = "Accession\tParent 1\tParent 2\tRelationship\tDescription\tAuthor\n\
        C1\tP1\tP2\tF1 cross\tBreeding records\tJ. Doe\n\
        C2\tC1\t\tselfed\tBreeding records\tJ. Doe\n";

    #[test]
    fn test_links_each_parent() {
        let dir = tempfile::tempdir().unwrap();
        let wb = workbook(dir.path(), &[("DATA", DATA)]);
        let mut conn = setup_test_db();
        insert_accessions(&conn, &["P1", "P2", "C1", "C2"]);
        let mut ctx = StageContext::new(ImportConfig::default());

        let summary = PedigreeImporter::new()
            .import(&mut conn, &wb, &mut ctx)
            .unwrap();

        assert_eq!(summary.created_in(Table::Pedigrees), 3);
        assert_eq!(summary.created_in(Table::PedigreeDescriptions), 1);
    }

    #[test]
    fn test_missing_parent_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let wb = workbook(dir.path(), &[("DATA", DATA)]);
        let mut conn = setup_test_db();
        insert_accessions(&conn, &["P1", "C1", "C2"]);
        let mut ctx = StageContext::new(ImportConfig::default());

        let mut importer = PedigreeImporter::new();
        let err = importer.import(&mut conn, &wb, &mut ctx).unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::UnresolvedReference);
        assert_eq!(err.natural_key(), Some("P2"));
        assert_eq!(count(&conn, "pedigrees"), 0);

        // the description created before the failure is still tracked
        let report = importer.rollback(&conn);
        assert!(report.is_clean());
        assert_eq!(count(&conn, "pedigree_descriptions"), 0);
    }
}
