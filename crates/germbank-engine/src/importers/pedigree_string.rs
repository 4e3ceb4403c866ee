//! Pedigree strings in a named notation

#![allow(clippy::result_large_err)]

use germbank_core::model::PedigreeDefinition;
use germbank_core::template::PedigreeStringReader;
use germbank_core::{BatchReader, Workbook};
use germbank_store::errors::Result;
use germbank_store::repo::facts::preload_pedigree_definitions;
use germbank_store::repo::reference::{insert_pedigree_notation, preload_by_name};
use germbank_store::repo::PedigreeDefinitionRow;
use germbank_store::{BatchWriter, Resolver, RollbackTracker, Table};
use rusqlite::Connection;

use super::pedigree::resolve_description;
use super::{flush_rows, logged, tracked, write_row, Importer, StageContext};
use crate::run::{run_import, ImportSummary, RecordSink};

#[derive(Debug, Default)]
pub struct PedigreeStringImporter {
    tracker: RollbackTracker,
}

impl PedigreeStringImporter {
    pub fn new() -> Self {
        Self::default()
    }
}

struct PedigreeStringSink<'a> {
    accessions: Resolver<String>,
    notations: Resolver<String>,
    descriptions: Resolver<String>,
    writer: BatchWriter<PedigreeDefinitionRow>,
    tracker: &'a mut RollbackTracker,
}

impl RecordSink for PedigreeStringSink<'_> {
    type Record = PedigreeDefinition;

    fn accept(&mut self, conn: &mut Connection, definition: PedigreeDefinition) -> Result<()> {
        let accession_id = self.accessions.require(&definition.accession)?;

        let notation = self
            .notations
            .resolve_or_create(definition.notation.clone(), |n| {
                insert_pedigree_notation(conn, n, None)
            })?;
        let notation_id = tracked(self.tracker, Table::PedigreeNotations, notation);

        let description_id = resolve_description(
            &mut self.descriptions,
            self.tracker,
            conn,
            definition.description.as_ref(),
        )?;

        let row = PedigreeDefinitionRow {
            accession_id,
            notation_id,
            description_id,
            definition: definition.definition,
        };
        write_row(&mut self.writer, self.tracker, conn, row)
    }

    fn finish(&mut self, conn: &mut Connection) -> Result<()> {
        flush_rows(&mut self.writer, self.tracker, conn)
    }
}

impl Importer for PedigreeStringImporter {
    fn name(&self) -> &'static str {
        "pedigree-string"
    }

    fn import(
        &mut self,
        conn: &mut Connection,
        workbook: &Workbook,
        ctx: &mut StageContext,
    ) -> Result<ImportSummary> {
        let run_id = ctx.run_id.clone();

        logged("import_pedigree_strings", &run_id, || {
            self.tracker.reset();
            let records = PedigreeStringReader.read_all(workbook)?;

            let mut accessions = Resolver::new(Table::Accessions);
            preload_by_name(&mut accessions, conn)?;
            let mut notations = Resolver::new(Table::PedigreeNotations);
            preload_by_name(&mut notations, conn)?;
            let mut descriptions = Resolver::new(Table::PedigreeDescriptions);
            preload_by_name(&mut descriptions, conn)?;
            let mut writer = BatchWriter::new(ctx.config.batch_size);
            preload_pedigree_definitions(&mut writer, conn)?;

            let mut sink = PedigreeStringSink {
                accessions,
                notations,
                descriptions,
                writer,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importers::test_support::{count, insert_accessions, setup_test_db, workbook};
    use germbank_core::ExErrorKind;
    use germbank_store::ImportConfig;

    const HEADER: &str = "Accession\tDefinition\tNotation\tDescription\tAuthor\n";

    #[test]
    fn test_creates_notations_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let wb = workbook(
            dir.path(),
            &[(
                "DATA-STRING",
                &format!(
                    "{}C1\tP1/P2\tPurdy\t\t\nC2\tC1/3/P2\tPurdy\t\t\nC3\tP1 x P2\tHelium\tNotes\tJ. Doe\n",
                    HEADER
                ),
            )],
        );
        let mut conn = setup_test_db();
        insert_accessions(&conn, &["C1", "C2", "C3"]);
        let mut ctx = StageContext::new(ImportConfig::default());

        let summary = PedigreeStringImporter::new()
            .import(&mut conn, &wb, &mut ctx)
            .unwrap();

        assert_eq!(summary.created_in(Table::PedigreeDefinitions), 3);
        assert_eq!(summary.created_in(Table::PedigreeNotations), 2);
        assert_eq!(summary.created_in(Table::PedigreeDescriptions), 1);
    }

    #[test]
    fn test_empty_definition_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let wb = workbook(
            dir.path(),
            &[("DATA-STRING", &format!("{}C1\t\tPurdy\t\t\n", HEADER))],
        );
        let mut conn = setup_test_db();
        insert_accessions(&conn, &["C1"]);
        let mut ctx = StageContext::new(ImportConfig::default());

        let err = PedigreeStringImporter::new()
            .import(&mut conn, &wb, &mut ctx)
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert_eq!(count(&conn, "pedigree_notations"), 0);
    }
}
