//! Compound definitions and their units

#![allow(clippy::result_large_err)]

use germbank_core::model::{Compound, Unit};
use germbank_core::template::CompoundReader;
use germbank_core::{BatchReader, Workbook};
use germbank_store::errors::Result;
use germbank_store::repo::keys::UnitKey;
use germbank_store::repo::reference::{
    insert_compound, insert_unit, preload_by_name, preload_units, unit_key,
};
use germbank_store::{Resolver, RollbackTracker, Table};
use rusqlite::Connection;

use super::{logged, tracked, Importer, StageContext};
use crate::run::{run_import, ImportSummary, RecordSink};

#[derive(Debug, Default)]
pub struct CompoundImporter {
    tracker: RollbackTracker,
}

impl CompoundImporter {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Units are shared by the compound and phenotype sheets
pub(crate) fn resolve_unit(
    units: &mut Resolver<UnitKey>,
    tracker: &mut RollbackTracker,
    conn: &Connection,
    unit: Option<&Unit>,
) -> Result<Option<i64>> {
    let Some(unit) = unit else {
        return Ok(None);
    };
    let resolution = units.resolve_or_create(unit_key(unit), |_| insert_unit(conn, unit))?;
    Ok(Some(tracked(tracker, Table::Units, resolution)))
}

struct CompoundSink<'a> {
    units: Resolver<UnitKey>,
    compounds: Resolver<String>,
    tracker: &'a mut RollbackTracker,
}

impl RecordSink for CompoundSink<'_> {
    type Record = Compound;

    fn accept(&mut self, conn: &mut Connection, compound: Compound) -> Result<()> {
        let unit_id = resolve_unit(&mut self.units, self.tracker, conn, compound.unit.as_ref())?;

        let resolution = self
            .compounds
            .resolve_or_create(compound.name.clone(), |_| {
                insert_compound(conn, &compound, unit_id)
            })?;
        tracked(self.tracker, Table::Compounds, resolution);
        Ok(())
    }

    fn finish(&mut self, _conn: &mut Connection) -> Result<()> {
        Ok(())
    }
}

impl Importer for CompoundImporter {
    fn name(&self) -> &'static str {
        "compounds"
    }

    fn import(
        &mut self,
        conn: &mut Connection,
        workbook: &Workbook,
        ctx: &mut StageContext,
    ) -> Result<ImportSummary> {
        let run_id = ctx.run_id.clone();

        logged("import_compounds", &run_id, || {
            self.tracker.reset();
            let records = CompoundReader.read_all(workbook)?;

            let mut units = Resolver::new(Table::Units);
            preload_units(&mut units, conn)?;
            let mut compounds = Resolver::new(Table::Compounds);
            preload_by_name(&mut compounds, conn)?;

            let mut sink = CompoundSink {
                units,
                compounds,
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
    use crate::importers::test_support::{count, setup_test_db, workbook};
    use germbank_store::ImportConfig;

    #[test]
    fn test_units_shared_between_compounds() {
        let dir = tempfile::tempdir().unwrap();
        let wb = workbook(
            dir.path(),
            &[(
                "COMPOUNDS",
                "Name\tDesc\tFormula\tMono\tAvg\tClass\tUnit\tAbbr\tUnitDesc\n\
                 caffeine\t\tC8H10N4O2\t194.08\t194.19\talkaloid\tmilligram\tmg\t\n\
                 theobromine\t\tC7H8N4O2\t\t\talkaloid\tmilligram\tmg\t\n\
                 water\t\t\t\t\t\t\t\t\n",
            )],
        );
        let mut conn = setup_test_db();
        let mut ctx = StageContext::new(ImportConfig::default());

        let mut importer = CompoundImporter::new();
        let summary = importer.import(&mut conn, &wb, &mut ctx).unwrap();

        assert_eq!(summary.records, 3);
        assert_eq!(summary.created_in(Table::Compounds), 3);
        assert_eq!(summary.created_in(Table::Units), 1);

        let unitless: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM compounds WHERE unit_id IS NULL",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(unitless, 1);

        let report = importer.rollback(&conn);
        assert!(report.is_clean());
        assert_eq!(count(&conn, "compounds"), 0);
        assert_eq!(count(&conn, "units"), 0);
    }
}
