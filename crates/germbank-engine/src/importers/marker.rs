//! Genetic map and the markers placed on it
//!
//! The map, its feature type, marker types and markers are reference rows
//! resolved one at a time. Marker positions are written through a batch
//! writer deduplicated against the map's existing definitions.

#![allow(clippy::result_large_err)]

use germbank_core::model::MapDefinition;
use germbank_core::template::{MapReader, MarkerReader};
use germbank_core::{BatchReader, Workbook};
use germbank_store::errors::{invalid_input, Result};
use germbank_store::repo::facts::preload_map_definitions;
use germbank_store::repo::keys::MarkerKey;
use germbank_store::repo::reference::{
    insert_map, insert_map_feature_type, insert_marker, insert_marker_type, preload_by_name,
    preload_markers,
};
use germbank_store::repo::MapDefinitionRow;
use germbank_store::{BatchWriter, Resolver, RollbackTracker, Table};
use rusqlite::Connection;

use super::{flush_rows, logged, tracked, write_row, Importer, StageContext};
use crate::run::{run_import, ImportSummary, RecordSink};

#[derive(Debug, Default)]
pub struct MarkerImporter {
    tracker: RollbackTracker,
}

impl MarkerImporter {
    pub fn new() -> Self {
        Self::default()
    }
}

struct MarkerSink<'a> {
    map_id: i64,
    map_feature_type_id: Option<i64>,
    marker_types: Resolver<String>,
    markers: Resolver<MarkerKey>,
    writer: BatchWriter<MapDefinitionRow>,
    tracker: &'a mut RollbackTracker,
}

impl RecordSink for MarkerSink<'_> {
    type Record = MapDefinition;

    fn accept(&mut self, conn: &mut Connection, definition: MapDefinition) -> Result<()> {
        let marker_type_id = match definition.marker_type.as_deref() {
            Some(name) => {
                let resolution = self
                    .marker_types
                    .resolve_or_create(name.to_string(), |_| insert_marker_type(conn, name))?;
                Some(tracked(self.tracker, Table::MarkerTypes, resolution))
            }
            None => None,
        };

        let key = MarkerKey {
            name: definition.marker,
            marker_type_id,
        };
        let resolution = self
            .markers
            .resolve_or_create(key, |k| insert_marker(conn, k))?;
        let marker_id = tracked(self.tracker, Table::Markers, resolution);

        let row = MapDefinitionRow {
            map_feature_type_id: self.map_feature_type_id,
            marker_id,
            map_id: self.map_id,
            start: definition.start,
            end: definition.end,
            chromosome: definition.chromosome,
        };
        write_row(&mut self.writer, self.tracker, conn, row)
    }

    fn finish(&mut self, conn: &mut Connection) -> Result<()> {
        flush_rows(&mut self.writer, self.tracker, conn)
    }
}

impl Importer for MarkerImporter {
    fn name(&self) -> &'static str {
        "markers"
    }

    fn import(
        &mut self,
        conn: &mut Connection,
        workbook: &Workbook,
        ctx: &mut StageContext,
    ) -> Result<ImportSummary> {
        let run_id = ctx.run_id.clone();

        logged("import_markers", &run_id, || {
            self.tracker.reset();
            let maps = MapReader.read_all(workbook)?;
            let records = MarkerReader::open(workbook)?;

            let mut resolved_maps = Resolver::new(Table::Maps);
            preload_by_name(&mut resolved_maps, conn)?;
            let mut feature_types = Resolver::new(Table::MapFeatureTypes);
            preload_by_name(&mut feature_types, conn)?;

            // The first map row names the map every marker goes on
            let Some(map) = maps.first() else {
                return Err(invalid_input("import_markers", "The MAP sheet names no map"));
            };
            let resolution =
                resolved_maps.resolve_or_create(map.name.clone(), |_| insert_map(conn, map))?;
            let map_id = tracked(&mut self.tracker, Table::Maps, resolution);
            let map_feature_type_id = match map.feature_type.as_deref() {
                Some(name) => {
                    let resolution = feature_types.resolve_or_create(name.to_string(), |_| {
                        insert_map_feature_type(conn, name)
                    })?;
                    Some(tracked(&mut self.tracker, Table::MapFeatureTypes, resolution))
                }
                None => None,
            };

            let mut marker_types = Resolver::new(Table::MarkerTypes);
            preload_by_name(&mut marker_types, conn)?;
            let mut markers = Resolver::new(Table::Markers);
            preload_markers(&mut markers, conn)?;
            let mut writer = BatchWriter::new(ctx.config.batch_size);
            preload_map_definitions(&mut writer, conn, map_id)?;

            let mut sink = MarkerSink {
                map_id,
                map_feature_type_id,
                marker_types,
                markers,
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
    use crate::importers::test_support::{count, setup_test_db, workbook};
    use germbank_core::ExErrorKind;
    use germbank_store::ImportConfig;

    const MAP: &str = "Name\tDescription\tFeature type\nBarley consensus\t2011 consensus\tSNP\n";

    const MARKERS: &str = "Marker\tType\tChromosome\tStart\tEnd\n\
        11_10001\tSNP\t1H\t12.5\t\n\
        11_10002\tSNP\t1H\t40\t\n\
        11_10003\tDArT\t2H\t3\t4.5\n\
        11_10004\t\t\t\t\n";

    #[test]
    fn test_imports_map_and_markers() {
        let dir = tempfile::tempdir().unwrap();
        let wb = workbook(dir.path(), &[("MAP", MAP), ("MARKERS", MARKERS)]);
        let mut conn = setup_test_db();
        let mut ctx = StageContext::new(ImportConfig::default().with_batch_size(3));

        let summary = MarkerImporter::new().import(&mut conn, &wb, &mut ctx).unwrap();

        assert_eq!(summary.records, 4);
        assert_eq!(summary.created_in(Table::Maps), 1);
        assert_eq!(summary.created_in(Table::MapFeatureTypes), 1);
        assert_eq!(summary.created_in(Table::MarkerTypes), 2);
        assert_eq!(summary.created_in(Table::Markers), 4);
        assert_eq!(summary.created_in(Table::MapDefinitions), 4);

        let (chromosome, start): (String, f64) = conn
            .query_row(
                "SELECT chromosome, definition_start FROM map_definitions md
                 JOIN markers m ON m.id = md.marker_id WHERE m.marker_name = '11_10004'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(chromosome, "UNK");
        assert_eq!(start, 4.0);
    }

    #[test]
    fn test_second_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let wb = workbook(dir.path(), &[("MAP", MAP), ("MARKERS", MARKERS)]);
        let mut conn = setup_test_db();
        let mut ctx = StageContext::new(ImportConfig::default());

        MarkerImporter::new().import(&mut conn, &wb, &mut ctx).unwrap();
        let summary = MarkerImporter::new().import(&mut conn, &wb, &mut ctx).unwrap();

        assert_eq!(summary.total_created(), 0);
        assert_eq!(count(&conn, "markers"), 4);
        assert_eq!(count(&conn, "map_definitions"), 4);
    }

    #[test]
    fn test_rollback_removes_markers_and_map() {
        let dir = tempfile::tempdir().unwrap();
        let wb = workbook(dir.path(), &[("MAP", MAP), ("MARKERS", MARKERS)]);
        let mut conn = setup_test_db();
        let mut ctx = StageContext::new(ImportConfig::default());

        let mut importer = MarkerImporter::new();
        importer.import(&mut conn, &wb, &mut ctx).unwrap();
        let report = importer.rollback(&conn);

        assert!(report.is_clean());
        for table in ["maps", "map_feature_types", "marker_types", "markers", "map_definitions"] {
            assert_eq!(count(&conn, table), 0, "{}", table);
        }
    }

    #[test]
    fn test_bad_position_aborts_with_its_row() {
        let dir = tempfile::tempdir().unwrap();
        let markers = "Marker\tType\tChromosome\tStart\tEnd\n11_10001\tSNP\t1H\tfar\t\n";
        let wb = workbook(dir.path(), &[("MAP", MAP), ("MARKERS", markers)]);
        let mut conn = setup_test_db();
        let mut ctx = StageContext::new(ImportConfig::default());

        let err = MarkerImporter::new()
            .import(&mut conn, &wb, &mut ctx)
            .unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::Parse);
        assert_eq!(err.sheet(), Some("MARKERS"));
        assert_eq!(err.row(), Some(1));
        assert_eq!(count(&conn, "map_definitions"), 0);
    }
}
