//! `MAP` and `MARKERS` sheets of a genotype template

use super::sheets::{MAP, MARKERS};
use super::values::text;
use super::workbook::{cell, SheetStream};
use super::{required, BatchReader, Workbook};
use crate::errors::TemplateError;
use crate::model::{GeneticMap, MapDefinition};

/// Chromosome of a marker placed on no chromosome
pub const UNKNOWN_CHROMOSOME: &str = "UNK";

/// Reads the map the markers are placed on
///
/// Row layout: map name, description, feature type. A sheet without a
/// named map is a `MissingValue`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapReader;

impl BatchReader for MapReader {
    type Record = GeneticMap;

    fn read_all(&self, workbook: &Workbook) -> Result<Vec<GeneticMap>, TemplateError> {
        let sheet = workbook.sheet(MAP)?;

        let maps = sheet
            .data_rows()
            .map(|row| {
                Ok(GeneticMap {
                    name: required(&row, 0, MAP, "map")?,
                    description: text(row.get(1)),
                    feature_type: text(row.get(2)),
                })
            })
            .collect::<Result<Vec<_>, TemplateError>>()?;

        if maps.is_empty() {
            return Err(TemplateError::MissingValue {
                sheet: MAP.to_string(),
                row: 1,
                field: "map".to_string(),
            });
        }
        Ok(maps)
    }
}

/// Streams one [`MapDefinition`] per `MARKERS` row
///
/// Row layout: marker name, marker type, chromosome, start, end. A missing
/// chromosome reads as [`UNKNOWN_CHROMOSOME`], a missing start as the row
/// index and a missing end as the start.
pub struct MarkerReader {
    rows: SheetStream,
}

impl MarkerReader {
    pub fn open(workbook: &Workbook) -> Result<Self, TemplateError> {
        let mut rows = workbook.stream(MARKERS)?;
        rows.next().transpose()?;
        Ok(Self { rows })
    }
}

fn position(raw: Option<&str>, row: usize, col: usize) -> Result<Option<f64>, TemplateError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| TemplateError::InvalidCell {
            sheet: MARKERS.to_string(),
            row,
            col,
            reason: format!("'{}' is not a map position", raw),
        })
}

impl Iterator for MarkerReader {
    type Item = Result<MapDefinition, TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (row, record) = match self.rows.next()? {
                Ok(next) => next,
                Err(e) => return Some(Err(e)),
            };
            if record.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            let Some(marker) = cell(&record, 0) else {
                return Some(Err(TemplateError::MissingValue {
                    sheet: MARKERS.to_string(),
                    row,
                    field: "marker".to_string(),
                }));
            };

            let placed = position(cell(&record, 3), row, 3).and_then(|start| {
                let start = start.unwrap_or(row as f64);
                Ok((start, position(cell(&record, 4), row, 4)?.unwrap_or(start)))
            });
            return Some(placed.map(|(start, end)| MapDefinition {
                marker: marker.to_string(),
                marker_type: text(record.get(1)),
                chromosome: cell(&record, 2).unwrap_or(UNKNOWN_CHROMOSOME).to_string(),
                start,
                end,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook(sheets: &[(&str, &str)]) -> (tempfile::TempDir, Workbook) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in sheets {
            std::fs::write(dir.path().join(format!("{}.tsv", name)), content).unwrap();
        }
        let wb = Workbook::open(dir.path()).unwrap();
        (dir, wb)
    }

    #[test]
    fn test_reads_map() {
        let (_dir, wb) = workbook(&[(
            "MAP",
            "Name\tDescription\tFeature type\nBarley consensus\t2011 consensus\tSNP\n",
        )]);
        let maps = MapReader.read_all(&wb).unwrap();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].name, "Barley consensus");
        assert_eq!(maps[0].feature_type.as_deref(), Some("SNP"));
    }

    #[test]
    fn test_map_sheet_without_map_fails() {
        let (_dir, wb) = workbook(&[("MAP", "Name\tDescription\tFeature type\n")]);
        let err = MapReader.read_all(&wb).unwrap_err();
        assert!(matches!(err, TemplateError::MissingValue { ref field, .. } if field == "map"));
    }

    #[test]
    fn test_streams_markers_with_defaults() {
        let (_dir, wb) = workbook(&[(
            "MARKERS",
            "Marker\tType\tChromosome\tStart\tEnd\n\
             11_10001\tSNP\t1H\t12.5\t\n\
             \t\t\t\t\n\
             11_10002\t\t\t\t\n\
             11_10003\tSNP\t2H\t3\t4.5\n",
        )]);

        let markers: Vec<_> = MarkerReader::open(&wb)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0].start, 12.5);
        assert_eq!(markers[0].end, 12.5);
        assert_eq!(markers[1].marker, "11_10002");
        assert_eq!(markers[1].marker_type, None);
        assert_eq!(markers[1].chromosome, UNKNOWN_CHROMOSOME);
        assert_eq!(markers[1].start, 3.0);
        assert_eq!(markers[2].end, 4.5);
    }

    #[test]
    fn test_bad_position_and_missing_marker_surface_per_row() {
        let (_dir, wb) = workbook(&[(
            "MARKERS",
            "Marker\tType\tChromosome\tStart\tEnd\n\
             11_10001\tSNP\t1H\tfar\t\n\
             \tSNP\t1H\t1\t1\n\
             11_10003\tSNP\t1H\t1\t1\n",
        )]);
        let results: Vec<_> = MarkerReader::open(&wb).unwrap().collect();

        assert!(matches!(results[0], Err(TemplateError::InvalidCell { row: 1, col: 3, .. })));
        assert!(
            matches!(results[1], Err(TemplateError::MissingValue { row: 2, ref field, .. }) if field == "marker")
        );
        assert!(results[2].is_ok());
    }
}
