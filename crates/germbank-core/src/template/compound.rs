//! `COMPOUNDS` sheet and the compound `DATA` matrix

use super::matrix::{MatrixCell, MatrixCells};
use super::sheets::{COMPOUNDS, DATA, RECORDING_DATES};
use super::values::{float, text};
use super::{required, BatchReader, Workbook};
use crate::errors::TemplateError;
use crate::model::{Compound, CompoundDatum, Unit};

#[derive(Debug, Clone, Copy, Default)]
pub struct CompoundReader;

impl BatchReader for CompoundReader {
    type Record = Compound;

    fn read_all(&self, workbook: &Workbook) -> Result<Vec<Compound>, TemplateError> {
        let sheet = workbook.sheet(COMPOUNDS)?;

        sheet
            .data_rows()
            .map(|row| {
                Ok(Compound {
                    name: required(&row, 0, COMPOUNDS, "name")?,
                    description: text(row.get(1)),
                    molecular_formula: text(row.get(2)),
                    monoisotopic_mass: float(row.get(3)),
                    average_mass: float(row.get(4)),
                    compound_class: text(row.get(5)),
                    unit: text(row.get(6)).map(|name| Unit {
                        name,
                        abbreviation: text(row.get(7)),
                        description: text(row.get(8)),
                    }),
                })
            })
            .collect()
    }
}

/// Streams one [`CompoundDatum`] per non-empty `DATA` cell
pub struct CompoundDataReader {
    cells: MatrixCells,
}

impl CompoundDataReader {
    pub fn open(workbook: &Workbook) -> Result<Self, TemplateError> {
        Ok(Self {
            cells: MatrixCells::open(workbook, DATA, Some(RECORDING_DATES), 1)?,
        })
    }

    fn parse(cell: MatrixCell) -> Result<CompoundDatum, TemplateError> {
        let accession = cell
            .labels
            .first()
            .cloned()
            .flatten()
            .ok_or_else(|| TemplateError::MissingValue {
                sheet: DATA.to_string(),
                row: cell.row,
                field: "accession".to_string(),
            })?;
        let value = cell
            .value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| TemplateError::InvalidCell {
                sheet: DATA.to_string(),
                row: cell.row,
                col: cell.col,
                reason: format!("'{}' is not a number", cell.value),
            })?;

        Ok(CompoundDatum {
            accession,
            compound: cell.column,
            value,
            recording_date: cell.recorded_on,
        })
    }
}

impl Iterator for CompoundDataReader {
    type Item = Result<CompoundDatum, TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cells.next().map(|cell| cell.and_then(Self::parse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn workbook(sheets: &[(&str, &str)]) -> (tempfile::TempDir, Workbook) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in sheets {
            std::fs::write(dir.path().join(format!("{}.tsv", name)), content).unwrap();
        }
        let wb = Workbook::open(dir.path()).unwrap();
        (dir, wb)
    }

    #[test]
    fn test_reads_compounds_with_units() {
        let (_dir, wb) = workbook(&[(
            "COMPOUNDS",
            "Name\tDesc\tFormula\tMono\tAvg\tClass\tUnit\tAbbr\tUnitDesc\n\
             Caffeine\tstimulant\tC8H10N4O2\t194.08\t194.19\talkaloid\tmilligram\tmg\t\n\
             Water\t\tH2O\t\t\t\t\t\t\n",
        )]);

        let compounds = CompoundReader.read_all(&wb).unwrap();
        assert_eq!(compounds.len(), 2);
        assert_eq!(compounds[0].monoisotopic_mass, Some(194.08));
        assert_eq!(compounds[0].unit.as_ref().unwrap().abbreviation.as_deref(), Some("mg"));
        assert!(compounds[1].unit.is_none());
    }

    #[test]
    fn test_compound_without_name_fails() {
        let (_dir, wb) = workbook(&[("COMPOUNDS", "Name\tDesc\n\tno name\n")]);
        let err = CompoundReader.read_all(&wb).unwrap_err();
        assert!(matches!(err, TemplateError::MissingValue { row: 1, .. }));
    }

    #[test]
    fn test_streams_compound_data() {
        let (_dir, wb) = workbook(&[
            ("DATA", "Accession\tCaffeine\tWater\nA1\t1.5\t\nA2\t\t0.25\n"),
            ("RECORDING_DATES", "Accession\tCaffeine\tWater\nA1\t20150623\t\nA2\t\t\n"),
        ]);

        let data: Vec<_> = CompoundDataReader::open(&wb)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].accession, "A1");
        assert_eq!(data[0].compound, "Caffeine");
        assert_eq!(data[0].recording_date, NaiveDate::from_ymd_opt(2015, 6, 23));
        assert_eq!(data[1].value, 0.25);
        assert_eq!(data[1].recording_date, None);
    }

    #[test]
    fn test_non_numeric_value_surfaces_on_its_record() {
        let (_dir, wb) = workbook(&[("DATA", "Accession\tCaffeine\nA1\tlots\nA2\t2\n")]);
        let results: Vec<_> = CompoundDataReader::open(&wb).unwrap().collect();

        assert!(matches!(results[0], Err(TemplateError::InvalidCell { row: 1, col: 1, .. })));
        assert!(results[1].is_ok());
    }
}
