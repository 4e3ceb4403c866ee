//! `PHENOTYPES` sheet and the trials `DATA` matrix

use super::matrix::{MatrixCell, MatrixCells};
use super::sheets::{DATA, PHENOTYPES, RECORDING_DATES};
use super::values::text;
use super::{required, BatchReader, Workbook};
use crate::errors::TemplateError;
use crate::model::{Phenotype, PhenotypeDatum, Unit};

/// Columns before the first phenotype: accession, rep, treatment
const LABEL_COLS: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct PhenotypeReader;

impl BatchReader for PhenotypeReader {
    type Record = Phenotype;

    fn read_all(&self, workbook: &Workbook) -> Result<Vec<Phenotype>, TemplateError> {
        let sheet = workbook.sheet(PHENOTYPES)?;

        sheet
            .data_rows()
            .map(|row| {
                Ok(Phenotype {
                    name: required(&row, 0, PHENOTYPES, "name")?,
                    short_name: text(row.get(1)),
                    description: text(row.get(2)),
                    data_type: text(row.get(3)),
                    unit: text(row.get(4)).map(|name| Unit {
                        name,
                        abbreviation: text(row.get(5)),
                        description: text(row.get(6)),
                    }),
                })
            })
            .collect()
    }
}

/// Streams one [`PhenotypeDatum`] per non-empty trials `DATA` cell
pub struct PhenotypeDataReader {
    cells: MatrixCells,
}

impl PhenotypeDataReader {
    pub fn open(workbook: &Workbook) -> Result<Self, TemplateError> {
        Ok(Self {
            cells: MatrixCells::open(workbook, DATA, Some(RECORDING_DATES), LABEL_COLS)?,
        })
    }

    fn parse(cell: MatrixCell) -> Result<PhenotypeDatum, TemplateError> {
        let mut labels = cell.labels.into_iter();
        let accession = labels
            .next()
            .flatten()
            .ok_or_else(|| TemplateError::MissingValue {
                sheet: DATA.to_string(),
                row: cell.row,
                field: "accession".to_string(),
            })?;

        Ok(PhenotypeDatum {
            accession,
            rep: labels.next().flatten(),
            treatment: labels.next().flatten(),
            phenotype: cell.column,
            value: cell.value,
            recording_date: cell.recorded_on,
        })
    }
}

impl Iterator for PhenotypeDataReader {
    type Item = Result<PhenotypeDatum, TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cells.next().map(|cell| cell.and_then(Self::parse))
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
    fn test_reads_phenotypes() {
        let (_dir, wb) = workbook(&[(
            "PHENOTYPES",
            "Name\tShort\tDesc\tType\tUnit\tAbbr\tUnitDesc\n\
             Plant height\tPH\tHeight at maturity\tnumeric\tcentimeter\tcm\t\n\
             Awn colour\t\t\tcategorical\t\t\t\n",
        )]);

        let phenotypes = PhenotypeReader.read_all(&wb).unwrap();
        assert_eq!(phenotypes.len(), 2);
        assert_eq!(phenotypes[0].short_name.as_deref(), Some("PH"));
        assert_eq!(phenotypes[0].unit.as_ref().map(|u| u.name.as_str()), Some("centimeter"));
        assert!(phenotypes[1].unit.is_none());
    }

    #[test]
    fn test_streams_trial_cells_with_rep_and_treatment() {
        let (_dir, wb) = workbook(&[
            (
                "DATA",
                "Accession\tRep\tTreatment\tPlant height\tAwn colour\n\
                 A1\t1\tirrigated\t95\tblack\n\
                 A1\t2\t\t\twhite\n",
            ),
            (
                "RECORDING_DATES",
                "Accession\tRep\tTreatment\tPlant height\tAwn colour\n\
                 A1\t1\tirrigated\t2015-08-01\t\n",
            ),
        ]);

        let data: Vec<_> = PhenotypeDataReader::open(&wb)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(data.len(), 3);

        assert_eq!(data[0].rep.as_deref(), Some("1"));
        assert_eq!(data[0].treatment.as_deref(), Some("irrigated"));
        assert!(data[0].recording_date.is_some());
        assert_eq!(data[1].value, "black");
        assert!(data[1].recording_date.is_none());

        assert_eq!(data[2].rep.as_deref(), Some("2"));
        assert_eq!(data[2].treatment, None);
        assert!(data[2].recording_date.is_none());
    }

    #[test]
    fn test_missing_accession_is_reported() {
        let (_dir, wb) = workbook(&[("DATA", "Accession\tRep\tTreatment\tPH\n\t1\t\t5\n")]);
        let first = PhenotypeDataReader::open(&wb).unwrap().next().unwrap();
        assert!(matches!(first, Err(TemplateError::MissingValue { row: 1, .. })));
    }
}
