//! `ADDITIONAL_ATTRIBUTES` matrix of a passport workbook

use super::matrix::{MatrixCell, MatrixCells};
use super::sheets::ADDITIONAL_ATTRIBUTES;
use super::Workbook;
use crate::errors::TemplateError;
use crate::model::AttributeDatum;

/// Streams one [`AttributeDatum`] per non-empty cell
pub struct AttributeDataReader {
    cells: MatrixCells,
}

impl AttributeDataReader {
    pub fn open(workbook: &Workbook) -> Result<Self, TemplateError> {
        Ok(Self {
            cells: MatrixCells::open(workbook, ADDITIONAL_ATTRIBUTES, None, 1)?,
        })
    }

    fn parse(cell: MatrixCell) -> Result<AttributeDatum, TemplateError> {
        let accession = cell
            .labels
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| TemplateError::MissingValue {
                sheet: ADDITIONAL_ATTRIBUTES.to_string(),
                row: cell.row,
                field: "accession".to_string(),
            })?;

        Ok(AttributeDatum {
            accession,
            attribute: cell.column,
            value: cell.value,
        })
    }
}

impl Iterator for AttributeDataReader {
    type Item = Result<AttributeDatum, TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cells.next().map(|cell| cell.and_then(Self::parse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streams_attribute_cells() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ADDITIONAL_ATTRIBUTES.tsv"),
            "ACCENUMB\tRow type\tHabit\nACC-1\t2-row\twinter\nACC-2\t\tspring\n",
        )
        .unwrap();
        let wb = Workbook::open(dir.path()).unwrap();

        let data: Vec<_> = AttributeDataReader::open(&wb)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(
            data[2],
            AttributeDatum {
                accession: "ACC-2".to_string(),
                attribute: "Habit".to_string(),
                value: "spring".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_sheet() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("DATA.tsv"), "ACCENUMB\n").unwrap();
        let wb = Workbook::open(dir.path()).unwrap();

        assert!(matches!(
            AttributeDataReader::open(&wb),
            Err(TemplateError::MissingSheet { .. })
        ));
    }
}
