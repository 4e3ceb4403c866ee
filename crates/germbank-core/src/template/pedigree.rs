//! Pedigree `DATA` and `DATA-STRING` sheets

use std::collections::VecDeque;

use super::sheets::{DATA, DATA_STRING};
use super::values::text;
use super::workbook::{cell, SheetStream};
use super::{required, BatchReader, Workbook};
use crate::errors::TemplateError;
use crate::model::{Pedigree, PedigreeDefinition, PedigreeDescription};

fn description(name: Option<String>, author: Option<String>) -> Option<PedigreeDescription> {
    name.map(|name| PedigreeDescription {
        description: Some(name.clone()),
        name,
        author,
    })
}

/// Streams pedigree links, one per non-empty parent cell
///
/// Row layout: accession, parent 1, parent 2, relationship description,
/// pedigree description name, author. A row naming no parent is a
/// `MissingValue`; rows of empty cells are passed over.
pub struct PedigreeReader {
    rows: SheetStream,
    pending: VecDeque<Pedigree>,
}

impl PedigreeReader {
    pub fn open(workbook: &Workbook) -> Result<Self, TemplateError> {
        let mut rows = workbook.stream(DATA)?;
        rows.next().transpose()?;
        Ok(Self {
            rows,
            pending: VecDeque::with_capacity(2),
        })
    }
}

impl Iterator for PedigreeReader {
    type Item = Result<Pedigree, TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pedigree) = self.pending.pop_front() {
                return Some(Ok(pedigree));
            }

            let (row, record) = match self.rows.next()? {
                Ok(next) => next,
                Err(e) => return Some(Err(e)),
            };
            if record.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            let Some(accession) = cell(&record, 0) else {
                return Some(Err(TemplateError::MissingValue {
                    sheet: DATA.to_string(),
                    row,
                    field: "accession".to_string(),
                }));
            };

            let parents: Vec<&str> = [1, 2].iter().filter_map(|&c| cell(&record, c)).collect();
            if parents.is_empty() {
                return Some(Err(TemplateError::MissingValue {
                    sheet: DATA.to_string(),
                    row,
                    field: "parent".to_string(),
                }));
            }

            let relationship_description = text(record.get(3));
            let desc = description(text(record.get(4)), text(record.get(5)));
            self.pending.extend(parents.into_iter().map(|parent| Pedigree {
                accession: accession.to_string(),
                parent: parent.to_string(),
                relationship_description: relationship_description.clone(),
                description: desc.clone(),
            }));
        }
    }
}

/// Reads pedigree strings
///
/// Row layout: accession, definition, notation, pedigree description name,
/// author.
#[derive(Debug, Clone, Copy, Default)]
pub struct PedigreeStringReader;

impl BatchReader for PedigreeStringReader {
    type Record = PedigreeDefinition;

    fn read_all(&self, workbook: &Workbook) -> Result<Vec<PedigreeDefinition>, TemplateError> {
        let sheet = workbook.sheet(DATA_STRING)?;

        sheet
            .data_rows()
            .map(|row| {
                Ok(PedigreeDefinition {
                    accession: required(&row, 0, DATA_STRING, "accession")?,
                    definition: required(&row, 1, DATA_STRING, "definition")?,
                    notation: required(&row, 2, DATA_STRING, "notation")?,
                    description: description(text(row.get(3)), text(row.get(4))),
                })
            })
            .collect()
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
    fn test_one_pedigree_per_parent() {
        let (_dir, wb) = workbook(&[(
            "DATA",
            "Accession\tParent 1\tParent 2\tRelationship\tDescription\tAuthor\n\
             C1\tP1\tP2\tcross\tGermplasm list\tJ. Doe\n\
             C2\tP3\t\t\t\t\n\
             \t\t\t\t\t\n",
        )]);

        let pedigrees: Vec<_> = PedigreeReader::open(&wb)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(pedigrees.len(), 3);
        assert_eq!(pedigrees[0].parent, "P1");
        assert_eq!(pedigrees[1].parent, "P2");
        assert_eq!(pedigrees[1].relationship_description.as_deref(), Some("cross"));
        let desc = pedigrees[0].description.as_ref().unwrap();
        assert_eq!(desc.name, "Germplasm list");
        assert_eq!(desc.author.as_deref(), Some("J. Doe"));
        assert_eq!(pedigrees[2].accession, "C2");
        assert!(pedigrees[2].description.is_none());
    }

    #[test]
    fn test_parent_without_accession_fails() {
        let (_dir, wb) = workbook(&[("DATA", "Accession\tParent 1\n\tP1\n")]);
        let first = PedigreeReader::open(&wb).unwrap().next().unwrap();
        assert!(matches!(first, Err(TemplateError::MissingValue { row: 1, .. })));
    }

    #[test]
    fn test_row_without_parents_fails() {
        let (_dir, wb) = workbook(&[(
            "DATA",
            "Accession\tParent 1\tParent 2\tRelationship\tDescription\tAuthor\n\
             A1\t\t\tcross\tx\ty\n\
             A2\tA1\t\t\t\t\n",
        )]);

        let mut reader = PedigreeReader::open(&wb).unwrap();
        let first = reader.next().unwrap();
        assert!(matches!(
            first,
            Err(TemplateError::MissingValue { row: 1, ref field, .. }) if field == "parent"
        ));
        assert_eq!(reader.next().unwrap().unwrap().accession, "A2");
    }

    #[test]
    fn test_reads_pedigree_strings() {
        let (_dir, wb) = workbook(&[(
            "DATA-STRING",
            "Accession\tDefinition\tNotation\tDescription\tAuthor\n\
             C1\tP1/P2\tPurdy\t\t\n",
        )]);

        let definitions = PedigreeStringReader.read_all(&wb).unwrap();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].definition, "P1/P2");
        assert_eq!(definitions[0].notation, "Purdy");
    }

    #[test]
    fn test_empty_definition_is_invalid() {
        let (_dir, wb) = workbook(&[("DATA-STRING", "Accession\tDefinition\tNotation\nC1\t\tPurdy\n")]);
        let err = PedigreeStringReader.read_all(&wb).unwrap_err();
        assert!(matches!(err, TemplateError::MissingValue { ref field, .. } if field == "definition"));
    }
}
