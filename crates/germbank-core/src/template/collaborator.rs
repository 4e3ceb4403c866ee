//! `COLLABORATORS` sheet

use super::sheets::COLLABORATORS;
use super::values::text;
use super::{BatchReader, Workbook};
use crate::errors::TemplateError;
use crate::model::{Collaborator, CountryCode, Institution};

#[derive(Debug, Clone, Copy, Default)]
pub struct CollaboratorReader;

impl BatchReader for CollaboratorReader {
    type Record = Collaborator;

    /// Rows naming neither a first nor a last name are dropped
    fn read_all(&self, workbook: &Workbook) -> Result<Vec<Collaborator>, TemplateError> {
        let sheet = workbook.sheet(COLLABORATORS)?;

        let collaborators = sheet
            .data_rows()
            .map(|row| {
                let institution = text(row.get(4)).map(|name| Institution {
                    code: None,
                    name: Some(name),
                    acronym: None,
                    address: text(row.get(5)),
                    country: text(row.get(6)).map(CountryCode::Alpha2),
                });
                Collaborator {
                    last_name: text(row.get(0)),
                    first_name: text(row.get(1)),
                    email: text(row.get(2)),
                    phone: text(row.get(3)),
                    institution,
                }
            })
            .filter(|c| c.first_name.is_some() || c.last_name.is_some())
            .collect();

        Ok(collaborators)
    }
}
