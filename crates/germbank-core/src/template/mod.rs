//! Template workbooks and the record readers over them
//!
//! Batch readers parse one sheet eagerly through [`BatchReader::read_all`].
//! Streaming readers are iterators of `Result<Record, TemplateError>` that
//! read their sheet lazily, one record per non-empty matrix cell or row.

pub mod attribute;
pub mod collaborator;
pub mod compound;
pub mod marker;
pub mod matrix;
pub mod metadata;
pub mod passport;
pub mod pedigree;
pub mod phenotype;
pub mod values;
pub mod workbook;

pub use attribute::AttributeDataReader;
pub use collaborator::CollaboratorReader;
pub use compound::{CompoundDataReader, CompoundReader};
pub use marker::{MapReader, MarkerReader};
pub use matrix::{MatrixCell, MatrixCells};
pub use metadata::MetadataReader;
pub use passport::PassportReader;
pub use pedigree::{PedigreeReader, PedigreeStringReader};
pub use phenotype::{PhenotypeDataReader, PhenotypeReader};
pub use workbook::{Columns, Row, Sheet, SheetStream, Workbook, DATA_SHEET};

use crate::errors::TemplateError;

/// Sheet names used by the templates
pub mod sheets {
    pub const METADATA: &str = "METADATA";
    pub const LOCATION: &str = "LOCATION";
    pub const COLLABORATORS: &str = "COLLABORATORS";
    pub const COMPOUNDS: &str = "COMPOUNDS";
    pub const PHENOTYPES: &str = "PHENOTYPES";
    pub const DATA: &str = super::DATA_SHEET;
    pub const RECORDING_DATES: &str = "RECORDING_DATES";
    pub const DATA_STRING: &str = "DATA-STRING";
    pub const ADDITIONAL_ATTRIBUTES: &str = "ADDITIONAL_ATTRIBUTES";
    pub const MAP: &str = "MAP";
    pub const MARKERS: &str = "MARKERS";
}

/// Reader that parses its whole sheet into memory
pub trait BatchReader {
    type Record;

    fn read_all(&self, workbook: &Workbook) -> Result<Vec<Self::Record>, TemplateError>;
}

/// Required text of a batch row, or a `MissingValue` naming the field
pub(crate) fn required(
    row: &Row<'_>,
    col: usize,
    sheet: &str,
    field: &str,
) -> Result<String, TemplateError> {
    row.get(col)
        .map(str::to_string)
        .ok_or_else(|| TemplateError::MissingValue {
            sheet: sheet.to_string(),
            row: row.index(),
            field: field.to_string(),
        })
}
