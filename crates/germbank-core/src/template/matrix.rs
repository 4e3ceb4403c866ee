//! Lazy traversal of data matrices
//!
//! A matrix sheet has a header row naming one entity per column (compounds,
//! phenotypes, attributes) from `label_cols` onwards; the leading columns
//! of every other row label it (accession identifier, rep, treatment). An
//! optional dates sheet of the same shape supplies the recording date of
//! each cell. Its rows must name the same accessions in the same order;
//! blank rows on either sheet are passed over.

use chrono::NaiveDate;
use csv::StringRecord;

use crate::errors::TemplateError;
use crate::template::values;
use crate::template::workbook::{cell, SheetStream, Workbook};

/// One non-empty value cell
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixCell {
    pub row: usize,
    pub col: usize,
    /// Leading label cells of the row
    pub labels: Vec<Option<String>>,
    /// Header of the cell's column
    pub column: String,
    pub value: String,
    pub recorded_on: Option<NaiveDate>,
}

struct CurrentRow {
    index: usize,
    data: StringRecord,
    dates: Option<StringRecord>,
    labels: Vec<Option<String>>,
}

/// Iterator over the non-empty value cells of a matrix, row-major
///
/// The `(row, col)` cursor only moves forward. When the column index runs
/// past the header or the end of a ragged row it wraps to the first value
/// column of the next row. Re-reading requires opening a new iterator.
pub struct MatrixCells {
    sheet: String,
    data: SheetStream,
    dates: Option<SheetStream>,
    header: Vec<Option<String>>,
    label_cols: usize,
    current: Option<CurrentRow>,
    col: usize,
}

impl MatrixCells {
    pub fn open(
        workbook: &Workbook,
        data_sheet: &str,
        dates_sheet: Option<&str>,
        label_cols: usize,
    ) -> Result<Self, TemplateError> {
        let mut data = workbook.stream(data_sheet)?;
        let header = match data.next().transpose()? {
            Some((_, record)) => record.iter().map(|c| values::text(Some(c))).collect(),
            None => Vec::new(),
        };

        let dates = match dates_sheet {
            Some(name) if workbook.has_sheet(name) => {
                let mut stream = workbook.stream(name)?;
                stream.next().transpose()?;
                Some(stream)
            }
            _ => None,
        };

        Ok(Self {
            sheet: data_sheet.to_string(),
            data,
            dates,
            header,
            label_cols,
            current: None,
            col: label_cols,
        })
    }

    /// Header cells naming the value columns
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.header
            .iter()
            .skip(self.label_cols)
            .filter_map(|c| c.as_deref())
    }

    /// Current `(row, col)` cursor position
    pub fn position(&self) -> (usize, usize) {
        (self.current.as_ref().map_or(0, |c| c.index), self.col)
    }

    fn advance_row(&mut self) -> Option<Result<(), TemplateError>> {
        let (index, data) = match next_filled(&mut self.data)? {
            Ok(next) => next,
            Err(e) => return Some(Err(e)),
        };
        // The dates sheet is read in lockstep; a shorter one yields no dates
        let dates = match self.dates.as_mut().and_then(next_filled) {
            Some(Ok((dates_row, record))) => {
                if cell(&record, 0) != cell(&data, 0) {
                    return Some(Err(TemplateError::InvalidCell {
                        sheet: self
                            .dates
                            .as_ref()
                            .map_or_else(String::new, |d| d.name().to_string()),
                        row: dates_row,
                        col: 0,
                        reason: format!(
                            "dates for {} do not line up with {} in row {} of {}",
                            cell(&record, 0).unwrap_or("an unnamed row"),
                            cell(&data, 0).unwrap_or("an unnamed row"),
                            index,
                            self.sheet
                        ),
                    }));
                }
                Some(record)
            }
            Some(Err(e)) => return Some(Err(e)),
            None => None,
        };
        let labels = (0..self.label_cols)
            .map(|c| cell(&data, c).map(str::to_string))
            .collect();

        self.current = Some(CurrentRow {
            index,
            data,
            dates,
            labels,
        });
        self.col = self.label_cols;
        Some(Ok(()))
    }
}

/// Next record holding at least one non-blank cell
fn next_filled(stream: &mut SheetStream) -> Option<Result<(usize, StringRecord), TemplateError>> {
    loop {
        match stream.next()? {
            Ok((_, record)) if record.iter().all(|c| c.trim().is_empty()) => continue,
            other => return Some(other),
        }
    }
}

impl Iterator for MatrixCells {
    type Item = Result<MatrixCell, TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(current) = &self.current else {
                if let Err(e) = self.advance_row()? {
                    return Some(Err(e));
                }
                continue;
            };

            let col = self.col;
            if col >= self.header.len() || col >= current.data.len() {
                self.current = None;
                continue;
            }
            self.col += 1;

            let Some(value) = cell(&current.data, col) else {
                continue;
            };
            let Some(column) = self.header[col].clone() else {
                return Some(Err(TemplateError::InvalidCell {
                    sheet: self.sheet.clone(),
                    row: current.index,
                    col,
                    reason: "value under a column without a header".to_string(),
                }));
            };

            return Some(Ok(MatrixCell {
                row: current.index,
                col,
                labels: current.labels.clone(),
                column,
                value: value.to_string(),
                recorded_on: current
                    .dates
                    .as_ref()
                    .and_then(|d| values::date(cell(d, col))),
            }));
        }
    }
}
