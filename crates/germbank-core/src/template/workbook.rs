//! Template workbooks
//!
//! A workbook is a directory with one tab-delimited file per sheet, named
//! `<SHEET>.tsv` or `<SHEET>.txt`. A single tab-delimited file opens as a
//! workbook whose only sheet is `DATA`; leading `#` lines in such a file
//! are comments.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::{StringRecord, StringRecordsIntoIter};

use crate::errors::TemplateError;

/// Sheet name of the single sheet of a plain tab-delimited file
pub const DATA_SHEET: &str = "DATA";

const SHEET_EXTENSIONS: [&str; 2] = ["tsv", "txt"];

#[derive(Debug, Clone)]
pub struct Workbook {
    path: PathBuf,
    sheets: BTreeMap<String, PathBuf>,
    comments: bool,
}

impl Workbook {
    /// Index the sheets of a workbook directory or wrap a single file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let io_err = |source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        };
        let metadata = fs::metadata(path).map_err(io_err)?;

        if metadata.is_file() {
            let mut sheets = BTreeMap::new();
            sheets.insert(DATA_SHEET.to_string(), path.to_path_buf());
            return Ok(Self {
                path: path.to_path_buf(),
                sheets,
                comments: true,
            });
        }

        let mut sheets: BTreeMap<String, PathBuf> = BTreeMap::new();
        for entry in fs::read_dir(path).map_err(io_err)? {
            let file = entry.map_err(io_err)?.path();
            if !file.is_file() {
                continue;
            }
            let extension = file.extension().and_then(OsStr::to_str);
            let Some(extension) = extension.filter(|e| SHEET_EXTENSIONS.contains(e)) else {
                continue;
            };
            let Some(stem) = file.file_stem().and_then(OsStr::to_str) else {
                continue;
            };
            // .tsv wins over .txt when both exist
            if extension == "tsv" || !sheets.contains_key(stem) {
                sheets.insert(stem.to_string(), file.clone());
            }
        }

        if sheets.is_empty() {
            return Err(TemplateError::NotAWorkbook {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            sheets,
            comments: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sheet names in sorted order
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.keys().map(String::as_str).collect()
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheets.contains_key(name)
    }

    fn reader(&self, name: &str) -> Result<csv::Reader<File>, TemplateError> {
        let file = self
            .sheets
            .get(name)
            .ok_or_else(|| TemplateError::MissingSheet {
                sheet: name.to_string(),
            })?;

        csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .comment(self.comments.then_some(b'#'))
            .from_path(file)
            .map_err(|e| match e.into_kind() {
                csv::ErrorKind::Io(source) => TemplateError::Io {
                    path: file.clone(),
                    source,
                },
                other => TemplateError::Malformed {
                    sheet: name.to_string(),
                    message: format!("{:?}", other),
                },
            })
    }

    /// Parse a required sheet eagerly
    pub fn sheet(&self, name: &str) -> Result<Sheet, TemplateError> {
        let rows = self
            .reader(name)?
            .into_records()
            .map(|record| {
                record
                    .map(|r| r.iter().map(str::to_string).collect::<Vec<_>>())
                    .map_err(|e| TemplateError::malformed(name, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Sheet {
            name: name.to_string(),
            rows,
        })
    }

    /// Parse a sheet eagerly if the workbook has it
    pub fn optional_sheet(&self, name: &str) -> Result<Option<Sheet>, TemplateError> {
        if self.has_sheet(name) {
            self.sheet(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Open a sheet for lazy, record-at-a-time reading
    pub fn stream(&self, name: &str) -> Result<SheetStream, TemplateError> {
        Ok(SheetStream {
            name: name.to_string(),
            records: self.reader(name)?.into_records(),
            row: 0,
        })
    }
}

/// Trimmed cell text of a record, `None` when empty or absent
pub fn cell(record: &StringRecord, col: usize) -> Option<&str> {
    record.get(col).map(str::trim).filter(|s| !s.is_empty())
}

/// A sheet parsed into memory
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Trimmed cell text, `None` when empty or outside the sheet
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Column index by header name, looked up in row 0
    pub fn columns(&self) -> Columns {
        Columns::from_cells(self.rows.first().into_iter().flatten().map(String::as_str))
    }

    /// Rows after the header that hold at least one value
    pub fn data_rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(index, cells)| Row { index, cells })
            .filter(|row| !row.is_blank())
    }
}

/// Borrowed view of one sheet row
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    index: usize,
    cells: &'a [String],
}

impl<'a> Row<'a> {
    /// Zero-based row index within the sheet
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, col: usize) -> Option<&'a str> {
        self.cells
            .get(col)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn named(&self, columns: &Columns, name: &str) -> Option<&'a str> {
        columns.index(name).and_then(|col| self.get(col))
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

/// Header name → column index
#[derive(Debug, Clone, Default)]
pub struct Columns(HashMap<String, usize>);

impl Columns {
    pub fn from_cells<'a>(cells: impl IntoIterator<Item = &'a str>) -> Self {
        let mut map = HashMap::new();
        for (i, name) in cells.into_iter().enumerate() {
            let name = name.trim();
            if !name.is_empty() {
                map.entry(name.to_string()).or_insert(i);
            }
        }
        Columns(map)
    }

    pub fn index(&self, name: &str) -> Option<usize> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
}

/// Lazily read records of one sheet, numbered from row 0
pub struct SheetStream {
    name: String,
    records: StringRecordsIntoIter<File>,
    row: usize,
}

impl SheetStream {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Iterator for SheetStream {
    type Item = Result<(usize, StringRecord), TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        let row = self.row;
        self.row += 1;
        Some(
            record
                .map(|r| (row, r))
                .map_err(|e| TemplateError::malformed(&self.name, e)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_sheet(dir: &Path, file: &str, content: &str) {
        let mut f = File::create(dir.join(file)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_open_directory_indexes_sheets() {
        let dir = tempfile::tempdir().unwrap();
        write_sheet(dir.path(), "METADATA.tsv", "a\tb\n");
        write_sheet(dir.path(), "DATA.txt", "x\n");
        write_sheet(dir.path(), "notes.md", "ignored");

        let wb = Workbook::open(dir.path()).unwrap();
        assert_eq!(wb.sheet_names(), vec!["DATA", "METADATA"]);
        assert!(!wb.has_sheet("notes"));
    }

    #[test]
    fn test_tsv_preferred_over_txt() {
        let dir = tempfile::tempdir().unwrap();
        write_sheet(dir.path(), "DATA.txt", "from-txt\n");
        write_sheet(dir.path(), "DATA.tsv", "from-tsv\n");

        let wb = Workbook::open(dir.path()).unwrap();
        let sheet = wb.sheet("DATA").unwrap();
        assert_eq!(sheet.cell(0, 0), Some("from-tsv"));
    }

    #[test]
    fn test_empty_directory_is_not_a_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let err = Workbook::open(dir.path()).unwrap_err();
        assert!(matches!(err, TemplateError::NotAWorkbook { .. }));
    }

    #[test]
    fn test_missing_sheet() {
        let dir = tempfile::tempdir().unwrap();
        write_sheet(dir.path(), "DATA.tsv", "x\n");
        let wb = Workbook::open(dir.path()).unwrap();

        let err = wb.sheet("COMPOUNDS").unwrap_err();
        assert!(matches!(err, TemplateError::MissingSheet { sheet } if sheet == "COMPOUNDS"));
        assert!(wb.optional_sheet("LOCATION").unwrap().is_none());
    }

    #[test]
    fn test_single_file_skips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("passport.txt");
        std::fs::write(&file, "# MCPD v2.1\n#\nACCENUMB\tGENUS\nA1\tHordeum\n").unwrap();

        let wb = Workbook::open(&file).unwrap();
        assert_eq!(wb.sheet_names(), vec![DATA_SHEET]);
        let sheet = wb.sheet(DATA_SHEET).unwrap();
        assert_eq!(sheet.columns().index("GENUS"), Some(1));
        assert_eq!(sheet.cell(1, 0), Some("A1"));
    }

    #[test]
    fn test_ragged_rows_and_blank_cells() {
        let dir = tempfile::tempdir().unwrap();
        write_sheet(dir.path(), "DATA.tsv", "h1\th2\th3\nv1\n\t  \t\nv2\t\tv3\n");
        let sheet = Workbook::open(dir.path()).unwrap().sheet("DATA").unwrap();

        let rows: Vec<_> = sheet.data_rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(1), None);
        assert_eq!(rows[1].index(), 3);
        assert_eq!(rows[1].get(2), Some("v3"));
    }

    #[test]
    fn test_stream_numbers_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_sheet(dir.path(), "DATA.tsv", "h\na\nb\n");
        let wb = Workbook::open(dir.path()).unwrap();

        let rows: Vec<usize> = wb
            .stream("DATA")
            .unwrap()
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }
}
