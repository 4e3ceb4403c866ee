use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the structured error facility
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure an import run can surface is classified by one of these
/// kinds. Each kind maps to a stable error code used by the CLI, by
/// structured log events and by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Template reading
    Parse,
    MissingSheet,

    // Resolution / validation
    UnresolvedReference,
    InvalidInput,

    // Store
    Persistence,
    Rollback,

    // Infrastructure
    Config,
    Io,
    Serialization,
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Parse => "ERR_PARSE",
            ExErrorKind::MissingSheet => "ERR_MISSING_SHEET",
            ExErrorKind::UnresolvedReference => "ERR_UNRESOLVED_REFERENCE",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Rollback => "ERR_ROLLBACK",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification plus the context an operator needs to act on
/// a failed import: the operation, the table and natural key involved, and
/// the template position when the failure came from a reader.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    table: Option<String>,
    natural_key: Option<String>,
    sheet: Option<String>,
    row: Option<usize>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            table: None,
            natural_key: None,
            sheet: None,
            row: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the table the failure concerns
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add the natural key that could not be resolved or written
    pub fn with_natural_key(mut self, key: impl Into<String>) -> Self {
        self.natural_key = Some(key.into());
        self
    }

    /// Add template sheet context
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    /// Add template row context (zero-based)
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn natural_key(&self) -> Option<&str> {
        self.natural_key.as_deref()
    }

    pub fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    pub fn row(&self) -> Option<usize> {
        self.row
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(table) = &self.table {
            write!(f, " (table: {})", table)?;
        }
        if let Some(key) = &self.natural_key {
            write!(f, " (key: {})", key)?;
        }
        match (&self.sheet, self.row) {
            (Some(sheet), Some(row)) => write!(f, " (sheet: {}, row: {})", sheet, row)?,
            (Some(sheet), None) => write!(f, " (sheet: {})", sheet)?,
            _ => {}
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Failures raised while opening or reading a template workbook
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The template path could not be read
    #[error("Cannot read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The path is neither a sheet directory nor a tab-delimited file
    #[error("Not a template workbook: {path}")]
    NotAWorkbook { path: PathBuf },

    /// A structurally required sheet is absent
    #[error("Required sheet missing: {sheet}")]
    MissingSheet { sheet: String },

    /// A required header column is absent
    #[error("Sheet {sheet} has no column named {column}")]
    MissingColumn { sheet: String, column: String },

    /// The tab-delimited text of a sheet is malformed
    #[error("Malformed sheet {sheet}: {message}")]
    Malformed { sheet: String, message: String },

    /// A cell holds a value of the wrong shape
    #[error("Invalid value in sheet {sheet} at row {row}, column {col}: {reason}")]
    InvalidCell {
        sheet: String,
        row: usize,
        col: usize,
        reason: String,
    },

    /// A required cell is empty
    #[error("Missing value for {field} in sheet {sheet} at row {row}")]
    MissingValue {
        sheet: String,
        row: usize,
        field: String,
    },
}

impl TemplateError {
    pub(crate) fn malformed(sheet: &str, err: csv::Error) -> Self {
        TemplateError::Malformed {
            sheet: sheet.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<TemplateError> for ExError {
    fn from(err: TemplateError) -> Self {
        let message = err.to_string();
        match err {
            TemplateError::Io { .. } => ExError::new(ExErrorKind::Io)
                .with_op("open_template")
                .with_message(message),

            TemplateError::NotAWorkbook { .. } => ExError::new(ExErrorKind::Parse)
                .with_op("open_template")
                .with_message(message),

            TemplateError::MissingSheet { sheet } => ExError::new(ExErrorKind::MissingSheet)
                .with_sheet(sheet)
                .with_message(message),

            TemplateError::MissingColumn { sheet, .. } | TemplateError::Malformed { sheet, .. } => {
                ExError::new(ExErrorKind::Parse)
                    .with_sheet(sheet)
                    .with_message(message)
            }

            TemplateError::InvalidCell { sheet, row, .. } => ExError::new(ExErrorKind::Parse)
                .with_sheet(sheet)
                .with_row(row)
                .with_message(message),

            // An empty required cell is a data problem, not a layout problem
            TemplateError::MissingValue { sheet, row, .. } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_sheet(sheet)
                    .with_row(row)
                    .with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        ExError::new(ExErrorKind::Serialization).with_message(err.to_string())
    }
}
