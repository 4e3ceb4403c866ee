//! The generic importer run loop
//!
//! Every importer drives its reader's records through a [`RecordSink`]:
//! the sink maps a record to rows, resolves its references and writes or
//! buffers them. The loop owns the state machine and the handling of
//! unresolved references.

#![allow(clippy::result_large_err)]

use std::collections::BTreeMap;

use germbank_core::errors::{ExError, ExErrorKind};
use germbank_core::TemplateError;
use germbank_store::errors::Result;
use germbank_store::{RollbackTracker, Table, UnresolvedPolicy};
use rusqlite::Connection;
use serde::Serialize;

/// Where an importer run is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportState {
    Init,
    Read,
    Write,
    Flush,
    Done,
    Failed,
}

/// Maps records to rows and writes them
pub trait RecordSink {
    type Record;

    /// Resolve and write or buffer one record
    ///
    /// # Errors
    ///
    /// `ERR_UNRESOLVED_REFERENCE` when a subject entity is missing; any
    /// other error aborts the run.
    fn accept(&mut self, conn: &mut Connection, record: Self::Record) -> Result<()>;

    /// Flush whatever is still buffered
    ///
    /// # Errors
    ///
    /// `ERR_PERSISTENCE` when the final flush fails.
    fn finish(&mut self, conn: &mut Connection) -> Result<()>;
}

/// A record dropped under [`UnresolvedPolicy::Skip`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub table: Option<String>,
    pub natural_key: Option<String>,
    pub message: String,
}

impl From<&ExError> for SkippedRecord {
    fn from(err: &ExError) -> Self {
        Self {
            table: err.table().map(str::to_string),
            natural_key: err.natural_key().map(str::to_string),
            message: err.message().to_string(),
        }
    }
}

/// Progress of one run through the state machine
#[derive(Debug, Clone)]
pub struct ImportRun {
    state: ImportState,
    records: usize,
    skipped: Vec<SkippedRecord>,
}

impl Default for ImportRun {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportRun {
    pub fn new() -> Self {
        Self {
            state: ImportState::Init,
            records: 0,
            skipped: Vec::new(),
        }
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    /// Records read, including skipped ones
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    fn enter(&mut self, state: ImportState) {
        if self.state != state {
            tracing::trace!(from = ?self.state, to = ?state, "Import state change");
            self.state = state;
        }
    }

    fn fail(&mut self, err: ExError) -> ExError {
        self.enter(ImportState::Failed);
        err
    }

    /// Drive records into the sink, then flush it
    ///
    /// A reader error stops the run. A record failing with an unresolved
    /// reference is dropped and reported under [`UnresolvedPolicy::Skip`]
    /// and stops the run under [`UnresolvedPolicy::Abort`].
    ///
    /// # Errors
    ///
    /// The first reader, resolution or write error; the run ends `Failed`.
    pub fn drive<I, S>(
        &mut self,
        conn: &mut Connection,
        records: I,
        sink: &mut S,
        policy: UnresolvedPolicy,
    ) -> Result<()>
    where
        I: IntoIterator<Item = std::result::Result<S::Record, TemplateError>>,
        S: RecordSink,
    {
        for record in records {
            self.enter(ImportState::Read);
            let record = record.map_err(|e| self.fail(e.into()))?;
            self.records += 1;

            self.enter(ImportState::Write);
            match sink.accept(conn, record) {
                Ok(()) => {}
                Err(e)
                    if e.kind() == ExErrorKind::UnresolvedReference
                        && policy == UnresolvedPolicy::Skip =>
                {
                    tracing::warn!(
                        table = e.table().unwrap_or_default(),
                        natural_key = e.natural_key().unwrap_or_default(),
                        "Skipping record with unresolved reference"
                    );
                    self.skipped.push(SkippedRecord::from(&e));
                }
                Err(e) => return Err(self.fail(e)),
            }
        }

        self.enter(ImportState::Flush);
        sink.finish(conn).map_err(|e| self.fail(e))?;

        self.enter(ImportState::Done);
        Ok(())
    }
}

/// Run records through a sink from a fresh [`ImportRun`]
///
/// # Errors
///
/// As [`ImportRun::drive`].
pub fn run_import<I, S>(
    conn: &mut Connection,
    records: I,
    sink: &mut S,
    policy: UnresolvedPolicy,
) -> Result<ImportRun>
where
    I: IntoIterator<Item = std::result::Result<S::Record, TemplateError>>,
    S: RecordSink,
{
    let mut run = ImportRun::new();
    run.drive(conn, records, sink, policy)?;
    Ok(run)
}

/// What one importer did
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub importer: String,
    pub state: ImportState,
    pub records: usize,
    /// Rows created per table name
    pub created: BTreeMap<String, usize>,
    pub skipped: Vec<SkippedRecord>,
}

impl ImportSummary {
    pub fn new(importer: &str, run: ImportRun, tracker: &RollbackTracker) -> Self {
        let mut summary = Self {
            importer: importer.to_string(),
            state: run.state,
            records: run.records,
            created: BTreeMap::new(),
            skipped: run.skipped,
        };
        summary.add_created(tracker);
        summary
    }

    /// Count another tracker's rows into this summary
    pub fn add_created(&mut self, tracker: &RollbackTracker) {
        for (table, n) in tracker.counts() {
            *self.created.entry(table.name().to_string()).or_insert(0) += n;
        }
    }

    pub fn created_in(&self, table: Table) -> usize {
        self.created.get(table.name()).copied().unwrap_or(0)
    }

    pub fn total_created(&self) -> usize {
        self.created.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use germbank_store::errors::{invalid_input, unresolved};

    /// Accepts names, rejecting those starting with '?' as unresolved
    #[derive(Default)]
    struct NameSink {
        accepted: Vec<String>,
        finished: bool,
    }

    impl RecordSink for NameSink {
        type Record = String;

        fn accept(&mut self, _conn: &mut Connection, record: String) -> Result<()> {
            if let Some(missing) = record.strip_prefix('?') {
                return Err(unresolved("accessions", missing));
            }
            if record.is_empty() {
                return Err(invalid_input("accept", "empty name"));
            }
            self.accepted.push(record);
            Ok(())
        }

        fn finish(&mut self, _conn: &mut Connection) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    fn records(names: &[&str]) -> Vec<std::result::Result<String, TemplateError>> {
        names.iter().map(|n| Ok(n.to_string())).collect()
    }

    #[test]
    fn test_run_reaches_done_and_flushes() {
        let mut conn = Connection::open_in_memory().unwrap();
        let mut sink = NameSink::default();

        let run = run_import(&mut conn, records(&["a", "b"]), &mut sink, UnresolvedPolicy::Abort)
            .unwrap();

        assert_eq!(run.state(), ImportState::Done);
        assert_eq!(run.records(), 2);
        assert!(sink.finished);
    }

    #[test]
    fn test_unresolved_aborts_by_default() {
        let mut conn = Connection::open_in_memory().unwrap();
        let mut sink = NameSink::default();
        let mut run = ImportRun::new();

        let err = run
            .drive(&mut conn, records(&["a", "?ACC-9", "b"]), &mut sink, UnresolvedPolicy::Abort)
            .unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::UnresolvedReference);
        assert_eq!(run.state(), ImportState::Failed);
        assert_eq!(sink.accepted, vec!["a".to_string()]);
        assert!(!sink.finished);
    }

    #[test]
    fn test_unresolved_skipped_and_reported() {
        let mut conn = Connection::open_in_memory().unwrap();
        let mut sink = NameSink::default();

        let run = run_import(
            &mut conn,
            records(&["a", "?ACC-9", "b"]),
            &mut sink,
            UnresolvedPolicy::Skip,
        )
        .unwrap();

        assert_eq!(run.state(), ImportState::Done);
        assert_eq!(sink.accepted.len(), 2);
        assert_eq!(run.skipped().len(), 1);
        assert_eq!(run.skipped()[0].natural_key.as_deref(), Some("ACC-9"));
        assert_eq!(run.skipped()[0].table.as_deref(), Some("accessions"));
    }

    #[test]
    fn test_skip_policy_does_not_swallow_other_errors() {
        let mut conn = Connection::open_in_memory().unwrap();
        let mut sink = NameSink::default();

        let err = run_import(&mut conn, records(&["a", ""]), &mut sink, UnresolvedPolicy::Skip)
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }

    #[test]
    fn test_reader_error_fails_run() {
        let mut conn = Connection::open_in_memory().unwrap();
        let mut sink = NameSink::default();
        let mut run = ImportRun::new();
        let input: Vec<std::result::Result<String, TemplateError>> = vec![
            Ok("a".to_string()),
            Err(TemplateError::MissingSheet {
                sheet: "DATA".to_string(),
            }),
        ];

        let err = run
            .drive(&mut conn, input, &mut sink, UnresolvedPolicy::Skip)
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::MissingSheet);
        assert_eq!(run.state(), ImportState::Failed);
    }

    #[test]
    fn test_summary_counts_tracker() {
        let mut tracker = RollbackTracker::new();
        tracker.track_all(Table::Compounds, [1, 2]);
        tracker.track(Table::Units, 1);

        let summary = ImportSummary::new("compounds", ImportRun::new(), &tracker);
        assert_eq!(summary.created_in(Table::Compounds), 2);
        assert_eq!(summary.total_created(), 3);
    }
}
