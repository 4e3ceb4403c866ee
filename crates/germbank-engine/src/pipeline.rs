//! Pipeline orchestration
//!
//! A template kind maps to an ordered list of importer stages. Each stage
//! runs to completion before the next starts; later stages rely on rows
//! the earlier ones resolved (the dataset, compounds, phenotypes).
//!
//! ## Failure handling (in order):
//! 1. Roll back the failed stage's own rows
//! 2. Roll back every completed stage, newest first
//! 3. Return the original error with the rollback report attached
//!
//! With `rollback_on_failure` off nothing is deleted: the failed stage's
//! rows reference its prerequisites' rows, so the whole run is kept and
//! handed back as [`PipelineFailure::kept`] for a later undo.
//!
//! Rollback failures are logged and reported; they never replace the
//! error that stopped the run.

#![allow(clippy::result_large_err)]

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

use germbank_core::errors::ExError;
use germbank_core::model::ExperimentType;
use germbank_core::template::sheets;
use germbank_core::{log_op_end, log_op_error, log_op_start, Workbook};
use germbank_core_types::RunId;
use germbank_store::errors::{config_error, Result};
use germbank_store::{ImportConfig, RollbackReport};
use rusqlite::Connection;
use serde::Serialize;

use crate::importers::{
    AttributeDataImporter, CollaboratorImporter, CompoundDataImporter, CompoundImporter, Importer,
    MarkerImporter, MetadataImporter, PassportImporter, PedigreeImporter, PedigreeStringImporter,
    PhenotypeDataImporter, PhenotypeImporter, StageContext,
};
use crate::run::ImportSummary;

/// Template kinds the pipeline knows how to import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
    Passport,
    Attributes,
    Collaborators,
    Metadata,
    Compounds,
    CompoundData,
    Phenotypes,
    Trials,
    Pedigree,
    PedigreeString,
    Markers,
    Genotype,
}

impl ImportKind {
    pub const ALL: [ImportKind; 12] = [
        ImportKind::Passport,
        ImportKind::Attributes,
        ImportKind::Collaborators,
        ImportKind::Metadata,
        ImportKind::Compounds,
        ImportKind::CompoundData,
        ImportKind::Phenotypes,
        ImportKind::Trials,
        ImportKind::Pedigree,
        ImportKind::PedigreeString,
        ImportKind::Markers,
        ImportKind::Genotype,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ImportKind::Passport => "passport",
            ImportKind::Attributes => "attributes",
            ImportKind::Collaborators => "collaborators",
            ImportKind::Metadata => "metadata",
            ImportKind::Compounds => "compounds",
            ImportKind::CompoundData => "compound-data",
            ImportKind::Phenotypes => "phenotypes",
            ImportKind::Trials => "trials",
            ImportKind::Pedigree => "pedigree",
            ImportKind::PedigreeString => "pedigree-string",
            ImportKind::Markers => "markers",
            ImportKind::Genotype => "genotype",
        }
    }

    fn stages(self) -> Vec<Stage> {
        match self {
            ImportKind::Passport => vec![
                Stage::required(PassportImporter::new()),
                Stage::when_sheet(sheets::ADDITIONAL_ATTRIBUTES, AttributeDataImporter::new()),
            ],
            ImportKind::Attributes => vec![Stage::required(AttributeDataImporter::new())],
            ImportKind::Collaborators => vec![Stage::required(CollaboratorImporter::new())],
            ImportKind::Metadata => {
                vec![Stage::required(MetadataImporter::new(ExperimentType::Unknown))]
            }
            ImportKind::Compounds => vec![Stage::required(CompoundImporter::new())],
            ImportKind::CompoundData => vec![
                Stage::required(MetadataImporter::new(ExperimentType::Compound)),
                Stage::required(CompoundImporter::new()),
                Stage::required(CompoundDataImporter::new()),
            ],
            ImportKind::Phenotypes => vec![Stage::required(PhenotypeImporter::new())],
            ImportKind::Trials => vec![
                Stage::required(MetadataImporter::new(ExperimentType::Trials)),
                Stage::required(PhenotypeImporter::new()),
                Stage::required(PhenotypeDataImporter::new()),
            ],
            ImportKind::Pedigree => vec![Stage::required(PedigreeImporter::new())],
            ImportKind::PedigreeString => vec![Stage::required(PedigreeStringImporter::new())],
            ImportKind::Markers => vec![Stage::required(MarkerImporter::new())],
            ImportKind::Genotype => vec![
                Stage::required(MetadataImporter::new(ExperimentType::Genotype)),
                Stage::required(MarkerImporter::new()),
            ],
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportKind {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        ImportKind::ALL
            .into_iter()
            .find(|k| k.as_str() == name)
            .ok_or_else(|| {
                let known: Vec<&str> = ImportKind::ALL.iter().map(|k| k.as_str()).collect();
                config_error(format!(
                    "Unknown import kind '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// How a template is read from disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderKind {
    /// A directory of sheets, or a single tab-delimited file as its `DATA` sheet
    Workbook,
    /// A single tab-delimited MCPD file
    Tab,
}

impl FromStr for ReaderKind {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "workbook" => Ok(ReaderKind::Workbook),
            "tab" => Ok(ReaderKind::Tab),
            other => Err(config_error(format!(
                "Unknown reader '{}' (expected workbook or tab)",
                other
            ))),
        }
    }
}

/// Open the template at `path` for an import of `kind`
///
/// # Errors
///
/// `ERR_CONFIG` when the reader does not serve the kind or the path has
/// the wrong shape for it, otherwise the workbook's open error.
pub fn open_template(path: &Path, kind: ImportKind, reader: Option<ReaderKind>) -> Result<Workbook> {
    match reader {
        Some(ReaderKind::Tab) if kind != ImportKind::Passport => Err(config_error(format!(
            "The tab reader only reads passport data, not {}",
            kind
        ))),
        Some(ReaderKind::Tab) if !path.is_file() => Err(config_error(format!(
            "The tab reader needs a file: {}",
            path.display()
        ))),
        Some(ReaderKind::Workbook) if !path.is_dir() => Err(config_error(format!(
            "The workbook reader needs a directory of sheets: {}",
            path.display()
        ))),
        _ => Ok(Workbook::open(path)?),
    }
}

/// One importer of a pipeline
struct Stage {
    importer: Box<dyn Importer>,
    /// Sheet without which the stage is skipped
    only_with_sheet: Option<&'static str>,
}

impl Stage {
    fn required(importer: impl Importer + 'static) -> Self {
        Self {
            importer: Box::new(importer),
            only_with_sheet: None,
        }
    }

    fn when_sheet(sheet: &'static str, importer: impl Importer + 'static) -> Self {
        Self {
            importer: Box::new(importer),
            only_with_sheet: Some(sheet),
        }
    }
}

/// A completed pipeline run
///
/// Keeps the importers so the whole run can still be undone.
pub struct PipelineRun {
    pub run_id: RunId,
    pub kind: ImportKind,
    pub summaries: Vec<ImportSummary>,
    importers: Vec<Box<dyn Importer>>,
}

impl fmt::Debug for PipelineRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRun")
            .field("run_id", &self.run_id)
            .field("kind", &self.kind)
            .field("summaries", &self.summaries)
            .finish_non_exhaustive()
    }
}

impl PipelineRun {
    pub fn total_created(&self) -> usize {
        self.summaries.iter().map(ImportSummary::total_created).sum()
    }

    pub fn skipped(&self) -> usize {
        self.summaries.iter().map(|s| s.skipped.len()).sum()
    }

    /// Delete everything the run created, last stage first
    pub fn rollback(&mut self, conn: &Connection) -> RollbackReport {
        let mut report = RollbackReport::default();
        for importer in self.importers.iter_mut().rev() {
            report.merge(importer.rollback(conn));
        }
        tracing::info!(
            run_id = self.run_id.as_str(),
            deleted = report.total_deleted(),
            failures = report.failures.len(),
            "Rolled back pipeline run"
        );
        report
    }
}

/// A pipeline run stopped by an error
#[derive(Debug)]
pub struct PipelineFailure {
    pub run_id: RunId,
    pub error: ExError,
    /// What the cleanup deleted, and which deletes failed
    pub rollback: RollbackReport,
    /// Summaries of the stages that finished before the failure
    pub completed: Vec<ImportSummary>,
    /// The rows of the run when `rollback_on_failure` is off, still
    /// undoable through [`PipelineRun::rollback`]
    pub kept: Option<PipelineRun>,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if !self.rollback.is_clean() {
            write!(
                f,
                " ({} rollback deletes failed)",
                self.rollback.failures.len()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<PipelineFailure> for ExError {
    fn from(failure: PipelineFailure) -> Self {
        failure.error
    }
}

/// Runs the stages of an import kind against one connection
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: ImportConfig,
}

impl Pipeline {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Import a workbook as `kind`
    ///
    /// # Errors
    ///
    /// The error of the first failing stage, after cleanup.
    pub fn run(
        &self,
        kind: ImportKind,
        conn: &mut Connection,
        workbook: &Workbook,
    ) -> std::result::Result<PipelineRun, PipelineFailure> {
        let mut ctx = StageContext::new(self.config.clone());
        let run_id = ctx.run_id.clone();
        let start = Instant::now();
        log_op_start!("run_pipeline", run_id = run_id.as_str(), importer = kind.as_str());

        if let Err(error) = self.config.validate() {
            log_op_error!(
                "run_pipeline",
                &error,
                duration_ms = start.elapsed().as_millis() as u64,
                run_id = run_id.as_str(),
            );
            return Err(PipelineFailure {
                run_id,
                error,
                rollback: RollbackReport::default(),
                completed: Vec::new(),
                kept: None,
            });
        }

        let mut completed: Vec<Box<dyn Importer>> = Vec::new();
        let mut summaries = Vec::new();

        for stage in kind.stages() {
            let mut importer = stage.importer;
            if let Some(sheet) = stage.only_with_sheet {
                if !workbook.has_sheet(sheet) {
                    tracing::debug!(
                        importer = importer.name(),
                        sheet,
                        "Skipping stage without its sheet"
                    );
                    continue;
                }
            }

            match importer.import(conn, workbook, &mut ctx) {
                Ok(summary) => {
                    summaries.push(summary);
                    completed.push(importer);
                }
                Err(error) => {
                    let name = importer.name();
                    completed.push(importer);
                    let (rollback, kept) = if self.config.rollback_on_failure {
                        (clean_up(conn, &mut completed), None)
                    } else {
                        tracing::warn!(
                            run_id = run_id.as_str(),
                            importer = name,
                            "Keeping the rows of the failed run"
                        );
                        let kept = PipelineRun {
                            run_id: run_id.clone(),
                            kind,
                            summaries: summaries.clone(),
                            importers: completed,
                        };
                        (RollbackReport::default(), Some(kept))
                    };
                    if !rollback.is_clean() {
                        for failure in &rollback.failures {
                            tracing::warn!(
                                run_id = run_id.as_str(),
                                error = %failure,
                                "Rollback after failed import left rows behind"
                            );
                        }
                    }
                    log_op_error!(
                        "run_pipeline",
                        &error,
                        duration_ms = start.elapsed().as_millis() as u64,
                        run_id = run_id.as_str(),
                        importer = name,
                    );
                    return Err(PipelineFailure {
                        run_id,
                        error,
                        rollback,
                        completed: summaries,
                        kept,
                    });
                }
            }
        }

        let run = PipelineRun {
            run_id,
            kind,
            summaries,
            importers: completed,
        };
        log_op_end!(
            "run_pipeline",
            duration_ms = start.elapsed().as_millis() as u64,
            run_id = run.run_id.as_str(),
            created = run.total_created(),
            skipped = run.skipped(),
        );
        Ok(run)
    }
}

/// Undo the stages that ran, the failed one first
fn clean_up(conn: &Connection, ran: &mut [Box<dyn Importer>]) -> RollbackReport {
    let mut report = RollbackReport::default();
    for importer in ran.iter_mut().rev() {
        report.merge(importer.rollback(conn));
    }
    report
}
