//! Template import command
//!
//! Usage: germbank import <KIND> --input <PATH> [--database <DB>] [--dry-run | --confirm]

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Args;
use germbank_engine::{open_template, ImportKind, Pipeline, PipelineRun, ReaderKind};
use germbank_store::{db, RollbackReport};
use rusqlite::Connection;
use serde_json::json;

use super::ConnectionArgs;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Template kind: passport, attributes, collaborators, metadata, compounds,
    /// compound-data, phenotypes, trials, pedigree, pedigree-string, markers or
    /// genotype
    pub kind: String,

    /// Workbook directory or tab-delimited file
    #[arg(long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Reader variant: workbook, or tab for passport files
    #[arg(long)]
    pub reader: Option<String>,

    /// Fact rows buffered per flush
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// What to do with records naming unknown entities: abort or skip
    #[arg(long)]
    pub on_unresolved: Option<String>,

    /// Import, report, then roll everything back
    #[arg(long, conflicts_with = "confirm")]
    pub dry_run: bool,

    /// Ask before keeping the import
    #[arg(long)]
    pub confirm: bool,

    /// Print the run summaries as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: ImportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let kind: ImportKind = args.kind.parse()?;
    let reader = args
        .reader
        .as_deref()
        .map(str::parse::<ReaderKind>)
        .transpose()?;

    let settings = args.connection.settings()?;
    let mut config = settings.import;
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(policy) = &args.on_unresolved {
        config.on_unresolved = policy.parse()?;
    }
    config.validate()?;
    let connection = args.connection.apply(settings.connection);

    let workbook = open_template(&args.input, kind, reader)?;
    let mut conn = db::connect(&connection)?;

    if !args.json {
        println!("Importing {} from {}...", kind, args.input.display());
    }
    let mut run = Pipeline::new(config).run(kind, &mut conn, &workbook)?;
    if !args.json {
        print_summaries(&run);
    }

    let discard = if args.dry_run {
        Some("Dry run")
    } else if args.confirm && !confirmed(&mut io::stdin().lock())? {
        Some("Discarded")
    } else {
        None
    };
    let rolled_back = match discard {
        Some(label) => Some(undo(&mut run, &conn, label, args.json)?),
        None => None,
    };

    if args.json {
        let outcome = json!({
            "run_id": run.run_id,
            "kind": kind,
            "summaries": run.summaries,
            "rolled_back": rolled_back,
        });
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if rolled_back.is_none() {
        println!("✓ Imported {} ({} rows created)", kind, run.total_created());
    }

    Ok(())
}

fn print_summaries(run: &PipelineRun) {
    for summary in &run.summaries {
        println!(
            "  {}: {} records, {} created, {} skipped",
            summary.importer,
            summary.records,
            summary.total_created(),
            summary.skipped.len()
        );
        for skipped in &summary.skipped {
            println!("    skipped: {}", skipped.message);
        }
    }
}

/// Roll the run back, returning the number of deleted rows
fn undo(
    run: &mut PipelineRun,
    conn: &Connection,
    label: &str,
    quiet: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    let report = run.rollback(conn);
    if !quiet {
        println!("{}: rolled back {} rows", label, report.total_deleted());
    }
    check_clean(&report)?;
    Ok(report.total_deleted())
}

fn check_clean(report: &RollbackReport) -> Result<(), Box<dyn std::error::Error>> {
    match report.failures.first() {
        None => Ok(()),
        Some(first) => Err(format!(
            "Rollback left rows behind ({} failed deletes, first: {})",
            report.failures.len(),
            first
        )
        .into()),
    }
}

/// Ask whether to keep the import; anything but yes discards it
fn confirmed(input: &mut impl BufRead) -> io::Result<bool> {
    eprint!("Keep this import? [y/N] ");
    io::stderr().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
