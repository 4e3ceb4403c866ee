//! Sheet listing command
//!
//! Usage: germbank sheets --input <PATH>

use std::path::PathBuf;

use clap::Args;
use germbank_core::Workbook;

#[derive(Debug, Args)]
pub struct SheetsArgs {
    /// Workbook directory or tab-delimited file
    #[arg(long)]
    pub input: PathBuf,
}

pub fn execute(args: SheetsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let workbook = Workbook::open(&args.input)?;

    for name in workbook.sheet_names() {
        let sheet = workbook.sheet(name)?;
        println!("{}\t{} rows", name, sheet.row_count());
    }
    Ok(())
}
