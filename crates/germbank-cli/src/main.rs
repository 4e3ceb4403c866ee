//! Germbank CLI
//!
//! Command-line interface for template imports

use clap::{Parser, Subcommand};
use germbank_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "germbank")]
#[command(about = "Germbank - Germplasm template imports", long_about = None)]
struct Cli {
    /// Emit JSON logs instead of human-readable ones
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import a template workbook
    Import(commands::import::ImportArgs),
    /// Create or update the database schema
    Migrate(commands::migrate::MigrateArgs),
    /// List the sheets of a template workbook
    Sheets(commands::sheets::SheetsArgs),
}

fn main() {
    // A missing .env file is the normal case
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init(if cli.json_logs {
        Profile::Production
    } else {
        Profile::Development
    });

    let result = match cli.command {
        Commands::Import(args) => commands::import::execute(args),
        Commands::Migrate(args) => commands::migrate::execute(args),
        Commands::Sheets(args) => commands::sheets::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
