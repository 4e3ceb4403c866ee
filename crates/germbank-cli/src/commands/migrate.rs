//! Schema migration command
//!
//! Usage: germbank migrate --database <DB>

use clap::Args;
use germbank_store::{db, migrations};

use super::ConnectionArgs;

#[derive(Debug, Args)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

pub fn execute(args: MigrateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = args.connection.settings()?;
    let connection = args.connection.apply(settings.connection);

    // connect applies pending migrations
    let conn = db::connect(&connection)?;
    let applied = migrations::applied_migrations(&conn)?;

    for id in &applied {
        println!("  {}", id);
    }
    println!("✓ {} is at schema {}", connection.database, applied.len());
    Ok(())
}
