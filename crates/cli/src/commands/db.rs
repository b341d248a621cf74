//! Db command - schema management

use anyhow::Result;
use std::path::PathBuf;

use crate::args::{DbArgs, DbCommands};
use crate::commands::AppContext;

pub async fn execute(args: DbArgs, config_path: Option<PathBuf>) -> Result<()> {
    match args.command {
        DbCommands::Migrate => migrate(config_path).await,
    }
}

async fn migrate(config_path: Option<PathBuf>) -> Result<()> {
    // Opening the store applies the schema.
    let ctx = AppContext::open(config_path.as_deref()).await?;
    tracing::info!(
        database = %ctx.config.general.database_path.display(),
        "Database schema is up to date"
    );
    println!(
        "Database ready: {}",
        ctx.config.general.database_path.display()
    );
    Ok(())
}
