//! newsdesk CLI entry point

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod args;
mod commands;
mod config;

use args::{Cli, Commands};
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins, then --log-level, then the config file
    let log_level = match cli.log_level.clone() {
        Some(level) => level,
        None => AppConfig::load(cli.config.as_deref())
            .map(|c| c.general.log_level)
            .unwrap_or_else(|_| "info".to_string()),
    };
    init_logging(&log_level)?;

    // Execute command
    match cli.command {
        Commands::Db(args) => commands::db::execute(args, cli.config).await,
        Commands::User(args) => commands::user::execute(args, cli.config).await,
        Commands::News(args) => commands::news::execute(args, cli.config).await,
        Commands::Comment(args) => commands::comment::execute(args, cli.config).await,
        Commands::Config(args) => commands::config::execute(args, cli.config).await,
        Commands::Doctor(args) => commands::doctor::execute(args, cli.config).await,
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}
