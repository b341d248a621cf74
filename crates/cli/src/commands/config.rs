//! Config command - configuration management

use anyhow::{Context, Result};
use newsdesk_domain::usecases::{accounts::PROFILE_PICTURE_FOLDER, news};
use std::fs;
use std::path::{Path, PathBuf};

use crate::args::{ConfigArgs, ConfigCommands};
use crate::config::AppConfig;

/// Folders below the media root that uploads are written to
const MEDIA_FOLDERS: [&str; 3] = [
    PROFILE_PICTURE_FOLDER,
    news::BANNER_FOLDER,
    news::IMAGE_FOLDER,
];

pub async fn execute(args: ConfigArgs, config_path: Option<PathBuf>) -> Result<()> {
    match args.command {
        ConfigCommands::Init { path, force } => init_config(path, force).await,
        ConfigCommands::Show => show_config(config_path),
    }
}

async fn init_config(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }

    ensure_dir(path.parent())?;
    fs::write(&path, AppConfig::example_toml())
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    println!("Created config file: {}", path.display());

    // Environment overrides apply, so the folders land where the binary will look.
    let config = AppConfig::load(Some(&path))?;
    for folder in MEDIA_FOLDERS {
        ensure_dir(Some(&config.storage.root_dir.join(folder)))?;
    }
    println!("Media root: {}", config.storage.root_dir.display());
    println!("Database: {}", config.general.database_path.display());

    let secret_env = &config.auth.jwt_secret_env;
    let secret_set = std::env::var(secret_env).is_ok_and(|s| !s.trim().is_empty());

    println!();
    println!("Next steps:");
    let mut step = 1;
    if !secret_set {
        println!("  {}. Export a signing secret: export {}=...", step, secret_env);
        step += 1;
    }
    println!(
        "  {}. Run 'newsdesk --config {} db migrate' to create the tables",
        step,
        path.display()
    );
    println!(
        "  {}. Run 'newsdesk user signup' to create the first account",
        step + 1
    );
    println!("  {}. Run 'newsdesk doctor' to validate your setup", step + 2);

    Ok(())
}

fn ensure_dir(dir: Option<&Path>) -> Result<()> {
    let Some(dir) = dir.filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}

fn show_config(config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    print!("{}", config.to_toml()?);
    Ok(())
}
