//! Doctor command - validate configuration and show status

use anyhow::Result;
use newsdesk_adapters::store::SqliteStore;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::args::DoctorArgs;
use crate::commands::load_secret;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    database: CheckResult,
    storage: CheckResult,
    auth: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        database: CheckResult::error("Not checked"),
        storage: CheckResult::error("Not checked"),
        auth: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    // Check config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.database = check_database(&config.general.database_path).await;
        report.storage = check_storage(&config.storage.root_dir, &config.storage.public_base_url);
        report.auth = check_auth(config);
    }

    let checks = [
        &report.config,
        &report.database,
        &report.storage,
        &report.auth,
    ];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

async fn check_database(path: &Path) -> CheckResult {
    match SqliteStore::new(path).await {
        Ok(store) => match store.ping().await {
            Ok(()) => CheckResult::ok(format!("SQLite database ready: {}", path.display())),
            Err(e) => CheckResult::error(format!("Database query failed: {}", e)),
        },
        Err(e) => CheckResult::error(format!("Failed to open database: {}", e)),
    }
}

fn check_storage(root: &Path, public_base_url: &str) -> CheckResult {
    if !public_base_url.starts_with("http://") && !public_base_url.starts_with("https://") {
        return CheckResult::warn(format!(
            "public_base_url is not an http(s) URL: {}",
            public_base_url
        ));
    }

    if root.is_dir() {
        CheckResult::ok(format!(
            "Images in {} served at {}",
            root.display(),
            public_base_url
        ))
    } else if root.exists() {
        CheckResult::error(format!("Storage root is not a directory: {}", root.display()))
    } else {
        CheckResult::warn(format!(
            "Storage root {} does not exist yet (created on first upload)",
            root.display()
        ))
    }
}

fn check_auth(config: &AppConfig) -> CheckResult {
    if config.auth.token_ttl_hours <= 0 {
        return CheckResult::error(format!(
            "token_ttl_hours must be positive, got {}",
            config.auth.token_ttl_hours
        ));
    }

    // Never reveal the secret itself
    match load_secret(&config.auth.jwt_secret_env) {
        Ok(_) => CheckResult::ok(format!(
            "Signing secret: {} (set), tokens valid for {}h",
            config.auth.jwt_secret_env, config.auth.token_ttl_hours
        )),
        Err(e) => CheckResult::error(format!("{:#}", e)),
    }
}

fn print_report(report: &DoctorReport) {
    println!("newsdesk Doctor Report");
    println!("======================");
    println!();

    print_check("Config", &report.config);
    print_check("Database", &report.database);
    print_check("Storage", &report.storage);
    print_check("Auth", &report.auth);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
