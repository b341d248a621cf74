//! Command implementations and the wiring they share

pub mod comment;
pub mod config;
pub mod db;
pub mod doctor;
pub mod news;
pub mod user;

use anyhow::{Context, Result, bail};
use newsdesk_adapters::{
    credentials::{Argon2PasswordHasher, JwtTokenIssuer},
    images::FsImageStore,
    store::SqliteStore,
};
use newsdesk_domain::{
    ImageUpload, SessionClaims, SystemClock,
    policy::ContentPolicy,
    usecases::{AccountConfig, AccountService, CommentService, NewsConfig, NewsService, VoteEngine},
};
use secrecy::SecretString;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::args::AuthArgs;
use crate::config::AppConfig;

/// Stores and settings shared by every command
pub(crate) struct AppContext {
    pub config: AppConfig,
    pub store: Arc<SqliteStore>,
    pub images: Arc<FsImageStore>,
}

impl AppContext {
    pub async fn open(config_path: Option<&Path>) -> Result<Self> {
        let config = AppConfig::load(config_path)?;

        let store = Arc::new(
            SqliteStore::new(&config.general.database_path)
                .await
                .context("Failed to initialize SQLite store")?,
        );
        let images = Arc::new(FsImageStore::new(
            &config.storage.root_dir,
            config.storage.public_base_url.clone(),
        ));

        Ok(Self {
            config,
            store,
            images,
        })
    }

    fn policy(&self) -> ContentPolicy {
        ContentPolicy::new(self.config.storage.max_image_bytes)
    }

    /// Account service; fails without a configured signing secret
    pub fn accounts(&self) -> Result<AccountService> {
        let secret = load_secret(&self.config.auth.jwt_secret_env)?;
        let config = AccountConfig {
            token_ttl: time::Duration::hours(self.config.auth.token_ttl_hours),
            policy: self.policy(),
        };
        Ok(AccountService::new(
            self.store.clone(),
            self.images.clone(),
            Arc::new(Argon2PasswordHasher),
            Arc::new(JwtTokenIssuer::new(&secret)),
            Arc::new(SystemClock),
            config,
        ))
    }

    pub fn news(&self) -> NewsService {
        let config = NewsConfig {
            policy: self.policy(),
            ..NewsConfig::default()
        };
        NewsService::new(
            self.store.clone(),
            self.images.clone(),
            Arc::new(SystemClock),
            config,
        )
    }

    pub fn comments(&self) -> CommentService {
        CommentService::new(self.store.clone(), Arc::new(SystemClock), self.policy())
    }

    pub fn votes(&self) -> VoteEngine<SqliteStore> {
        VoteEngine::new(self.store.clone())
    }

    /// Verify the session token and return its claims
    pub fn authenticate(&self, auth: &AuthArgs) -> Result<SessionClaims> {
        self.accounts()?
            .verify_token(auth.token.trim())
            .context("Authentication failed")
    }
}

/// Read the token signing secret from the configured environment variable
pub(crate) fn load_secret(env_var: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No signing secret env var configured (auth.jwt_secret_env)");
    }

    let secret = std::env::var(env_var)
        .with_context(|| format!("Missing signing secret env var {}", env_var))?;

    if secret.trim().is_empty() {
        bail!("Signing secret env var {} is empty", env_var);
    }

    Ok(SecretString::new(secret.into()))
}

/// Read an image file, inferring its content type from the extension
pub(crate) fn read_image(path: &Path) -> Result<ImageUpload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read image: {}", path.display()))?;
    Ok(ImageUpload {
        content_type: content_type_for(path).to_string(),
        bytes,
    })
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("avif") => "image/avif",
        _ => "application/octet-stream",
    }
}

/// Read text from a file, or stdin for `-`
pub(crate) fn read_text(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
