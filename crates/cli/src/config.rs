//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "./newsdesk.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding uploaded images
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// URL prefix under which `root_dir` is served
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Name of the environment variable holding the token signing secret
    #[serde(default = "default_jwt_secret_env")]
    pub jwt_secret_env: String,

    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

// Default value functions
fn default_database_path() -> PathBuf {
    PathBuf::from("./newsdesk.sqlite")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("./media")
}

fn default_public_base_url() -> String {
    "http://localhost:8080/media".to_string()
}

fn default_max_image_bytes() -> usize {
    newsdesk_domain::policy::DEFAULT_MAX_IMAGE_BYTES
}

fn default_jwt_secret_env() -> String {
    "NEWSDESK_JWT_SECRET".to_string()
}

fn default_token_ttl_hours() -> i64 {
    24
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_level: default_log_level(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            public_base_url: default_public_base_url(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret_env: default_jwt_secret_env(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("NEWSDESK")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Effective configuration rendered as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# newsdesk configuration

[general]
database_path = "./newsdesk.sqlite"
log_level = "info"

[storage]
# Uploaded pictures are written below root_dir and published as
# {public_base_url}/{folder}/{file}
root_dir = "./media"
public_base_url = "http://localhost:8080/media"
max_image_bytes = 5242880

[auth]
# The signing secret itself is never stored in this file
jwt_secret_env = "NEWSDESK_JWT_SECRET"
token_ttl_hours = 24
"#
        .to_string()
    }
}
