use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Every request to the backend is abandoned after two minutes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(120_000);

const STORAGE_DIR: &str = ".matcher";
const STORAGE_FILE: &str = "storage.json";

/// Client configuration loaded from environment variables.
/// Fails at startup if the backend URL is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub storage_path: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Like `from_env`, with an explicit base URL taking precedence over
    /// `MATCHER_API_URL`.
    pub fn load(api_url: Option<String>) -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let api_url = match api_url {
            Some(url) => url,
            None => require_env("MATCHER_API_URL")?,
        };
        reqwest::Url::parse(&api_url)
            .with_context(|| format!("API URL '{api_url}' is not a valid URL"))?;

        Ok(Config {
            api_url,
            storage_path: std::env::var("MATCHER_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_storage_path()),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()),
        })
    }

    pub fn with_storage_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.storage_path = path;
        }
        self
    }
}

/// `$HOME/.matcher/storage.json`, or relative to the working directory when
/// no home directory can be resolved.
pub fn default_storage_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STORAGE_DIR)
        .join(STORAGE_FILE)
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
