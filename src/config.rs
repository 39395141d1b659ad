// src/config.rs - Client configuration: .env, TOML file, environment overrides
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pagination::MAX_PAGE_SIZE;
use crate::reports::WarrantyWindow;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub reports: ReportsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub storage_dir: PathBuf,
    pub storage_key: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReportsConfig {
    pub page_size: usize,
    pub warranty_days: u32,
    pub chart_label: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(".smartasset"),
            storage_key: "smartasset_auth".to_string(),
        }
    }
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            warranty_days: 30,
            chart_label: "Maintenance Cost".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

pub fn load_config() -> Result<ClientConfig> {
    load_env_file()?;

    let mut config = if let Ok(config_file) = env::var("CONFIG_FILE") {
        load_from_file(Path::new(&config_file))?
    } else {
        ClientConfig::default()
    };

    override_with_env(&mut config);

    config.validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

pub fn load_from_file(path: &Path) -> Result<ClientConfig> {
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn override_with_env(config: &mut ClientConfig) {
    apply_overrides(config, |key| env::var(key).ok());
}

/// Applies `SMARTASSET_*` and `RUST_LOG` values; unparseable numbers are ignored.
pub fn apply_overrides<F>(config: &mut ClientConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("SMARTASSET_API_URL") {
        config.api.base_url = url;
    }
    if let Some(timeout_str) = lookup("SMARTASSET_API_TIMEOUT_SECS") {
        if let Ok(timeout) = timeout_str.parse::<u64>() {
            config.api.timeout_seconds = timeout;
        }
    }
    if let Some(dir) = lookup("SMARTASSET_SESSION_DIR") {
        config.session.storage_dir = PathBuf::from(dir);
    }
    if let Some(size_str) = lookup("SMARTASSET_PAGE_SIZE") {
        if let Ok(size) = size_str.parse::<usize>() {
            config.reports.page_size = size;
        }
    }
    if let Some(level) = lookup("RUST_LOG") {
        config.logging.level = level;
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url.trim();
        if url.is_empty() {
            return Err(anyhow::anyhow!("api.base_url must not be empty"));
        }
        let parsed = reqwest::Url::parse(url)
            .with_context(|| format!("api.base_url is not a valid URL: {}", url))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(anyhow::anyhow!(
                "api.base_url must use http or https (got {})",
                parsed.scheme()
            ));
        }

        if self.api.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("api.timeout_seconds must be greater than 0"));
        }

        if self.reports.page_size == 0 || self.reports.page_size > MAX_PAGE_SIZE {
            return Err(anyhow::anyhow!(
                "reports.page_size must be between 1 and {} (current: {})",
                MAX_PAGE_SIZE,
                self.reports.page_size
            ));
        }

        if self.session.storage_key.trim().is_empty() {
            return Err(anyhow::anyhow!("session.storage_key must not be empty"));
        }

        Ok(())
    }

    /// Configured warranty window, falling back to 30 days for other values.
    pub fn warranty_window(&self) -> WarrantyWindow {
        WarrantyWindow::from_days(self.reports.warranty_days).unwrap_or_default()
    }

    pub fn print_startup_info(&self) {
        log::info!("SmartAsset client starting up...");
        log::info!("API: {} ({}s timeout)", self.api.base_url, self.api.timeout_seconds);
        log::info!(
            "Session: {}/{}.json",
            self.session.storage_dir.display(),
            self.session.storage_key
        );
        log::info!("Reports: page size {}, warranty window {} days",
            self.reports.page_size, self.warranty_window().days());
        log::info!("Logging: {} level", self.logging.level);

        if self.api.base_url.starts_with("http://") && !self.api.base_url.contains("localhost") {
            log::warn!("API base URL is not using HTTPS");
        }
    }
}

pub fn load_env_file() -> Result<()> {
    if let Ok(env_file) = env::var("ENV_FILE") {
        dotenvy::from_filename(&env_file)
            .with_context(|| format!("Failed to load environment file: {}", env_file))?;
    } else if Path::new(".env").exists() {
        dotenvy::dotenv().context("Failed to load .env file")?;
    }
    Ok(())
}
