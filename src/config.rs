use anyhow::{Context, Result};
use chrono_tz::Tz;
use directories::ProjectDirs;
use keyring::Entry;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::Credentials;
use crate::query::{QueryBuilder, DEFAULT_QUERY_TEMPLATE, ORDER_ID_PLACEHOLDER};

pub const APP_NAME: &str = "sumoredrive";
pub const KEYRING_USER: &str = "access_key";
pub const DEFAULT_API_URL: &str = "https://api.sumologic.com";
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Knobs for a single job's poll loop and message paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub poll_interval: Duration,
    pub page_size: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub access_id: String,
    pub access_key: String,
    pub time_zone: String,
    pub sink_url: Option<String>,
    pub workers: usize,
    pub poll_interval_secs: u64,
    pub page_size: u32,
    pub query_template: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            access_id: String::new(),
            access_key: String::new(),
            time_zone: "UTC".to_string(),
            sink_url: None,
            workers: DEFAULT_WORKERS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            query_template: DEFAULT_QUERY_TEMPLATE.to_string(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        // 1. Config file
        if let Some(config_path) = config_path() {
            if config_path.exists() {
                info!("Loading config from: {:?}", config_path);
                let content = std::fs::read_to_string(&config_path)
                    .context(format!("Failed to read config file at {:?}", config_path))?;

                match toml::from_str::<FileConfig>(&content) {
                    Ok(file_config) => config.merge(file_config),
                    Err(e) => warn!("Failed to parse config.toml: {}", e),
                }
            }
        }

        // 2. Keyring, only when the key is still missing
        if config.access_key.is_empty() {
            if let Ok(entry) = Entry::new(APP_NAME, KEYRING_USER) {
                if let Ok(password) = entry.get_password() {
                    config.access_key = password;
                }
            }
        }

        // 3. Environment overrides file and keyring
        config.apply_env(|key| env::var(key).ok());

        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("SUMO_API_URL").filter(|v| !v.is_empty()) {
            self.api_url = val;
        }
        if let Some(val) = lookup("SUMO_ACCESS_ID") {
            self.access_id = val;
        }
        if let Some(val) = lookup("SUMO_ACCESS_KEY") {
            self.access_key = val;
        }
        if let Some(val) = lookup("SUMO_TIMEZONE").filter(|v| !v.is_empty()) {
            self.time_zone = val;
        }
        if let Some(val) = lookup("SINK_QUEUE_URL").filter(|v| !v.is_empty()) {
            self.sink_url = Some(val);
        }
        if let Some(val) = lookup("SUMO_WORKERS") {
            match val.parse() {
                Ok(workers) => self.workers = workers,
                Err(_) => warn!("Ignoring SUMO_WORKERS={:?}: not a number", val),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.access_id.is_empty() || self.access_key.is_empty() {
            anyhow::bail!(
                "Set SUMO_ACCESS_ID and SUMO_ACCESS_KEY.\nOr run 'sumoredrive config' to store your credentials."
            );
        }
        url::Url::parse(&self.api_url)
            .with_context(|| format!("Invalid API URL: {}", self.api_url))?;
        if let Some(sink_url) = &self.sink_url {
            url::Url::parse(sink_url)
                .with_context(|| format!("Invalid sink queue URL: {}", sink_url))?;
        }
        if self.time_zone.parse::<Tz>().is_err() {
            anyhow::bail!("Unknown time zone: {}", self.time_zone);
        }
        if self.workers == 0 {
            anyhow::bail!("Workers must be at least 1.");
        }
        if self.page_size == 0 {
            anyhow::bail!("Page size must be at least 1.");
        }
        if !self.query_template.contains(ORDER_ID_PLACEHOLDER) {
            anyhow::bail!("Query template must contain {}", ORDER_ID_PLACEHOLDER);
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            api_url: self.api_url.trim_end_matches('/').to_string(),
            access_id: self.access_id.clone(),
            access_key: self.access_key.clone(),
        }
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            page_size: self.page_size,
        }
    }

    pub fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new(self.query_template.clone(), self.time_zone.clone())
    }
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub access_id: Option<String>,
    pub access_key: Option<String>,
    pub time_zone: Option<String>,
    pub sink_url: Option<String>,
    pub workers: Option<usize>,
    pub poll_interval_secs: Option<u64>,
    pub page_size: Option<u32>,
    pub query_template: Option<String>,
}

impl FileConfig {
    pub fn read(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(FileConfig::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).with_context(|| {
            format!("Failed to parse {:?}; fix or remove it before rewriting", path)
        })
    }
}

impl Config {
    fn merge(&mut self, other: FileConfig) {
        if let Some(v) = other.api_url {
            self.api_url = v;
        }
        if let Some(v) = other.access_id {
            self.access_id = v;
        }
        if let Some(v) = other.access_key {
            self.access_key = v;
        }
        if let Some(v) = other.time_zone {
            self.time_zone = v;
        }
        if let Some(v) = other.sink_url {
            self.sink_url = Some(v);
        }
        if let Some(v) = other.workers {
            self.workers = v;
        }
        if let Some(v) = other.poll_interval_secs {
            self.poll_interval_secs = v;
        }
        if let Some(v) = other.page_size {
            self.page_size = v;
        }
        if let Some(v) = other.query_template {
            self.query_template = v;
        }
    }
}
