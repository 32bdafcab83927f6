// lib/src/config/config_helpers.rs

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde_yaml2 as serde_yaml;

use crate::config::config_constants::*;
use crate::config::config_structs::{HmsConfig, StorageEngineType};

impl HmsConfig {
    /// Reads a YAML config file. Comment and blank lines are dropped before
    /// parsing; an empty file yields the defaults.
    pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        debug!("Raw YAML content from {:?}:\n{}", path, content);
        Self::from_yaml_str(&content).with_context(|| format!("Failed to parse config file {:?}", path))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let cleaned_content = content
            .lines()
            .filter(|line| {
                let trimmed = line.trim();
                !trimmed.is_empty() && !trimmed.starts_with('#')
            })
            .collect::<Vec<&str>>()
            .join("\n");
        if cleaned_content.is_empty() {
            return Ok(HmsConfig::default());
        }
        let config: HmsConfig = serde_yaml::from_str(&cleaned_content)
            .map_err(|e| anyhow::anyhow!("Invalid YAML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `.env`, then the YAML file (explicit path, `HMS_CONFIG`, or the
    /// default location when present), then applies `HMS_*` overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let resolved: Option<PathBuf> = path
            .map(Path::to_path_buf)
            .or_else(|| env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from))
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                default.exists().then_some(default)
            });

        let mut config = match resolved {
            Some(p) => {
                info!("Loading configuration from {:?}", p);
                Self::load_from_yaml(&p)?
            }
            None => {
                info!("No configuration file found, using defaults");
                HmsConfig::default()
            }
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = env::var(ENV_REST_HOST) {
            self.rest.host = host;
        }
        if let Ok(port) = env::var(ENV_REST_PORT) {
            self.rest.port = port
                .parse()
                .with_context(|| format!("{} must be a port number, got '{}'", ENV_REST_PORT, port))?;
        }
        if let Ok(dir) = env::var(ENV_DATA_DIRECTORY) {
            self.storage.data_directory = PathBuf::from(dir);
        }
        if let Ok(engine) = env::var(ENV_STORAGE_ENGINE) {
            self.storage.storage_engine_type = engine.parse::<StorageEngineType>()?;
        }
        if let Ok(secret) = env::var(ENV_JWT_SECRET) {
            self.security.jwt_secret = secret;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.inventory.critical_threshold > self.inventory.low_threshold {
            anyhow::bail!(
                "inventory.critical_threshold ({}) must not exceed inventory.low_threshold ({})",
                self.inventory.critical_threshold,
                self.inventory.low_threshold
            );
        }
        if self.query.default_page_size == 0 || self.query.max_page_size == 0 {
            anyhow::bail!("query page sizes must be positive");
        }
        if self.security.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("Using the built-in development JWT secret; set {} in production", ENV_JWT_SECRET);
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.rest.host, self.rest.port)
    }
}
