// lib/src/config/config_structs.rs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::config_defaults::*;

/// Backing engine of the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageEngineType {
    Sled,
    #[serde(alias = "in_memory", alias = "memory")]
    InMemory,
}

impl FromStr for StorageEngineType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sled" => Ok(StorageEngineType::Sled),
            "inmemory" | "in_memory" | "memory" => Ok(StorageEngineType::InMemory),
            _ => Err(anyhow::anyhow!("Unknown storage engine type: {}", s)),
        }
    }
}

impl fmt::Display for StorageEngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageEngineType::Sled => write!(f, "sled"),
            StorageEngineType::InMemory => write!(f, "inmemory"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestConfig {
    #[serde(default = "default_rest_host")]
    pub host: String,
    #[serde(default = "default_rest_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_secs", alias = "request-timeout-secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_cors_allow_any", alias = "cors-allow-any")]
    pub cors_allow_any: bool,
}

impl Default for RestConfig {
    fn default() -> Self {
        RestConfig {
            host: default_rest_host(),
            port: default_rest_port(),
            request_timeout_secs: default_request_timeout_secs(),
            cors_allow_any: default_cors_allow_any(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_engine_type", alias = "storage-engine-type")]
    pub storage_engine_type: StorageEngineType,
    #[serde(default = "default_data_directory", alias = "data-directory")]
    pub data_directory: PathBuf,
    #[serde(default = "default_cache_capacity", alias = "cache-capacity")]
    pub cache_capacity: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            storage_engine_type: default_storage_engine_type(),
            data_directory: default_data_directory(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        StorageConfig { storage_engine_type: StorageEngineType::InMemory, ..Default::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Advance the parent prescription to `Lab Test Completed` once every
    /// one of its lab reports is completed.
    #[serde(default = "default_propagate_lab_completion", alias = "propagate-lab-completion")]
    pub propagate_lab_completion: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        LifecycleConfig { propagate_lab_completion: default_propagate_lab_completion() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryConfig {
    #[serde(default = "default_critical_threshold", alias = "critical-threshold")]
    pub critical_threshold: u32,
    #[serde(default = "default_low_threshold", alias = "low-threshold")]
    pub low_threshold: u32,
    #[serde(default = "default_expiry_warning_days", alias = "expiry-warning-days")]
    pub expiry_warning_days: i64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        InventoryConfig {
            critical_threshold: default_critical_threshold(),
            low_threshold: default_low_threshold(),
            expiry_warning_days: default_expiry_warning_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_page_size", alias = "default-page-size")]
    pub default_page_size: usize,
    #[serde(default = "default_max_page_size", alias = "max-page-size")]
    pub max_page_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig { default_page_size: default_page_size(), max_page_size: default_max_page_size() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default = "default_jwt_secret", alias = "jwt-secret")]
    pub jwt_secret: String,
    /// Optional YAML file overriding the built-in role permissions.
    #[serde(default, alias = "roles-file")]
    pub roles_file: Option<PathBuf>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        SecurityConfig { jwt_secret: default_jwt_secret(), roles_file: None }
    }
}

/// Top-level service configuration as found in `hms_config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HmsConfig {
    #[serde(default)]
    pub rest: RestConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}
