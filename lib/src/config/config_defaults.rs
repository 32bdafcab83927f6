// lib/src/config/config_defaults.rs

use std::path::PathBuf;

pub use crate::config::config_constants::*;
use crate::config::config_structs::StorageEngineType;

pub fn default_rest_host() -> String { DEFAULT_REST_API_HOST.to_string() }
pub fn default_rest_port() -> u16 { DEFAULT_REST_API_PORT }
pub fn default_request_timeout_secs() -> u64 { DEFAULT_REQUEST_TIMEOUT_SECS }
pub fn default_cors_allow_any() -> bool { true }

pub fn default_storage_engine_type() -> StorageEngineType { StorageEngineType::Sled }
pub fn default_data_directory() -> PathBuf { PathBuf::from(DEFAULT_DATA_DIRECTORY) }
pub fn default_cache_capacity() -> u64 { 64 * 1024 * 1024 }

pub fn default_propagate_lab_completion() -> bool { false }

pub fn default_critical_threshold() -> u32 { DEFAULT_CRITICAL_STOCK_THRESHOLD }
pub fn default_low_threshold() -> u32 { DEFAULT_LOW_STOCK_THRESHOLD }
pub fn default_expiry_warning_days() -> i64 { DEFAULT_EXPIRY_WARNING_DAYS }

pub fn default_page_size() -> usize { DEFAULT_PAGE_SIZE }
pub fn default_max_page_size() -> usize { DEFAULT_MAX_PAGE_SIZE }

pub fn default_jwt_secret() -> String { DEFAULT_JWT_SECRET.to_string() }
