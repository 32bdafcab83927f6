// lib/src/config/config_constants.rs

pub const DEFAULT_CONFIG_PATH: &str = "./config/hms_config.yaml";
pub const DEFAULT_DATA_DIRECTORY: &str = "./data/hms";
pub const DEFAULT_REST_API_HOST: &str = "127.0.0.1";
pub const DEFAULT_REST_API_PORT: u16 = 8082;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_JWT_SECRET: &str = "change-me-hms-development-secret-32b";

pub const DEFAULT_CRITICAL_STOCK_THRESHOLD: u32 = 10;
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 50;
pub const DEFAULT_EXPIRY_WARNING_DAYS: i64 = 90;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

pub const ENV_CONFIG_PATH: &str = "HMS_CONFIG";
pub const ENV_REST_PORT: &str = "HMS_PORT";
pub const ENV_REST_HOST: &str = "HMS_HOST";
pub const ENV_DATA_DIRECTORY: &str = "HMS_DATA_DIR";
pub const ENV_STORAGE_ENGINE: &str = "HMS_STORAGE_ENGINE";
pub const ENV_JWT_SECRET: &str = "HMS_JWT_SECRET";
