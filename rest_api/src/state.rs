// rest_api/src/state.rs

use std::sync::Arc;

use anyhow::{Context, Result};

use lib::config::HmsConfig;
use lib::HmsServices;
use security::RolesConfig;

/// Shared state for the Axum application
#[derive(Clone)]
pub struct AppState {
    pub services: HmsServices,
    pub roles: Arc<RolesConfig>,
    pub jwt_secret: Arc<String>,
}

impl AppState {
    pub fn new(services: HmsServices, roles: RolesConfig, jwt_secret: impl Into<String>) -> Self {
        AppState { services, roles: Arc::new(roles), jwt_secret: Arc::new(jwt_secret.into()) }
    }

    /// Opens the configured store and loads role permissions.
    pub fn from_config(config: &HmsConfig) -> Result<Self> {
        let services = HmsServices::from_config(config).context("Failed to initialize services")?;
        let roles = RolesConfig::load(config.security.roles_file.as_deref()).context("Failed to load role permissions")?;
        Ok(Self::new(services, roles, config.security.jwt_secret.clone()))
    }
}
