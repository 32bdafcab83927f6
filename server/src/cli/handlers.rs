// server/src/cli/handlers.rs

// Handlers for the CLI subcommands.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Duration as TokenTtl;
use tokio::sync::oneshot;
use tracing::{info, warn};

use lib::config::{HmsConfig, StorageEngineType, DEFAULT_JWT_SECRET};
use lib::roster::{enroll, load_roster_yaml};
use lib::storage_engine::create_storage;
use models::medical::Role;
use security::{generate_token, Claims};

use crate::cli::commands::{EnrollArgs, ServeArgs, StatusArgs, TokenArgs};

/// Command-line flags override the file and the environment.
pub fn apply_serve_overrides(config: &mut HmsConfig, args: &ServeArgs) -> Result<()> {
    if let Some(port) = args.port {
        config.rest.port = port;
    }
    if let Some(host) = &args.host {
        config.rest.host = host.clone();
    }
    if let Some(dir) = &args.data_directory {
        config.storage.data_directory = dir.clone();
    }
    if let Some(engine) = &args.storage_engine_type {
        config.storage.storage_engine_type = engine.parse::<StorageEngineType>()?;
    }
    config.validate()
}

pub async fn handle_serve(mut config: HmsConfig, args: ServeArgs) -> Result<()> {
    apply_serve_overrides(&mut config, &args)?;
    info!(
        "Starting on {} with {} storage at {:?}",
        config.bind_address(),
        config.storage.storage_engine_type,
        config.storage.data_directory
    );

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            let _ = tx.send(());
        }
    });
    rest_api::start_server(config, rx).await
}

/// Probes `/health` and `/version` of a running instance.
pub async fn handle_status(config: &HmsConfig, args: StatusArgs) -> Result<()> {
    let base = args
        .url
        .unwrap_or_else(|| format!("http://{}", config.bind_address()))
        .trim_end_matches('/')
        .to_string();
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    println!("\n--- REST API Status ---");
    println!("{:<15} {:<30} {:<40}", "Status", "Address", "Details");
    println!("{:-<15} {:-<30} {:-<40}", "", "", "");

    let (status, details) = match client.get(format!("{}/api/v1/health", base)).send().await {
        Ok(resp) if resp.status().is_success() => {
            let health: serde_json::Value = resp.json().await.unwrap_or_default();
            let storage = health["storage"].as_str().unwrap_or("N/A").to_string();
            let version = match client.get(format!("{}/api/v1/version", base)).send().await {
                Ok(v_resp) if v_resp.status().is_success() => {
                    let v_json: serde_json::Value = v_resp.json().await.unwrap_or_default();
                    v_json["version"].as_str().unwrap_or("N/A").to_string()
                }
                _ => "N/A".to_string(),
            };
            ("Running", format!("Storage: {}; Version: {}", storage, version))
        }
        Ok(resp) => ("Down", format!("HTTP {}", resp.status())),
        Err(e) if e.is_timeout() => ("Down", format!("no answer within {}s", args.timeout_secs)),
        Err(e) => ("Down", e.to_string()),
    };
    println!("{:<15} {:<30} {:<40}", status, base, details);
    println!("--------------------------------------------------");
    Ok(())
}

/// Signs a token with the configured secret. Development use only; real
/// tokens come from the identity provider.
pub fn mint_token(config: &HmsConfig, args: &TokenArgs) -> Result<String> {
    let role = args.role.parse::<Role>()?;
    if config.security.jwt_secret == DEFAULT_JWT_SECRET {
        warn!("Minting a token with the built-in development secret");
    }
    let mut claims = Claims::new(args.sub.trim(), role, TokenTtl::hours(args.ttl_hours));
    claims.email = args.email.clone();
    generate_token(&claims, &config.security.jwt_secret).context("Failed to sign token")
}

pub fn handle_token(config: &HmsConfig, args: TokenArgs) -> Result<()> {
    println!("{}", mint_token(config, &args)?);
    Ok(())
}

pub async fn handle_enroll(config: &HmsConfig, args: EnrollArgs) -> Result<usize> {
    let rows = load_roster_yaml(&args.roster)?;
    let store = create_storage(&config.storage)?;
    let stored = enroll(store.as_ref(), rows).await?;
    store.flush().await.context("Failed to flush the record store")?;
    println!("Enrolled {} student(s) from {:?}", stored, args.roster);
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib::config::StorageConfig;
    use security::validate_token;
    use std::path::PathBuf;

    #[test]
    fn serve_flags_override_config() {
        let mut config = HmsConfig::default();
        let args = ServeArgs {
            port: Some(9100),
            host: Some("0.0.0.0".into()),
            data_directory: Some(PathBuf::from("/tmp/hms-test")),
            storage_engine_type: Some("inmemory".into()),
        };
        apply_serve_overrides(&mut config, &args).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:9100");
        assert_eq!(config.storage.storage_engine_type, StorageEngineType::InMemory);

        let bad = ServeArgs { storage_engine_type: Some("rocksdb".into()), ..ServeArgs::default() };
        assert!(apply_serve_overrides(&mut config, &bad).is_err());
    }

    #[test]
    fn minted_token_validates() {
        let config = HmsConfig::default();
        let args = TokenArgs { sub: "R200137".into(), role: "student".into(), email: None, ttl_hours: 1 };
        let token = mint_token(&config, &args).unwrap();
        let claims = validate_token(&token, &config.security.jwt_secret).unwrap();
        assert_eq!(claims.sub, "R200137");
        assert_eq!(claims.actor().unwrap().role, Role::Student);

        let unknown = TokenArgs { role: "janitor".into(), ..args };
        assert!(mint_token(&config, &unknown).is_err());
    }

    #[tokio::test]
    async fn enroll_writes_to_the_configured_store() {
        let dir = tempfile::tempdir().unwrap();
        let roster = dir.path().join("roster.yaml");
        std::fs::write(&roster, "students:\n  - id: R200137\n    name: Anil\n  - id: r200142\n    name: Bhavana\n").unwrap();
        let config = HmsConfig {
            storage: StorageConfig {
                storage_engine_type: StorageEngineType::Sled,
                data_directory: dir.path().join("db"),
                ..StorageConfig::default()
            },
            ..HmsConfig::default()
        };
        let stored = handle_enroll(&config, EnrollArgs { roster }).await.unwrap();
        assert_eq!(stored, 2);
    }
}
