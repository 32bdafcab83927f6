// server/src/cli/mod.rs

pub mod commands;
pub mod handlers;

use anyhow::Result;
use clap::Parser;

use lib::config::HmsConfig;

pub use commands::{CliArgs, EnrollArgs, HmsCommands, ServeArgs, StatusArgs, TokenArgs};
pub use handlers::{apply_serve_overrides, handle_enroll, handle_serve, handle_status, handle_token, mint_token};

/// Parses the command line, loads the configuration and runs the subcommand.
pub async fn start_cli() -> Result<()> {
    let args = CliArgs::parse();
    let config = HmsConfig::load(args.config.as_deref())?;
    match args.command {
        HmsCommands::Serve(serve) => handle_serve(config, serve).await,
        HmsCommands::Status(status) => handle_status(&config, status).await,
        HmsCommands::Token(token) => handle_token(&config, token),
        HmsCommands::Enroll(roster) => handle_enroll(&config, roster).await.map(|_| ()),
    }
}
