// server/src/main.rs

// Entry point of the prescription lifecycle service. Parses the command line
// and dispatches to the CLI handlers.

use anyhow::Result;
use hms_server::cli::start_cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG wins; otherwise info. `log` records from the core crate are bridged.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    start_cli().await
}
