// server/src/cli/commands.rs

// Command-line arguments and subcommands of the service binary.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hms-server")]
#[command(version)]
#[command(about = "Hospital prescription lifecycle service")]
pub struct CliArgs {
    /// YAML configuration file. Defaults to $HMS_CONFIG, then ./config/hms_config.yaml.
    #[arg(long, short = 'c', global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: HmsCommands,
}

#[derive(Subcommand, Debug)]
pub enum HmsCommands {
    /// Run the REST API
    Serve(ServeArgs),
    /// Probe a running instance
    Status(StatusArgs),
    /// Mint a development bearer token
    Token(TokenArgs),
    /// Import a student roster
    Enroll(EnrollArgs),
}

#[derive(Debug, Args, Default)]
pub struct ServeArgs {
    #[arg(long, short = 'p')]
    pub port: Option<u16>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub data_directory: Option<PathBuf>,
    /// `sled` or `inmemory`
    #[arg(long)]
    pub storage_engine_type: Option<String>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Base URL; defaults to the configured host and port.
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long, default_value_t = 2)]
    pub timeout_secs: u64,
}

#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Staff id, or the student identifier for students.
    #[arg(long)]
    pub sub: String,
    #[arg(long)]
    pub role: String,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long, default_value_t = 12)]
    pub ttl_hours: i64,
}

#[derive(Debug, Args)]
pub struct EnrollArgs {
    /// YAML file with a top-level `students:` list.
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub roster: PathBuf,
}
