//! Command-line interface for netvault.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// netvault - scheduled configuration backups for network devices.
#[derive(Parser)]
#[command(name = "netvault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration directory holding devices.yaml and settings.yaml
    #[arg(short, long, env = "NETVAULT_CONFIG_DIR", default_value = "config")]
    pub config_dir: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long, env = "NETVAULT_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run a one-time backup now
    Backup,

    /// Start the recurring backup scheduler (blocks until interrupted)
    Schedule,

    /// Test connectivity to all configured devices
    Test,

    /// Show the loaded configuration
    Config,

    /// Show artifact statistics
    Stats,

    /// List stored artifacts, newest first
    List,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
