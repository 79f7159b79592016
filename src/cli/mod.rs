//! Command-line interface for sysmend
//!
//! Provides main commands:
//! - `channel` - Verify and repair the domain secure channel
//! - `network` - Write a configuration value that follows the network location
//! - `status` - Show both probes without changing anything

mod channel;
mod network;
mod status;

pub use channel::run_channel;
pub use network::run_network;
pub use status::run_status;

use crate::config::{Config, StoreKind};
use crate::credential::CredentialSource;
use crate::error::{MendError, MendResult};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

/// sysmend - poll, detect and repair Windows machine state
#[derive(Parser, Debug)]
#[command(name = "sysmend")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Append a transcript of this run to a file
    #[arg(long = "logFile", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log corrective actions instead of performing them
    #[arg(long = "dryRun", global = true, default_value_t = false)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify the machine's trust relationship and repair it when broken
    Channel(ChannelArgs),

    /// Track the network location and write the matching value
    Network(NetworkArgs),

    /// Show secure channel and network location
    Status(StatusArgs),
}

/// Arguments for channel command
#[derive(Parser, Debug, Default)]
pub struct ChannelArgs {
    /// Domain controller to verify and repair against
    #[arg(long)]
    pub target: Option<String>,

    /// Where the repair credential comes from
    #[arg(long = "credentialSource", value_enum)]
    pub credential_source: Option<CredentialSource>,

    /// Username (DOMAIN\user or user@domain)
    #[arg(long)]
    pub username: Option<String>,

    /// Password for inline credentials
    #[arg(long, env = "SYSMEND_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// TOML file with username and password
    #[arg(long = "credentialFile")]
    pub credential_file: Option<PathBuf>,

    /// Maximum attempts before giving up
    #[arg(long)]
    pub retries: Option<u32>,

    /// Pause between attempts
    #[arg(long = "retryDelaySeconds")]
    pub retry_delay_secs: Option<u64>,

    /// Re-check interval; 0 runs once
    #[arg(long = "intervalSeconds")]
    pub interval_secs: Option<u64>,
}

/// Arguments for network command
#[derive(Parser, Debug, Default)]
pub struct NetworkArgs {
    /// Regex a private profile name must match to count as home
    #[arg(long = "homePattern")]
    pub home_pattern: Option<String>,

    /// Where the value is written
    #[arg(long, value_enum)]
    pub store: Option<StoreKind>,

    /// JSON file used when --store file
    #[arg(long = "storePath")]
    pub store_path: Option<PathBuf>,

    /// Maximum attempts per cycle
    #[arg(long)]
    pub retries: Option<u32>,

    /// Pause between attempts
    #[arg(long = "retryDelaySeconds")]
    pub retry_delay_secs: Option<u64>,

    /// Poll interval; 0 runs once
    #[arg(long = "intervalSeconds")]
    pub interval_secs: Option<u64>,
}

/// Arguments for status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Domain controller to verify against
    #[arg(long)]
    pub target: Option<String>,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Apply channel flags on top of the loaded configuration
pub fn merge_channel(config: &Config, args: &ChannelArgs) -> MendResult<Config> {
    let mut merged = config.clone();
    let channel = &mut merged.channel;
    if let Some(ref target) = args.target {
        channel.target = Some(target.clone());
    }
    if let Some(source) = args.credential_source {
        channel.credential_source = source;
    }
    if let Some(ref username) = args.username {
        channel.username = Some(username.clone());
    }
    if let Some(ref file) = args.credential_file {
        channel.credential_file = Some(file.clone());
    }
    if let Some(retries) = args.retries {
        channel.retries = retries;
    }
    if let Some(delay) = args.retry_delay_secs {
        channel.retry_delay_secs = delay;
    }
    if let Some(interval) = args.interval_secs {
        channel.interval_secs = interval;
    }

    crate::config::validate(&merged).map_err(|e| MendError::InvalidArgument(format!("{:#}", e)))?;
    Ok(merged)
}

/// Apply network flags on top of the loaded configuration
pub fn merge_network(config: &Config, args: &NetworkArgs) -> MendResult<Config> {
    let mut merged = config.clone();
    let network = &mut merged.network;
    if let Some(ref pattern) = args.home_pattern {
        network.home_pattern = pattern.clone();
    }
    if let Some(store) = args.store {
        network.store = store;
    }
    if let Some(ref path) = args.store_path {
        network.store_path = path.clone();
    }
    if let Some(retries) = args.retries {
        network.retries = retries;
    }
    if let Some(delay) = args.retry_delay_secs {
        network.retry_delay_secs = delay;
    }
    if let Some(interval) = args.interval_secs {
        network.interval_secs = interval;
    }

    crate::config::validate(&merged).map_err(|e| MendError::InvalidArgument(format!("{:#}", e)))?;
    Ok(merged)
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
