//! Configuration loading and validation
//!
//! Handles TOML configuration parsing with strict validation. Every
//! recognised option has a default, so running without a file works.
//! Command-line flags are layered on top by the `cli` module and the
//! result is validated again.

pub mod file;
mod validation;

pub use file::{load, load_from_path};
pub use validation::validate;

use crate::credential::CredentialSource;
use crate::platform::StoreValue;
use crate::repair::ValueMapping;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Log output and transcript
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Transcript file, appended to for each run
    pub file: Option<PathBuf>,
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: default_level(),
        }
    }
}

/// External programs used to reach the platform
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_powershell")]
    pub powershell: String,
    #[serde(default = "default_reg")]
    pub reg: String,
}

fn default_powershell() -> String {
    "powershell.exe".to_string()
}
fn default_reg() -> String {
    "reg.exe".to_string()
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            powershell: default_powershell(),
            reg: default_reg(),
        }
    }
}

/// Secure-channel repair settings
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Domain controller to verify and repair against
    pub target: Option<String>,
    #[serde(default = "default_credential_source")]
    pub credential_source: CredentialSource,
    /// Username for inline or interactive credentials
    pub username: Option<String>,
    /// TOML file holding `username` and `password`
    pub credential_file: Option<PathBuf>,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_channel_delay")]
    pub retry_delay_secs: u64,
    /// Re-check interval, zero runs once
    #[serde(default)]
    pub interval_secs: u64,
}

fn default_credential_source() -> CredentialSource {
    CredentialSource::Interactive
}
fn default_retries() -> u32 {
    3
}
fn default_channel_delay() -> u64 {
    10
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            target: None,
            credential_source: default_credential_source(),
            username: None,
            credential_file: None,
            retries: default_retries(),
            retry_delay_secs: default_channel_delay(),
            interval_secs: 0,
        }
    }
}

/// Backend holding the network-location value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Windows registry through `reg.exe`
    Registry,
    /// JSON file at `store_path`
    File,
}

/// Network-profile actioner settings
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Poll interval, zero runs once
    #[serde(default)]
    pub interval_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_network_delay")]
    pub retry_delay_secs: u64,
    /// Regex a trusted profile name must match to count as home
    #[serde(default = "default_home_pattern")]
    pub home_pattern: String,
    #[serde(default = "default_store")]
    pub store: StoreKind,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default)]
    pub registry: RegistryValueConfig,
}

fn default_network_delay() -> u64 {
    5
}
fn default_home_pattern() -> String {
    ".*".to_string()
}
fn default_store() -> StoreKind {
    StoreKind::Registry
}
fn default_store_path() -> PathBuf {
    PathBuf::from("sysmend-store.json")
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            interval_secs: 0,
            retries: default_retries(),
            retry_delay_secs: default_network_delay(),
            home_pattern: default_home_pattern(),
            store: default_store(),
            store_path: default_store_path(),
            registry: RegistryValueConfig::default(),
        }
    }
}

/// Type of the written value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Dword,
}

/// The one value the network actioner writes
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryValueConfig {
    #[serde(default = "default_key")]
    pub key: String,
    #[serde(default = "default_value_name")]
    pub value_name: String,
    #[serde(default = "default_kind")]
    pub kind: ValueKind,
    /// Data written when at home
    #[serde(default = "default_home")]
    pub home: String,
    /// Data written when away
    #[serde(default = "default_away")]
    pub away: String,
}

fn default_key() -> String {
    "HKCU\\Software\\sysmend".to_string()
}
fn default_value_name() -> String {
    "NetworkLocation".to_string()
}
fn default_kind() -> ValueKind {
    ValueKind::String
}
fn default_home() -> String {
    "Home".to_string()
}
fn default_away() -> String {
    "Away".to_string()
}

impl Default for RegistryValueConfig {
    fn default() -> Self {
        Self {
            key: default_key(),
            value_name: default_value_name(),
            kind: default_kind(),
            home: default_home(),
            away: default_away(),
        }
    }
}

impl RegistryValueConfig {
    fn typed(&self, data: &str) -> Result<StoreValue> {
        match self.kind {
            ValueKind::String => Ok(StoreValue::String(data.to_string())),
            ValueKind::Dword => {
                let parsed = match data.strip_prefix("0x") {
                    Some(hex) => u32::from_str_radix(hex, 16),
                    None => data.parse::<u32>(),
                };
                parsed
                    .map(StoreValue::Dword)
                    .with_context(|| format!("{:?} is not a valid DWORD", data))
            },
        }
    }

    /// Typed mapping from location to value
    pub fn mapping(&self) -> Result<ValueMapping> {
        Ok(ValueMapping {
            key: self.key.clone(),
            name: self.value_name.clone(),
            home: self.typed(&self.home)?,
            away: self.typed(&self.away)?,
        })
    }
}
