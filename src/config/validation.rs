//! Configuration validation
//!
//! Fail-fast validation of configuration invariants.

use super::Config;
use crate::credential::CredentialSource;
use crate::platform::registry::has_known_hive;
use anyhow::{bail, Context, Result};
use regex::Regex;

/// Validate configuration invariants
pub fn validate(config: &Config) -> Result<()> {
    validate_logging(config)?;
    validate_channel(config)?;
    validate_network(config)?;
    Ok(())
}

fn validate_logging(config: &Config) -> Result<()> {
    match config.logging.level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        other => bail!(
            "logging.level {:?} is not one of trace, debug, info, warn, error",
            other
        ),
    }
}

fn validate_channel(config: &Config) -> Result<()> {
    let channel = &config.channel;
    if channel.retries == 0 {
        bail!("channel.retries must be at least 1");
    }

    if let Some(ref target) = channel.target {
        if target.trim().is_empty() {
            bail!("channel.target cannot be empty");
        }
    }

    if channel.credential_source == CredentialSource::File && channel.credential_file.is_none() {
        bail!("channel.credential_file is required when credential_source = \"file\"");
    }

    Ok(())
}

fn validate_network(config: &Config) -> Result<()> {
    let network = &config.network;
    if network.retries == 0 {
        bail!("network.retries must be at least 1");
    }

    Regex::new(&network.home_pattern)
        .with_context(|| format!("network.home_pattern {:?} is not a valid regex", network.home_pattern))?;

    let registry = &network.registry;
    if !has_known_hive(&registry.key) {
        bail!(
            "network.registry.key {:?} must start with a hive such as HKLM or HKCU",
            registry.key
        );
    }
    if registry.value_name.is_empty() {
        bail!("network.registry.value_name cannot be empty");
    }
    registry.mapping().context("network.registry values")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_file_source_needs_path() {
        let mut config = Config::default();
        config.channel.credential_source = CredentialSource::File;
        assert!(validate(&config).is_err());

        config.channel.credential_file = Some(PathBuf::from("cred.toml"));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_bad_regex() {
        let mut config = Config::default();
        config.network.home_pattern = "(unclosed".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_key_without_hive() {
        let mut config = Config::default();
        config.network.registry.key = "Software\\sysmend".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(validate(&config).is_err());
    }
}
