//! Status command - show secure channel and network location
//!
//! Read-only: runs both probes and prints what they see. Probe failures
//! are shown and then reported as the command's error.

use super::StatusArgs;
use crate::config::Config;
use crate::error::{MendError, MendResult};
use crate::platform::PowerShell;
use crate::probe::{classify, NetworkProber, NetworkProfile, Prober, TrustProber, TrustState};
use regex::Regex;

/// Run the status command
pub async fn run_status(config: &Config, args: &StatusArgs) -> MendResult<()> {
    let shell = PowerShell::new(config.platform.powershell.clone());
    let target = args.target.clone().or_else(|| config.channel.target.clone());
    let home_pattern = Regex::new(&config.network.home_pattern)
        .map_err(|e| MendError::InvalidArgument(format!("home pattern: {}", e)))?;

    let trust = TrustProber::new(shell.clone(), target.clone()).probe().await;
    let profiles = NetworkProber::new(shell, home_pattern.clone()).profiles().await;

    if args.format == "json" {
        let trust_json = match &trust {
            Ok(state) => serde_json::json!({ "state": state }),
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        let network_json = match &profiles {
            Ok(list) => serde_json::json!({
                "location": classify(list, &home_pattern),
                "profiles": list,
            }),
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        let status = serde_json::json!({
            "secure_channel": trust_json,
            "target": target,
            "network": network_json,
        });
        let rendered = serde_json::to_string_pretty(&status)
            .map_err(|e| MendError::InvalidArgument(format!("cannot render status: {}", e)))?;
        println!("{}", rendered);
    } else {
        render_text(&trust, target.as_deref(), &profiles, &home_pattern);
    }

    trust.and(profiles).map(|_| ())
}

fn render_text(
    trust: &MendResult<TrustState>,
    target: Option<&str>,
    profiles: &MendResult<Vec<NetworkProfile>>,
    home_pattern: &Regex,
) {
    println!("sysmend status");
    println!("==============");
    match trust {
        Ok(state) => println!("Secure channel: {}", state),
        Err(e) => println!("Secure channel: unknown ({})", e),
    }
    if let Some(dc) = target {
        println!("  Target:       {}", dc);
    }

    match profiles {
        Ok(list) => {
            println!("Network:        {}", classify(list, home_pattern));
            for profile in list {
                println!(
                    "  {:<24} {:<12} {:?}{}",
                    profile.name.as_deref().unwrap_or("<unnamed>"),
                    profile.interface_alias.as_deref().unwrap_or("-"),
                    profile.network_category,
                    if profile.is_active() { "" } else { " (inactive)" }
                );
            }
        },
        Err(e) => println!("Network:        unknown ({})", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXIT_FAILED;

    fn without_powershell() -> Config {
        let mut config = Config::default();
        config.platform.powershell = "sysmend-no-such-shell".into();
        config
    }

    #[tokio::test]
    async fn test_unavailable_platform_fails_the_command() {
        for format in ["text", "json"] {
            let args = StatusArgs {
                target: Some("dc01".into()),
                format: format.into(),
            };
            let err = run_status(&without_powershell(), &args).await.unwrap_err();
            assert!(matches!(err, MendError::ProbeUnavailable(_)), "{format}");
            assert_eq!(err.exit_code(), EXIT_FAILED);
        }
    }

    #[tokio::test]
    async fn test_bad_home_pattern_is_invalid() {
        let mut config = without_powershell();
        config.network.home_pattern = "(".into();
        let args = StatusArgs {
            target: None,
            format: "text".into(),
        };
        let err = run_status(&config, &args).await.unwrap_err();
        assert!(matches!(err, MendError::InvalidArgument(_)));
    }
}
