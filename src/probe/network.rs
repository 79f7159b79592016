//! Network-category probing
//!
//! Enumerates connection profiles and reduces them to a single
//! [`NetworkLocation`]. A machine is at home when at least one active
//! profile is private (or domain-authenticated) and its name matches the
//! configured home pattern. Everything else is away, including the case
//! where no profile is active at all.

use super::{Observation, Prober};
use crate::error::{MendError, MendResult};
use crate::platform::powershell::PowerShell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

/// Enumerates profiles with enum fields rendered as names
pub const PROFILE_SCRIPT: &str = "ConvertTo-Json -Compress -InputObject @(Get-NetConnectionProfile | \
ForEach-Object { [pscustomobject]@{ Name = $_.Name; InterfaceAlias = $_.InterfaceAlias; \
NetworkCategory = \"$($_.NetworkCategory)\"; IPv4Connectivity = \"$($_.IPv4Connectivity)\"; \
IPv6Connectivity = \"$($_.IPv6Connectivity)\" } })";

/// Where the machine currently is, as far as policy is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkLocation {
    Home,
    Away,
}

impl Observation for NetworkLocation {
    fn is_settled(&self) -> bool {
        matches!(self, NetworkLocation::Home)
    }
}

impl fmt::Display for NetworkLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkLocation::Home => write!(f, "home"),
            NetworkLocation::Away => write!(f, "away"),
        }
    }
}

/// Category assigned to a connection profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum NetworkCategory {
    Public,
    Private,
    DomainAuthenticated,
    #[serde(other)]
    Unknown,
}

/// Connectivity level of one address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Connectivity {
    Disconnected,
    NoTraffic,
    Subnet,
    LocalNetwork,
    Internet,
    #[serde(other)]
    Unknown,
}

impl Connectivity {
    fn is_connected(self) -> bool {
        matches!(
            self,
            Connectivity::Subnet | Connectivity::LocalNetwork | Connectivity::Internet
        )
    }
}

/// One connection profile as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub interface_alias: Option<String>,
    pub network_category: NetworkCategory,
    #[serde(rename = "IPv4Connectivity")]
    pub ipv4_connectivity: Connectivity,
    #[serde(rename = "IPv6Connectivity")]
    pub ipv6_connectivity: Connectivity,
}

impl NetworkProfile {
    /// Profile carries traffic on either address family
    pub fn is_active(&self) -> bool {
        self.ipv4_connectivity.is_connected() || self.ipv6_connectivity.is_connected()
    }

    /// Category that may count as home
    pub fn is_trusted(&self) -> bool {
        matches!(
            self.network_category,
            NetworkCategory::Private | NetworkCategory::DomainAuthenticated
        )
    }
}

/// Parse profile JSON; accepts an array, a single object or empty output
pub fn parse_profiles(stdout: &str) -> MendResult<Vec<NetworkProfile>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<NetworkProfile>),
        One(NetworkProfile),
    }

    match serde_json::from_str::<OneOrMany>(trimmed) {
        Ok(OneOrMany::Many(profiles)) => Ok(profiles),
        Ok(OneOrMany::One(profile)) => Ok(vec![profile]),
        Err(e) => Err(MendError::ProbeUnavailable(format!(
            "cannot parse connection profiles: {}",
            e
        ))),
    }
}

/// Reduce a set of profiles to a location
pub fn classify(profiles: &[NetworkProfile], home_pattern: &Regex) -> NetworkLocation {
    let home = profiles.iter().filter(|p| p.is_active()).any(|p| {
        let name = p.name.as_deref().unwrap_or_default();
        let matched = p.is_trusted() && home_pattern.is_match(name);
        trace!(
            "Profile {:?} ({:?}) category={:?} home={}",
            name,
            p.interface_alias,
            p.network_category,
            matched
        );
        matched
    });

    if home {
        NetworkLocation::Home
    } else {
        NetworkLocation::Away
    }
}

/// Probes connection profiles through PowerShell
pub struct NetworkProber {
    shell: PowerShell,
    home_pattern: Regex,
}

impl NetworkProber {
    pub fn new(shell: PowerShell, home_pattern: Regex) -> Self {
        Self {
            shell,
            home_pattern,
        }
    }

    /// Fetch the raw profile list
    pub async fn profiles(&self) -> MendResult<Vec<NetworkProfile>> {
        let output = self.shell.run(PROFILE_SCRIPT, &[]).await.map_err(|e| {
            MendError::ProbeUnavailable(format!("cannot start PowerShell: {}", e))
        })?;

        if !output.success {
            return Err(MendError::ProbeUnavailable(format!(
                "connection profile query failed: {}",
                output.stderr.trim()
            )));
        }

        parse_profiles(&output.stdout)
    }
}

impl Prober for NetworkProber {
    type Output = NetworkLocation;

    async fn probe(&mut self) -> MendResult<NetworkLocation> {
        let profiles = self.profiles().await?;
        let location = classify(&profiles, &self.home_pattern);
        debug!(
            "{} profile(s), {} active, location {}",
            profiles.len(),
            profiles.iter().filter(|p| p.is_active()).count(),
            location
        );
        Ok(location)
    }
}
