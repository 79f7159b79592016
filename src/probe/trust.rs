//! Domain secure-channel probing

use super::{Observation, Prober};
use crate::error::{MendError, MendResult};
use crate::platform::powershell::{quote, PowerShell};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Health of the machine's trust relationship with its domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustState {
    /// Secure channel verified
    Healthy,
    /// Secure channel broken, repair needed
    Broken,
}

impl Observation for TrustState {
    fn is_settled(&self) -> bool {
        matches!(self, TrustState::Healthy)
    }
}

impl fmt::Display for TrustState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustState::Healthy => write!(f, "healthy"),
            TrustState::Broken => write!(f, "broken"),
        }
    }
}

/// Build the verification command, optionally pinned to one domain controller
pub fn verify_script(target: Option<&str>) -> String {
    match target {
        Some(server) => format!("Test-ComputerSecureChannel -Server {}", quote(server)),
        None => "Test-ComputerSecureChannel".to_string(),
    }
}

/// Interpret the boolean printed by `Test-ComputerSecureChannel`
pub fn parse_verdict(stdout: &str) -> Option<bool> {
    match stdout.lines().rev().map(str::trim).find(|l| !l.is_empty()) {
        Some(line) if line.eq_ignore_ascii_case("true") => Some(true),
        Some(line) if line.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Probes the secure channel through PowerShell
pub struct TrustProber {
    shell: PowerShell,
    target: Option<String>,
}

impl TrustProber {
    pub fn new(shell: PowerShell, target: Option<String>) -> Self {
        Self { shell, target }
    }
}

impl Prober for TrustProber {
    type Output = TrustState;

    async fn probe(&mut self) -> MendResult<TrustState> {
        let script = verify_script(self.target.as_deref());
        let output = self
            .shell
            .run(&script, &[])
            .await
            .map_err(|e| MendError::ProbeUnavailable(format!("cannot start PowerShell: {}", e)))?;

        if !output.success {
            return Err(MendError::ProbeUnavailable(format!(
                "secure channel query failed: {}",
                output.stderr.trim()
            )));
        }

        match parse_verdict(&output.stdout) {
            Some(true) => Ok(TrustState::Healthy),
            Some(false) => {
                debug!("Secure channel reported broken");
                Ok(TrustState::Broken)
            },
            None => Err(MendError::ProbeUnavailable(format!(
                "unexpected secure channel output: {:?}",
                output.stdout.trim()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verdict() {
        assert_eq!(parse_verdict("True\r\n"), Some(true));
        assert_eq!(parse_verdict("WARNING: slow\r\nFalse\r\n\r\n"), Some(false));
        assert_eq!(parse_verdict(""), None);
        assert_eq!(parse_verdict("Access denied"), None);
    }

    #[test]
    fn test_verify_script_target() {
        assert_eq!(verify_script(None), "Test-ComputerSecureChannel");
        assert_eq!(
            verify_script(Some("dc01.corp.example")),
            "Test-ComputerSecureChannel -Server 'dc01.corp.example'"
        );
    }

    #[test]
    fn test_only_healthy_is_settled() {
        assert!(TrustState::Healthy.is_settled());
        assert!(!TrustState::Broken.is_settled());
    }
}
