//! Corrective actions and the actuators that perform them

use crate::credential::{self, Credential, CredentialRequest};
use crate::error::{MendError, MendResult};
use crate::platform::powershell::{quote, PowerShell, ScriptOutput};
use crate::platform::{ConfigStore, StoreValue};
use crate::probe::trust::parse_verdict;
use crate::probe::{NetworkLocation, TrustState};
use std::fmt;
use tracing::{debug, info, warn};

/// A single external mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairAction {
    /// Reset the machine account password with a domain credential
    RepairSecureChannel { target: Option<String> },
    /// Record a healthy channel, nothing to change
    RecordHealthy,
    /// Write one configuration value
    WriteValue {
        key: String,
        name: String,
        value: StoreValue,
    },
}

impl fmt::Display for RepairAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairAction::RepairSecureChannel { target: Some(dc) } => {
                write!(f, "repair secure channel against {}", dc)
            },
            RepairAction::RepairSecureChannel { target: None } => {
                write!(f, "repair secure channel")
            },
            RepairAction::RecordHealthy => write!(f, "record healthy secure channel"),
            RepairAction::WriteValue { key, name, value } => {
                write!(f, "set {}\\{} to {}", key, name, value)
            },
        }
    }
}

/// Performs corrective actions for observations of type `S`
#[allow(async_fn_in_trait)]
pub trait Actuator<S> {
    /// Bring the system in line with `state`; must be idempotent
    async fn apply(&mut self, state: &S) -> MendResult<()>;

    /// Try to move an unsettled observation towards settled
    ///
    /// Returns whether a mutation was performed and the state should be
    /// probed again.
    async fn remediate(&mut self, _observed: &S) -> MendResult<bool> {
        Ok(false)
    }

    /// The mutation `apply` would perform
    fn plan_apply(&self, state: &S) -> RepairAction;

    /// The mutation `remediate` would perform, if any
    fn plan_remediate(&self, _observed: &S) -> Option<RepairAction> {
        None
    }

    /// Whether `apply` only reports what it would do
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Logs planned actions instead of performing them
///
/// Under a dry run the applied state tracks the planned value, so a polling
/// dry run reports each change once.
pub struct DryRun<A> {
    inner: A,
}

impl<A> DryRun<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> A {
        self.inner
    }
}

impl<S, A: Actuator<S>> Actuator<S> for DryRun<A> {
    async fn apply(&mut self, state: &S) -> MendResult<()> {
        info!("Dry run: would {}", self.inner.plan_apply(state));
        Ok(())
    }

    async fn remediate(&mut self, observed: &S) -> MendResult<bool> {
        if let Some(plan) = self.inner.plan_remediate(observed) {
            info!("Dry run: would {}", plan);
        }
        Ok(false)
    }

    fn plan_apply(&self, state: &S) -> RepairAction {
        self.inner.plan_apply(state)
    }

    fn plan_remediate(&self, observed: &S) -> Option<RepairAction> {
        self.inner.plan_remediate(observed)
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

/// Environment variables carrying the credential into the repair script
const USER_VAR: &str = "SYSMEND_REPAIR_USER";
const PASSWORD_VAR: &str = "SYSMEND_REPAIR_PASSWORD";

/// Error text that means the domain rejected the credential
const LOGON_FAILURES: &[&str] = &[
    "user name or password is incorrect",
    "logon failure",
    "access is denied",
    "unknown user name",
];

/// Build the repair command; the credential is read from the environment
pub fn repair_script(target: Option<&str>) -> String {
    let mut script = format!(
        "$pw = ConvertTo-SecureString $env:{} -AsPlainText -Force; \
         $cred = New-Object System.Management.Automation.PSCredential($env:{}, $pw); \
         Test-ComputerSecureChannel -Repair -Credential $cred",
        PASSWORD_VAR, USER_VAR
    );
    if let Some(server) = target {
        script.push_str(" -Server ");
        script.push_str(&quote(server));
    }
    script
}

/// Interpret the output of a repair run
pub fn classify_repair(output: &ScriptOutput) -> MendResult<()> {
    let stderr = output.stderr.to_lowercase();
    if LOGON_FAILURES.iter().any(|marker| stderr.contains(marker)) {
        return Err(MendError::CredentialInvalid(
            output.stderr.trim().to_string(),
        ));
    }

    match (output.success, parse_verdict(&output.stdout)) {
        (true, Some(true)) => Ok(()),
        (_, Some(false)) => Err(MendError::ApplyFailed(
            "secure channel repair returned False".into(),
        )),
        _ => Err(MendError::ApplyFailed(format!(
            "secure channel repair failed: {}",
            output.stderr.trim()
        ))),
    }
}

/// Repairs the secure channel with a domain credential
///
/// The credential is resolved on first use, so a healthy channel never
/// prompts.
pub struct ChannelRepair {
    shell: PowerShell,
    target: Option<String>,
    request: CredentialRequest,
    credential: Option<Credential>,
    repairs: u32,
}

impl ChannelRepair {
    pub fn new(shell: PowerShell, target: Option<String>, request: CredentialRequest) -> Self {
        Self {
            shell,
            target,
            request,
            credential: None,
            repairs: 0,
        }
    }

    /// Repair calls made so far
    pub fn repairs(&self) -> u32 {
        self.repairs
    }

    fn credential(&mut self) -> MendResult<Credential> {
        if let Some(ref cred) = self.credential {
            return Ok(cred.clone());
        }
        let cred = credential::resolve(&self.request)?;
        debug!("Resolved {} credential for {}", self.request.source, cred.username());
        self.credential = Some(cred.clone());
        Ok(cred)
    }

    async fn repair(&mut self) -> MendResult<()> {
        let cred = self.credential()?;
        let script = repair_script(self.target.as_deref());

        let action = RepairAction::RepairSecureChannel {
            target: self.target.clone(),
        };
        info!("Executing repair: {}", action);
        self.repairs += 1;
        let output = self
            .shell
            .run(
                &script,
                &[(USER_VAR, cred.username()), (PASSWORD_VAR, cred.password())],
            )
            .await
            .map_err(|e| MendError::ApplyFailed(format!("cannot start PowerShell: {}", e)))?;

        classify_repair(&output)
    }
}

impl Actuator<TrustState> for ChannelRepair {
    async fn apply(&mut self, state: &TrustState) -> MendResult<()> {
        match state {
            TrustState::Healthy => {
                debug!("Secure channel healthy, nothing to repair");
                Ok(())
            },
            // settle mode repairs in `remediate` and only applies healthy states
            TrustState::Broken => Err(MendError::ApplyFailed(
                "broken secure channel is remediated, not applied".into(),
            )),
        }
    }

    async fn remediate(&mut self, observed: &TrustState) -> MendResult<bool> {
        match observed {
            TrustState::Healthy => Ok(false),
            TrustState::Broken => {
                warn!("Secure channel broken, attempting repair");
                self.repair().await?;
                Ok(true)
            },
        }
    }

    fn plan_apply(&self, state: &TrustState) -> RepairAction {
        match state {
            TrustState::Healthy => RepairAction::RecordHealthy,
            TrustState::Broken => RepairAction::RepairSecureChannel {
                target: self.target.clone(),
            },
        }
    }

    fn plan_remediate(&self, observed: &TrustState) -> Option<RepairAction> {
        match observed {
            TrustState::Healthy => None,
            TrustState::Broken => Some(RepairAction::RepairSecureChannel {
                target: self.target.clone(),
            }),
        }
    }
}

/// Value written for each location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueMapping {
    pub key: String,
    pub name: String,
    pub home: StoreValue,
    pub away: StoreValue,
}

impl ValueMapping {
    pub fn value_for(&self, location: NetworkLocation) -> &StoreValue {
        match location {
            NetworkLocation::Home => &self.home,
            NetworkLocation::Away => &self.away,
        }
    }
}

/// Writes the location's value into a configuration store
pub struct RegistryActuator<St> {
    store: St,
    mapping: ValueMapping,
    writes: u32,
}

impl<St: ConfigStore> RegistryActuator<St> {
    pub fn new(store: St, mapping: ValueMapping) -> Self {
        Self {
            store,
            mapping,
            writes: 0,
        }
    }

    /// Writes actually issued to the store
    pub fn writes(&self) -> u32 {
        self.writes
    }
}

impl<St: ConfigStore> Actuator<NetworkLocation> for RegistryActuator<St> {
    async fn apply(&mut self, location: &NetworkLocation) -> MendResult<()> {
        let value = self.mapping.value_for(*location).clone();
        let existing = self.store.read(&self.mapping.key, &self.mapping.name).await?;

        if existing.as_ref() == Some(&value) {
            debug!(
                "{}\\{} already {}, skipping write",
                self.mapping.key, self.mapping.name, value
            );
            return Ok(());
        }

        self.store
            .write(&self.mapping.key, &self.mapping.name, &value)
            .await?;
        self.writes += 1;
        Ok(())
    }

    fn plan_apply(&self, location: &NetworkLocation) -> RepairAction {
        RepairAction::WriteValue {
            key: self.mapping.key.clone(),
            name: self.mapping.name.clone(),
            value: self.mapping.value_for(*location).clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::FileStore;

    fn output(success: bool, stdout: &str, stderr: &str) -> ScriptOutput {
        ScriptOutput {
            success,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    fn mapping() -> ValueMapping {
        ValueMapping {
            key: "HKCU\\Software\\sysmend".into(),
            name: "NetworkLocation".into(),
            home: StoreValue::String("Home".into()),
            away: StoreValue::String("Away".into()),
        }
    }

    #[test]
    fn test_classify_repair() {
        assert!(classify_repair(&output(true, "True\r\n", "")).is_ok());
        assert!(matches!(
            classify_repair(&output(true, "False\r\n", "")),
            Err(MendError::ApplyFailed(_))
        ));
        assert!(matches!(
            classify_repair(&output(false, "", "The user name or password is incorrect.")),
            Err(MendError::CredentialInvalid(_))
        ));
        assert!(matches!(
            classify_repair(&output(false, "", "The RPC server is unavailable.")),
            Err(MendError::ApplyFailed(_))
        ));
    }

    #[test]
    fn test_repair_script_keeps_password_out_of_command() {
        let script = repair_script(Some("dc01"));
        assert!(script.contains("$env:SYSMEND_REPAIR_PASSWORD"));
        assert!(script.ends_with("-Server 'dc01'"));
    }

    #[test]
    fn test_action_display() {
        let action = RepairAction::WriteValue {
            key: "HKCU\\Software\\sysmend".into(),
            name: "Flag".into(),
            value: StoreValue::Dword(1),
        };
        assert_eq!(action.to_string(), "set HKCU\\Software\\sysmend\\Flag to 1");
    }

    #[tokio::test]
    async fn test_broken_channel_is_not_applied() {
        let request = CredentialRequest {
            source: credential::CredentialSource::Inline,
            username: Some("CORP\\admin".into()),
            password: Some("s3cret".into()),
            file: None,
        };
        let mut repair = ChannelRepair::new(PowerShell::new("sysmend-no-such-shell"), None, request);

        assert!(repair.apply(&TrustState::Healthy).await.is_ok());
        assert!(matches!(
            repair.apply(&TrustState::Broken).await,
            Err(MendError::ApplyFailed(_))
        ));
        assert_eq!(repair.repairs(), 0);
    }

    #[tokio::test]
    async fn test_apply_twice_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut actuator = RegistryActuator::new(FileStore::new(dir.path().join("s.json")), mapping());

        actuator.apply(&NetworkLocation::Home).await.unwrap();
        let after_first = std::fs::read_to_string(dir.path().join("s.json")).unwrap();
        actuator.apply(&NetworkLocation::Home).await.unwrap();
        let after_second = std::fs::read_to_string(dir.path().join("s.json")).unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(actuator.writes(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        let mut actuator = DryRun::new(RegistryActuator::new(FileStore::new(&path), mapping()));

        actuator.apply(&NetworkLocation::Away).await.unwrap();
        assert!(!actuator.remediate(&NetworkLocation::Away).await.unwrap());
        assert!(!path.exists());
        assert_eq!(actuator.into_inner().writes(), 0);
    }
}
