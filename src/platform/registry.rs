//! Registry-backed store using `reg.exe`

use super::{ConfigStore, StoreValue};
use crate::error::{MendError, MendResult};
use tokio::process::Command;
use tracing::{debug, info};

/// Hive prefixes accepted by `reg.exe`
pub const HIVES: &[&str] = &[
    "HKLM",
    "HKCU",
    "HKCR",
    "HKU",
    "HKCC",
    "HKEY_LOCAL_MACHINE",
    "HKEY_CURRENT_USER",
    "HKEY_CLASSES_ROOT",
    "HKEY_USERS",
    "HKEY_CURRENT_CONFIG",
];

/// Whether a key path starts with a known hive
pub fn has_known_hive(key: &str) -> bool {
    let hive = key.split('\\').next().unwrap_or_default();
    HIVES.iter().any(|h| h.eq_ignore_ascii_case(hive))
}

/// Extract one value from `reg query` output
pub fn parse_query_value(stdout: &str, name: &str) -> Option<StoreValue> {
    stdout.lines().find_map(|line| {
        let mut fields = line.trim().splitn(3, "    ");
        let value_name = fields.next()?;
        if !value_name.eq_ignore_ascii_case(name) {
            return None;
        }
        let kind = fields.next()?.trim();
        let data = fields.next().unwrap_or_default().trim();

        match kind {
            "REG_DWORD" => {
                let digits = data.trim_start_matches("0x");
                u32::from_str_radix(digits, 16).ok().map(StoreValue::Dword)
            },
            k if k.starts_with("REG_") => Some(StoreValue::String(data.to_string())),
            _ => None,
        }
    })
}

fn type_flag(value: &StoreValue) -> &'static str {
    match value {
        StoreValue::String(_) => "REG_SZ",
        StoreValue::Dword(_) => "REG_DWORD",
    }
}

/// Windows registry accessed through `reg.exe`
#[derive(Debug, Clone)]
pub struct RegistryStore {
    program: String,
}

impl RegistryStore {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for RegistryStore {
    fn default() -> Self {
        Self::new("reg.exe")
    }
}

impl ConfigStore for RegistryStore {
    async fn read(&self, key: &str, name: &str) -> MendResult<Option<StoreValue>> {
        let output = Command::new(&self.program)
            .args(["query", key, "/v", name])
            .output()
            .await
            .map_err(|e| MendError::ProbeUnavailable(format!("cannot run {}: {}", self.program, e)))?;

        // reg.exe exits 1 when the key or value is missing
        if !output.status.success() {
            debug!("{}\\{} not present", key, name);
            return Ok(None);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_query_value(&stdout, name))
    }

    async fn write(&mut self, key: &str, name: &str, value: &StoreValue) -> MendResult<()> {
        let data = value.to_string();
        let output = Command::new(&self.program)
            .args(["add", key, "/v", name, "/t", type_flag(value), "/d", &data, "/f"])
            .output()
            .await
            .map_err(|e| MendError::ApplyFailed(format!("cannot run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(MendError::ApplyFailed(format!(
                "reg add {}\\{} failed: {}",
                key,
                name,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        info!("Registry {}\\{} set to {}", key, name, value);
        Ok(())
    }
}
