//! PowerShell process runner

use std::io;
use tokio::process::Command;
use tracing::trace;

/// Captured result of one script run
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs scripts through a non-interactive PowerShell host
#[derive(Debug, Clone)]
pub struct PowerShell {
    program: String,
}

impl PowerShell {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run a script; `env` is added to the child environment only
    pub async fn run(&self, script: &str, env: &[(&str, &str)]) -> io::Result<ScriptOutput> {
        trace!("{} -Command {}", self.program, script);

        let output = Command::new(&self.program)
            .args(["-NoProfile", "-NonInteractive", "-Command", script])
            .envs(env.iter().copied())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(ScriptOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl Default for PowerShell {
    fn default() -> Self {
        Self::new("powershell.exe")
    }
}

/// Quote a value as a single-quoted PowerShell string literal
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
