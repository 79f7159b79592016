//! Repair credentials
//!
//! The secure-channel repair needs a domain account allowed to reset the
//! machine password. Credentials come from flags, a TOML file or an
//! interactive prompt, and are validated structurally before use.

use crate::error::{MendError, MendResult};
use serde::Deserialize;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Where the repair credential comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// `--username` and `--password` / `SYSMEND_PASSWORD`
    Inline,
    /// TOML file with `username` and `password`
    File,
    /// Prompt on the terminal
    Interactive,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Inline => write!(f, "inline"),
            CredentialSource::File => write!(f, "file"),
            CredentialSource::Interactive => write!(f, "interactive"),
        }
    }
}

/// Inputs needed to resolve a credential from any source
#[derive(Debug, Clone)]
pub struct CredentialRequest {
    pub source: CredentialSource,
    pub username: Option<String>,
    pub password: Option<String>,
    pub file: Option<PathBuf>,
}

/// A validated domain credential
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    password: String,
}

impl Credential {
    /// Validate and build a credential
    ///
    /// The username must be domain-qualified (`DOMAIN\user` or
    /// `user@domain`) and the password must not be empty.
    pub fn new(username: &str, password: &str) -> MendResult<Self> {
        let username = username.trim();
        if username.is_empty() {
            return Err(MendError::CredentialInvalid("username is empty".into()));
        }

        let qualified = match (username.split_once('\\'), username.split_once('@')) {
            (Some((domain, user)), None) => !domain.is_empty() && !user.is_empty(),
            (None, Some((user, domain))) => !domain.is_empty() && !user.is_empty(),
            _ => false,
        };
        if !qualified {
            return Err(MendError::CredentialInvalid(format!(
                "username {:?} must be DOMAIN\\user or user@domain",
                username
            )));
        }

        if password.is_empty() {
            return Err(MendError::CredentialInvalid(format!(
                "password for {} is empty",
                username
            )));
        }

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct CredentialFile {
    username: String,
    password: String,
}

/// Read a credential from a TOML file
pub fn from_file(path: &Path) -> MendResult<Credential> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        MendError::CredentialInvalid(format!("cannot read credential file {:?}: {}", path, e))
    })?;
    let parsed: CredentialFile = toml::from_str(&contents).map_err(|e| {
        MendError::CredentialInvalid(format!("cannot parse credential file {:?}: {}", path, e))
    })?;
    Credential::new(&parsed.username, &parsed.password)
}

fn prompt_failed(e: io::Error) -> MendError {
    MendError::CredentialInvalid(format!("prompt failed: {}", e))
}

/// Prompt for a credential on the given streams
///
/// The username is read as a plain line; the password goes through
/// `read_password`, which receives the same streams and the prompt text.
pub fn prompt<R, W, P>(
    input: &mut R,
    output: &mut W,
    default_username: Option<&str>,
    read_password: P,
) -> MendResult<Credential>
where
    R: BufRead,
    W: Write,
    P: FnOnce(&mut R, &mut W, &str) -> io::Result<String>,
{
    let username = match default_username {
        Some(name) => name.to_string(),
        None => {
            write!(output, "Username (DOMAIN\\user): ")
                .and_then(|_| output.flush())
                .map_err(prompt_failed)?;
            let mut line = String::new();
            input.read_line(&mut line).map_err(prompt_failed)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        },
    };

    let label = format!("Password for {}: ", username);
    let password = read_password(input, output, &label).map_err(prompt_failed)?;
    Credential::new(&username, &password)
}

/// Resolve a credential from its configured source
pub fn resolve(request: &CredentialRequest) -> MendResult<Credential> {
    match request.source {
        CredentialSource::Inline => {
            let username = request.username.as_deref().ok_or_else(|| {
                MendError::CredentialInvalid("inline credential needs --username".into())
            })?;
            let password = request.password.as_deref().ok_or_else(|| {
                MendError::CredentialInvalid(
                    "inline credential needs --password or SYSMEND_PASSWORD".into(),
                )
            })?;
            Credential::new(username, password)
        },
        CredentialSource::File => {
            let path = request.file.as_deref().ok_or_else(|| {
                MendError::CredentialInvalid("file credential needs --credentialFile".into())
            })?;
            from_file(path)
        },
        CredentialSource::Interactive => {
            let stdin = io::stdin();
            let mut stderr = io::stderr();
            // the password is read from the terminal with echo disabled
            prompt(
                &mut stdin.lock(),
                &mut stderr,
                request.username.as_deref(),
                |_, _, label| rpassword::prompt_password(label),
            )
        },
    }
}
