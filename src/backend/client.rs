use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::discovery::DiscoveryError;

/// Quote a value for a POSIX shell double-quoted string
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Leave plain words (`zmosh`, `/usr/bin/zmx`) bare and quote anything else
fn shell_word(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '+' | ':' | '@' | ',' | '='));
    if plain {
        value.to_string()
    } else {
        quote(value)
    }
}

/// Client for interacting with the session backend via CLI
#[derive(Debug, Clone)]
pub struct BackendClient {
    /// Name or path of the backend binary
    binary: String,
}

impl BackendClient {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run `<backend> list` and return its raw stdout
    pub async fn list_output(&self) -> Result<String, DiscoveryError> {
        debug!("Running {}", self.list_command());
        let output = Command::new(&self.binary)
            .arg("list")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| DiscoveryError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DiscoveryError::CommandFailed {
                binary: self.binary.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| DiscoveryError::InvalidOutput {
            binary: self.binary.clone(),
        })
    }

    /// Kill a session
    pub async fn kill_session(&self, name: &str) -> Result<()> {
        debug!("Running {}", self.kill_command(name));
        let output = Command::new(&self.binary)
            .args(["kill", name])
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to execute {} kill", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to kill session '{}': {}", name, stderr.trim());
        }

        Ok(())
    }

    /// Replace the current process with the attach command, optionally in `dir`
    ///
    /// Only returns on failure.
    pub fn exec_attach(&self, name: &str, dir: Option<&Path>) -> anyhow::Error {
        use std::os::unix::process::CommandExt;

        let mut cmd = std::process::Command::new(&self.binary);
        cmd.args(["attach", name]);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        anyhow::Error::new(cmd.exec()).context(format!("Failed to exec {} attach", self.binary))
    }

    /// Shell text of the attach command, e.g. `zmosh attach "work"`
    pub fn attach_command(&self, name: &str) -> String {
        format!("{} attach {}", shell_word(&self.binary), quote(name))
    }

    /// Shell text of the kill command
    pub fn kill_command(&self, name: &str) -> String {
        format!("{} kill {}", shell_word(&self.binary), quote(name))
    }

    /// Shell text of the list command
    pub fn list_command(&self) -> String {
        format!("{} list", shell_word(&self.binary))
    }
}

impl Default for BackendClient {
    fn default() -> Self {
        Self::new("zmosh")
    }
}
