//! Shell hook installation
//!
//! The hook launches the picker in fresh interactive shells that aren't
//! already inside a session, and evaluates `zp resume` before every prompt
//! so a choice made in the picker takes effect in the parent shell.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const BEGIN_MARKER: &str = "# >>> zpick hook >>>";
const END_MARKER: &str = "# <<< zpick hook <<<";

/// Shells we know how to hook into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Zsh,
    Bash,
}

impl Shell {
    /// Parse a shell name or path such as `/bin/zsh`
    pub fn from_name(name: &str) -> Option<Self> {
        match Path::new(name).file_name()?.to_str()? {
            "zsh" => Some(Shell::Zsh),
            "bash" => Some(Shell::Bash),
            _ => None,
        }
    }

    /// Explicit name, else `$SHELL`
    pub fn detect(explicit: Option<&str>) -> Result<Self> {
        let name = match explicit {
            Some(name) => name.to_string(),
            None => std::env::var("SHELL").unwrap_or_default(),
        };
        match Self::from_name(&name) {
            Some(shell) => Ok(shell),
            None => bail!("Unsupported shell '{}': use --shell zsh or --shell bash", name),
        }
    }

    pub fn rc_file(self) -> Result<PathBuf> {
        let home = dirs::home_dir().context("Cannot determine home directory")?;
        Ok(home.join(match self {
            Shell::Zsh => ".zshrc",
            Shell::Bash => ".bashrc",
        }))
    }

    fn snippet(self) -> String {
        let prompt_hook = match self {
            Shell::Zsh => "precmd_functions+=(_zpick_resume)",
            Shell::Bash => r#"PROMPT_COMMAND="_zpick_resume${PROMPT_COMMAND:+;$PROMPT_COMMAND}""#,
        };
        format!(
            r#"{BEGIN_MARKER}
_zpick_resume() {{ eval "$(command zp resume)"; }}
{prompt_hook}
if [[ $- == *i* && -z "$ZMX_SESSION" ]]; then command zp; fi
{END_MARKER}
"#
        )
    }
}

/// Append the hook to `rc_file`. Returns false if it was already there.
pub fn install_into(rc_file: &Path, shell: Shell) -> Result<bool> {
    let content = read_rc(rc_file)?;
    if content.contains(BEGIN_MARKER) {
        return Ok(false);
    }

    let mut updated = content;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push('\n');
    updated.push_str(&shell.snippet());

    fs::write(rc_file, updated).with_context(|| format!("Failed to write {:?}", rc_file))?;
    Ok(true)
}

/// Strip the hook block from `rc_file`. Returns false if none was found.
pub fn remove_from(rc_file: &Path) -> Result<bool> {
    let content = read_rc(rc_file)?;
    let Some(start) = content.find(BEGIN_MARKER) else {
        return Ok(false);
    };
    let Some(end) = content[start..].find(END_MARKER) else {
        bail!(
            "{:?} has {:?} without a closing {:?}; edit it by hand",
            rc_file,
            BEGIN_MARKER,
            END_MARKER
        );
    };
    let end = start + end + END_MARKER.len();

    let before = content[..start].trim_end_matches('\n');
    let after = content[end..].trim_start_matches('\n');
    let mut updated = before.to_string();
    if !updated.is_empty() {
        updated.push('\n');
    }
    if !after.is_empty() {
        updated.push_str(after);
    }

    fs::write(rc_file, updated).with_context(|| format!("Failed to write {:?}", rc_file))?;
    Ok(true)
}

fn read_rc(rc_file: &Path) -> Result<String> {
    match fs::read_to_string(rc_file) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", rc_file)),
    }
}
