use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Installation status of one external tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepStatus {
    pub installed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Result of `zp check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Name of the configured backend binary
    pub backend_name: String,
    pub backend: DepStatus,
    pub zoxide: DepStatus,
    pub fzf: DepStatus,
    pub shell: String,
    pub os: String,
    pub arch: String,
}

impl CheckResult {
    /// Probe PATH for the backend and the optional helpers
    pub fn run(backend: &str) -> Self {
        Self {
            backend_name: backend.to_string(),
            backend: check_dep(backend, "version"),
            zoxide: check_dep("zoxide", "--version"),
            fzf: check_dep("fzf", "--version"),
            shell: detect_shell(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    /// Whether every required dependency is present
    pub fn ok(&self) -> bool {
        self.backend.installed
    }

    pub fn human(&self) -> String {
        let mut out = String::new();
        out.push_str(&dep_line(&self.backend_name, &self.backend, true));
        out.push_str(&dep_line("zoxide", &self.zoxide, false));
        out.push_str(&dep_line("fzf", &self.fzf, false));
        out.push_str(&format!(
            "\nPlatform: {}/{}, Shell: {}\n",
            self.os, self.arch, self.shell
        ));
        out
    }
}

fn check_dep(name: &str, version_flag: &str) -> DepStatus {
    let Ok(path) = which::which(name) else {
        return DepStatus::default();
    };

    let version = Command::new(&path)
        .arg(version_flag)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| parse_version(&String::from_utf8_lossy(&o.stdout)));

    DepStatus {
        installed: true,
        version,
        path: Some(path),
    }
}

/// First version-looking word of the first output line
/// (`zmosh\t\t0.4.0`, `zoxide 0.9.4` and `0.46.0 (brew)` all become the number)
fn parse_version(output: &str) -> Option<String> {
    let first = output.trim().lines().next()?.trim();
    first
        .split_whitespace()
        .find(|word| word.starts_with(|c: char| c.is_ascii_digit()))
        .or_else(|| first.split_whitespace().last())
        .map(str::to_string)
}

fn detect_shell() -> String {
    std::env::var("SHELL")
        .ok()
        .and_then(|s| {
            PathBuf::from(s)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn dep_line(name: &str, dep: &DepStatus, required: bool) -> String {
    let mark = match (dep.installed, required) {
        (true, _) => "\u{2713}",
        (false, true) => "\u{2717}",
        (false, false) => "\u{25cb}",
    };
    let label = if required { "required" } else { "optional" };
    let detail = match (dep.installed, &dep.version) {
        (true, Some(version)) => version.as_str(),
        (true, None) => "installed",
        (false, _) => "not found",
    };
    format!("  {} {} ({}) - {}\n", mark, name, label, detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CheckResult {
        CheckResult {
            backend_name: "zmosh".into(),
            backend: DepStatus {
                installed: true,
                version: Some("0.4.2".into()),
                path: Some("/opt/homebrew/bin/zmosh".into()),
            },
            zoxide: DepStatus::default(),
            fzf: DepStatus::default(),
            shell: "zsh".into(),
            os: "macos".into(),
            arch: "aarch64".into(),
        }
    }

    #[test]
    fn test_json_round_trip() {
        let result = sample();
        let json = serde_json::to_string_pretty(&result).unwrap();
        assert!(!json.contains("\"version\": null"));
        let parsed: CheckResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
        assert!(parsed.ok());
    }

    #[test]
    fn test_human_output() {
        let text = sample().human();
        assert!(text.contains("\u{2713} zmosh (required) - 0.4.2"));
        assert!(text.contains("\u{25cb} zoxide (optional) - not found"));
        assert!(text.contains("Platform: macos/aarch64, Shell: zsh"));
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("zmosh\t\t0.4.0\nbuilt with zig\n"), Some("0.4.0".into()));
        assert_eq!(parse_version("zoxide 0.9.4\n"), Some("0.9.4".into()));
        assert_eq!(parse_version("0.46.0 (brew)\n"), Some("0.46.0".into()));
        assert_eq!(parse_version("dev\n"), Some("dev".into()));
        assert_eq!(parse_version("   \n"), None);
    }

    #[test]
    fn test_missing_backend() {
        let result = CheckResult::run("zpick-definitely-not-installed");
        assert!(!result.backend.installed);
        assert!(!result.ok());
    }

    #[test]
    fn test_detect_shell() {
        temp_env::with_var("SHELL", Some("/usr/local/bin/zsh"), || {
            assert_eq!(detect_shell(), "zsh");
        });
        temp_env::with_var_unset("SHELL", || {
            assert_eq!(detect_shell(), "unknown");
        });
    }
}
