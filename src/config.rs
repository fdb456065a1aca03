use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::backend::{BackendClient, Discoverer, FastPath};
use crate::keys::KeyMap;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "zp", author, version, about = "Session picker and launcher for zmosh")]
pub struct Config {
    /// Enable debug logging (to stderr)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Key ordering: "numbers" (1-9 first) or "letters"
    #[arg(long, global = true)]
    pub keys: Option<String>,

    /// Always run the backend's list command instead of scanning sockets
    #[arg(long, global = true)]
    pub no_fast_path: bool,

    /// Subcommand (defaults to the interactive picker)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List sessions
    List {
        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },
    /// Check dependencies
    Check {
        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },
    /// Attach to a session, creating it if needed
    Attach {
        name: String,
        /// Directory to start in
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Kill a session
    Kill { name: String },
    /// Print the pending switch command for the shell hook to eval
    Resume,
    /// Add the shell hook to .zshrc/.bashrc
    InstallHook {
        /// Remove the hook instead
        #[arg(long)]
        remove: bool,
        /// Shell to configure (defaults to $SHELL)
        #[arg(long)]
        shell: Option<String>,
    },
    /// Print version
    Version,
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Application settings (from config file and environment)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Backend binary name or path
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Key ordering mode name
    #[serde(default = "default_keys")]
    pub keys: String,

    /// Allow the socket directory scan
    #[serde(default = "default_fast_path")]
    pub fast_path: bool,

    /// Socket directory override ($ZMX_DIR still takes precedence)
    #[serde(default)]
    pub socket_dir: Option<PathBuf>,
}

fn default_backend() -> String {
    "zmosh".to_string()
}

fn default_keys() -> String {
    "numbers".to_string()
}

fn default_fast_path() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            keys: default_keys(),
            fast_path: default_fast_path(),
            socket_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // An explicit path that doesn't exist means defaults, not a search
        if let Some(p) = path {
            return if p.exists() {
                Self::from_file(p)
            } else {
                Ok(Self::default())
            };
        }

        let default_paths = [
            dirs::config_dir().map(|p| p.join("zpick/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/zpick/config.toml")),
            dirs::home_dir().map(|p| p.join(".zpick.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Apply ZPICK_* environment overrides
    pub fn merge_env(&mut self) {
        if let Some(backend) = env_non_empty("ZPICK_BACKEND") {
            self.backend = backend;
        }
        if let Some(keys) = env_non_empty("ZPICK_KEYS") {
            self.keys = keys;
        }
        if env_non_empty("ZPICK_NO_FAST_PATH").is_some() {
            self.fast_path = false;
        }
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if let Some(keys) = &cli.keys {
            self.keys = keys.clone();
        }
        if cli.no_fast_path {
            self.fast_path = false;
        }
    }

    pub fn client(&self) -> BackendClient {
        BackendClient::new(self.backend.clone())
    }

    pub fn key_map(&self) -> KeyMap {
        KeyMap::load(&self.keys)
    }

    /// Discovery strategies in preference order
    pub fn discoverer(&self) -> Discoverer {
        let fast_path = self
            .fast_path
            .then(|| FastPath::from_env(self.socket_dir.as_deref()));
        Discoverer::for_backend(self.client(), fast_path)
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
