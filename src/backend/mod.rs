mod client;
mod discovery;
mod fast_path;
mod parser;

pub use client::{quote, BackendClient};
pub use discovery::Discoverer;
pub use fast_path::FastPath;
pub use parser::parse_sessions;

use serde::Serialize;

/// Shorthand used for `started_in` when the real directory is unknown
pub const HOME_DIR: &str = "~";

/// Represents a live backend session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Session name, unique within one discovery result
    pub name: String,
    /// PID of the session's controlling process, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Number of attached clients
    pub clients: u32,
    /// Directory the session was started in
    pub started_in: String,
    /// Derived from `clients`; only set by the constructor
    active: bool,
}

impl Session {
    pub fn new(name: String, pid: Option<u32>, clients: u32, started_in: String) -> Self {
        Self {
            name,
            pid,
            clients,
            started_in,
            active: clients > 0,
        }
    }

    /// Whether at least one client is attached
    pub fn active(&self) -> bool {
        self.active
    }
}
