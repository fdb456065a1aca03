use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::discovery::DiscoveryError;
use super::{Session, HOME_DIR};

/// Resolve the directory holding one Unix socket per live session.
///
/// `$ZMX_DIR` wins, then the configured override, then
/// `$XDG_RUNTIME_DIR/zmx`, then `/tmp/zmx-<uid>`.
pub fn resolve_socket_dir(configured: Option<&Path>) -> PathBuf {
    if let Some(dir) = std::env::var_os("ZMX_DIR").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }
    if let Some(xdg) = std::env::var_os("XDG_RUNTIME_DIR").filter(|d| !d.is_empty()) {
        return PathBuf::from(xdg).join("zmx");
    }
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/tmp/zmx-{}", uid))
}

/// Lists sessions by scanning the socket directory instead of running the backend.
///
/// Faster than the text protocol but blind to PIDs, client counts and start
/// directories. The only session it can mark active is the one this process
/// is running inside.
#[derive(Debug, Clone)]
pub struct FastPath {
    dir: PathBuf,
    current_session: Option<String>,
}

impl FastPath {
    pub fn new(dir: PathBuf, current_session: Option<String>) -> Self {
        Self {
            dir,
            current_session: current_session.filter(|s| !s.is_empty()),
        }
    }

    /// Build from the environment, taking the current session from `$ZMX_SESSION`
    pub fn from_env(configured_dir: Option<&Path>) -> Self {
        Self::new(
            resolve_socket_dir(configured_dir),
            std::env::var("ZMX_SESSION").ok(),
        )
    }

    /// Scan the directory, one session per socket entry, sorted by name
    pub async fn scan(&self) -> Result<Vec<Session>, DiscoveryError> {
        let read_err = |source| DiscoveryError::SocketDir {
            path: self.dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(read_err)?;
        let mut sessions = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            let is_socket = match entry.file_type().await {
                Ok(file_type) => file_type.is_socket(),
                Err(e) => {
                    debug!("Skipping {:?}: {}", entry.path(), e);
                    false
                }
            };
            if !is_socket {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };

            let clients = u32::from(self.current_session.as_deref() == Some(name.as_str()));
            sessions.push(Session::new(name, None, clients, HOME_DIR.to_string()));
        }

        sessions.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Fast path found {} sessions in {:?}", sessions.len(), self.dir);
        Ok(sessions)
    }
}
