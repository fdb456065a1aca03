//! Session discovery
//!
//! Two strategies can produce a session list: the backend's `list` output
//! ([`TextProtocol`]) and a scan of its socket directory ([`FastPath`]).
//! [`Discoverer`] tries them in preference order and returns the first
//! success. Results from different strategies are never merged.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;
use tracing::{debug, warn};

use super::{parse_sessions, BackendClient, FastPath, Session};

/// Discovery could not be performed; distinct from "no sessions"
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Cannot read socket directory {path:?}: {source}")]
    SocketDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{binary} list failed ({status}): {stderr}")]
    CommandFailed {
        binary: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("{binary} list printed non-UTF-8 output")]
    InvalidOutput { binary: String },
    #[error("No discovery strategy configured")]
    NoStrategy,
}

/// Runs the backend's `list` command and parses its output
#[derive(Debug, Clone)]
pub struct TextProtocol {
    client: BackendClient,
}

impl TextProtocol {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    pub async fn discover(&self) -> Result<Vec<Session>, DiscoveryError> {
        let output = self.client.list_output().await?;
        Ok(parse_sessions(&output))
    }
}

/// One way of listing sessions
#[derive(Debug, Clone)]
pub enum Discovery {
    TextProtocol(TextProtocol),
    FastPath(FastPath),
}

impl Discovery {
    pub fn name(&self) -> &'static str {
        match self {
            Discovery::TextProtocol(_) => "text protocol",
            Discovery::FastPath(_) => "fast path",
        }
    }

    pub async fn discover(&self) -> Result<Vec<Session>, DiscoveryError> {
        match self {
            Discovery::TextProtocol(text) => text.discover().await,
            Discovery::FastPath(fast) => fast.scan().await,
        }
    }
}

/// Picks the first strategy that succeeds
#[derive(Debug, Clone)]
pub struct Discoverer {
    strategies: Vec<Discovery>,
}

impl Discoverer {
    /// Strategies in preference order
    pub fn new(strategies: Vec<Discovery>) -> Self {
        Self { strategies }
    }

    /// Fast path first (when enabled), falling back to the backend's `list`
    pub fn for_backend(client: BackendClient, fast_path: Option<FastPath>) -> Self {
        let mut strategies = Vec::with_capacity(2);
        if let Some(fast) = fast_path {
            strategies.push(Discovery::FastPath(fast));
        }
        strategies.push(Discovery::TextProtocol(TextProtocol::new(client)));
        Self::new(strategies)
    }

    /// Return the session list from the first strategy that succeeds.
    ///
    /// An empty list is a valid answer and stops the search. If every
    /// strategy fails, the last error is returned.
    pub async fn discover(&self) -> Result<Vec<Session>, DiscoveryError> {
        let mut last_err = DiscoveryError::NoStrategy;

        for strategy in &self.strategies {
            match strategy.discover().await {
                Ok(sessions) => {
                    debug!("Discovered {} sessions via {}", sessions.len(), strategy.name());
                    return Ok(sessions);
                }
                Err(e) => {
                    if matches!(strategy, Discovery::FastPath(_)) {
                        debug!("Fast path unavailable: {}", e);
                    } else {
                        warn!("Discovery via {} failed: {}", strategy.name(), e);
                    }
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }
}
