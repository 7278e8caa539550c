//! Error types for the handshake layer.

use plama_storage::StorageError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for handshake operations.
pub type HandshakeResult<T> = Result<T, HandshakeError>;

/// Errors that can end an agent or line run.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// Reading or writing a file failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Connection refused, reset, or timed out.
    #[error("network error: {0}")]
    Network(String),

    /// The peer answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String, body: String },

    /// Any other HTTP client failure (unreadable body, redirect loop, ...).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The peer never wrote its readiness file.
    #[error("no {} after {}s", path.display(), waited.as_secs())]
    ReadinessTimeout { path: PathBuf, waited: Duration },

    /// The readiness file exists but names no endpoint.
    #[error("{} has no url, host or port", .0.display())]
    ReadinessIncomplete(PathBuf),

    /// A file-drop peer never wrote its output file.
    #[error("no {} after {}s", path.display(), waited.as_secs())]
    OutputTimeout { path: PathBuf, waited: Duration },

    /// The agent settings name neither a server nor a URL.
    #[error("configuration error: {0}")]
    Config(String),

    /// A line could not move data between its objects.
    #[error("routing error: {0}")]
    Routing(String),

    /// An entry point could not be started.
    #[error("launch failed for {}: {source}", script.display())]
    Launch {
        script: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HandshakeError {
    /// Whether the failure happened at the network level. Only these are
    /// retried.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Short name used in the diagnostic written to the output file.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Storage(_) => "StorageError",
            Self::Network(_) => "NetworkError",
            Self::Status { .. } => "HttpStatusError",
            Self::Http(_) => "HttpError",
            Self::ReadinessTimeout { .. } => "ReadinessTimeout",
            Self::ReadinessIncomplete(_) => "ReadinessIncomplete",
            Self::OutputTimeout { .. } => "OutputTimeout",
            Self::Config(_) => "ConfigError",
            Self::Routing(_) => "RoutingError",
            Self::Launch { .. } => "LaunchError",
        }
    }
}

impl From<reqwest::Error> for HandshakeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Self::Network(e.to_string())
        } else if e.is_builder() {
            Self::Config(e.to_string())
        } else {
            Self::Http(e.to_string())
        }
    }
}
