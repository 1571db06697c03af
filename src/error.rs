use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::upstream::UpstreamError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failure building an [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Root-cause category of a terminal job failure.
///
/// Surfaced to pollers as `errorKind` so clients can tell a blocked session
/// from a timeout without parsing the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// DNS, connect, TLS or body-read failure talking to the upstream.
    Transport,
    /// Non-200 envelope, HTML instead of JSON, or an unparseable body.
    Protocol,
    /// The upstream reported the task itself as failed.
    Upstream,
    /// The polling budget ran out without a terminal upstream state.
    Timeout,
    /// Reference asset could not be turned into something the upstream accepts.
    Upload,
    /// The caller handed the engine something it cannot encode.
    InvalidInput,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::Protocol => write!(f, "protocol"),
            ErrorKind::Upstream => write!(f, "upstream"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Upload => write!(f, "upload"),
            ErrorKind::InvalidInput => write!(f, "invalid_input"),
        }
    }
}
