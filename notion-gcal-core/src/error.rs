//! Error types for notion-gcal.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a collaborator call failed.
///
/// The engine never retries; the kind only decides whether the run goes on
/// (everything but `Auth`) and how failures are tallied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network trouble, rate limits, 5xx responses
    Transient,
    /// The request itself was rejected
    Permanent,
    /// The item does not exist (anymore) on the remote side
    NotFound,
    /// The call did not finish within the configured timeout
    Timeout,
    /// Credentials were rejected
    Auth,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Transient => "transient",
            FailureKind::Permanent => "permanent",
            FailureKind::NotFound => "not found",
            FailureKind::Timeout => "timeout",
            FailureKind::Auth => "auth",
        };
        write!(f, "{label}")
    }
}

/// An error reported by the source or target collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} error: {message}")]
pub struct RemoteError {
    pub kind: FailureKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        RemoteError {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transient, message)
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Permanent, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Auth, message)
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("request timed out after {}s", limit.as_secs()),
        )
    }

    pub fn is_auth(&self) -> bool {
        self.kind == FailureKind::Auth
    }
}

/// Errors that abort a whole run.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source error: {0}")]
    Source(RemoteError),

    #[error("Target rejected credentials: {0}")]
    TargetAuth(RemoteError),

    #[error("Mapping store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for notion-gcal operations.
pub type SyncResult<T> = Result<T, SyncError>;
