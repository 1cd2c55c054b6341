//! Error types for tiercache
//!
//! All modules use `TierResult<T>` as their return type. The narrower
//! [`ResolveError`] is the only thing a cache resolution ever hands back to
//! its caller; storage-tier failures are absorbed before they get that far.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tiercache operations
pub type TierResult<T> = Result<T, TierError>;

/// Category of a failed content production
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerFailure {
    /// Transport failure or the producer could not be reached
    Network,
    /// Production exceeded the configured deadline
    Timeout,
    /// Producer answered, but with something unusable
    Malformed,
    /// Producer refused because of quota or upstream rate limits
    Quota,
}

impl fmt::Display for ProducerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Malformed => "malformed",
            Self::Quota => "quota",
        };
        write!(f, "{}", name)
    }
}

/// Errors a resolution may surface to its caller.
///
/// Cloneable so that every caller attached to one in-flight production
/// receives the same outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{class} is cooling down, retry in {remaining_secs}s")]
    Throttled {
        class: String,
        remaining_secs: u64,
    },

    #[error("Content producer unavailable ({kind}): {reason}")]
    ProducerUnavailable {
        kind: ProducerFailure,
        reason: String,
    },
}

impl ResolveError {
    pub fn throttled(class: impl Into<String>, remaining_secs: u64) -> Self {
        Self::Throttled {
            class: class.into(),
            remaining_secs,
        }
    }

    pub fn network(reason: impl Into<String>) -> Self {
        Self::producer(ProducerFailure::Network, reason)
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::producer(ProducerFailure::Malformed, reason)
    }

    pub fn quota(reason: impl Into<String>) -> Self {
        Self::producer(ProducerFailure::Quota, reason)
    }

    pub fn producer(kind: ProducerFailure, reason: impl Into<String>) -> Self {
        Self::ProducerUnavailable {
            kind,
            reason: reason.into(),
        }
    }

    /// Seconds the caller should wait, if this is a throttle rejection
    pub fn remaining_secs(&self) -> Option<u64> {
        match self {
            Self::Throttled { remaining_secs, .. } => Some(*remaining_secs),
            Self::ProducerUnavailable { .. } => None,
        }
    }
}

/// All errors that can occur in tiercache
#[derive(Error, Debug)]
pub enum TierError {
    // Caller-facing resolution errors
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No producer command configured. Set [producer].command in the config file")]
    ProducerNotConfigured,

    #[error("Invalid content key: {0:?}")]
    InvalidKey(String),

    // Storage tier errors (absorbed by the resolver and orchestrator)
    #[error("Remote store unavailable: {0}")]
    RemoteStoreUnavailable(String),

    #[error("Failed to write local mirror entry {key}: {source}")]
    LocalMirrorWrite {
        key: String,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl TierError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a local mirror write error
    pub fn mirror_write(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::LocalMirrorWrite {
            key: key.into(),
            source,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Resolve(_) | Self::RemoteStoreUnavailable(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Resolve(ResolveError::Throttled { .. }) => {
                Some("Wait for the cooldown to pass, then try again")
            }
            Self::Resolve(ResolveError::ProducerUnavailable { .. }) => {
                Some("The content producer failed. Try again later")
            }
            Self::ProducerNotConfigured => Some("Run: tiercache config init"),
            _ => None,
        }
    }
}
