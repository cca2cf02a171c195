//! Cluster Watch Error Hierarchy
//!
//! Two failure classes exist in this crate:
//! - transient read failures while handling watch events, which are logged and swallowed
//!   (they never show up here), and
//! - lookup failures, which are returned to the immediate caller as [`Error::Lookup`] or
//!   [`Error::ServiceNotFound`].

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Directory listing of a service path failed.
    ///
    /// Connection loss and a missing path are deliberately reported through the same variant;
    /// the underlying cause is kept as the error source.
    #[error("Failed to look up service `{name}` at {path}")]
    Lookup {
        name: String,
        path: String,
        #[source]
        source: CoordinationError,
    },

    /// The service path exists but no instance could be resolved
    #[error("Service `{name}` not found at {path}")]
    ServiceNotFound { name: String, path: String },

    /// Coordination-service session or request failures
    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration loaded but failed validation
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Retry policy exhaustion
    #[error("Retry task failed: {0}")]
    RetryExhausted(String),

    /// Single attempt exceeded its timeout
    #[error("Retry attempt timed out")]
    RetryTimeout,

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Failures reported by the coordination service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinationError {
    #[error("Connection loss: {0}")]
    ConnectionLoss(String),

    #[error("Node does not exist: {0}")]
    NoNode(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Coordination service error: {0}")]
    Other(String),
}

/// Error type for payload decoding
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed node payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("node payload is missing `{0}`")]
    MissingField(&'static str),
}

impl Error {
    /// True for the two lookup-class failures surfaced by service lookup
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Error::Lookup { .. } | Error::ServiceNotFound { .. })
    }
}
