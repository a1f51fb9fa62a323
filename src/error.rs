//! Unified error types for Domwatch

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Domwatch
#[derive(Error, Debug)]
pub enum Error {
    /// A tracked selector string is not a valid selector expression
    #[error("Malformed selector: {0}")]
    MalformedSelector(String),

    /// A node id does not exist in the document (or was removed)
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new malformed selector error
    pub fn malformed_selector<S: Into<String>>(msg: S) -> Self {
        Error::MalformedSelector(msg.into())
    }

    /// Create a new node not found error
    pub fn node_not_found<S: Into<String>>(msg: S) -> Self {
        Error::NodeNotFound(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }
}
