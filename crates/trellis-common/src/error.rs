//! Error types for chart construction and synthesis
//!
//! Errors carry the chart node or field they concern so a failing synth points
//! at the resource the author has to fix.

use thiserror::Error;

/// Boxed error returned by deferred producers
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for chart operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid chart or resource configuration
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "metadata.name")
        field: Option<String>,
    },

    /// A node id was registered twice in the same chart
    #[error("chart '{chart}' already contains a node with id '{id}'")]
    DuplicateId {
        /// Chart name
        chart: String,
        /// Offending node id
        id: String,
    },

    /// A node's deferred producer failed during synthesis
    #[error("failed to resolve node '{node}': {source}")]
    Resolution {
        /// Path of the node within the chart (`<chart>/<id>`)
        node: String,
        /// The underlying producer error
        source: BoxError,
    },

    /// Serialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Filesystem error while writing a manifest
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error for a specific field
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Wrap a producer failure for the given node
    pub fn resolution(node: impl Into<String>, source: BoxError) -> Self {
        Self::Resolution {
            node: node.into(),
            source,
        }
    }

    /// Get the node path if this error is associated with a chart node
    pub fn node(&self) -> Option<&str> {
        match self {
            Error::Resolution { node, .. } => Some(node),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::serialization(e.to_string())
    }
}
