//! Unified error types for every layer of the synthesizer.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for the RBAC stack synthesizer.
///
/// Errors raised here are local: anything the cloud provider would reject at
/// apply time (duplicate cache user ids, policy propagation races) is outside
/// what this code can observe.
#[derive(Error, Debug)]
pub enum RbacError {
    // ============ Model Errors ============
    /// A referenced resource was never declared.
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A resource with the same logical id already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Access string does not follow the cache ACL grammar.
    #[error("Invalid access string '{access_string}': {reason}")]
    InvalidAccessString {
        access_string: String,
        reason: String,
    },

    // ============ Graph Errors ============
    /// The declared dependency graph contains a cycle.
    #[error("Dependency cycle detected at {0}")]
    DependencyCycle(String),

    /// A dependency edge references a node outside the graph.
    #[error("Unknown resource in dependency graph: {0}")]
    UnknownResource(String),

    // ============ Infrastructure Errors ============
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Template serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error while writing a template
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RbacError {
    /// Returns the process exit code the synthesizer uses for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::InvalidAccessString { .. } => 65,
            Self::Configuration(_) => 78,
            Self::Io(_) => 74,
            Self::NotFound { .. }
            | Self::Conflict(_)
            | Self::DependencyCycle(_)
            | Self::UnknownResource(_) => 70,
            Self::Serialization(_) | Self::Internal(_) | Self::Other(_) => 1,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidAccessString { .. } => "INVALID_ACCESS_STRING",
            Self::DependencyCycle(_) => "DEPENDENCY_CYCLE",
            Self::UnknownResource(_) => "UNKNOWN_RESOURCE",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict<T: Into<String>>(message: T) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates an access string error.
    #[must_use]
    pub fn invalid_access_string(access_string: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAccessString {
            access_string: access_string.into(),
            reason: reason.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error comes from user-supplied input rather than the model.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidAccessString { .. } | Self::Configuration(_)
        )
    }
}

impl From<serde_json::Error> for RbacError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON serialization error: {}", err))
    }
}

/// Serializable error report, printed by the synthesizer on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional field-level errors for validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// Field-level validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name
    pub field: String,
    /// Error message
    pub message: String,
    /// Error code
    pub code: String,
}

impl ErrorReport {
    /// Creates a new report from an `RbacError`.
    #[must_use]
    pub fn from_error(error: &RbacError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            details: None,
        }
    }

    /// Sets field-level validation errors.
    #[must_use]
    pub fn with_details(mut self, details: Vec<FieldError>) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&RbacError> for ErrorReport {
    fn from(error: &RbacError) -> Self {
        Self::from_error(error)
    }
}
