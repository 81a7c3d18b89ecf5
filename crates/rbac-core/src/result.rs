//! Result type aliases for the RBAC synthesizer.

use crate::RbacError;

/// A specialized `Result` type for RBAC stack operations.
pub type RbacResult<T> = Result<T, RbacError>;
