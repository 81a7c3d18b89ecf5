//! # RBAC Core
//!
//! Core types shared by every crate of the Redis RBAC stack synthesizer:
//! the unified error type, typed identifiers for declared resources,
//! validation helpers, and logging bootstrap.

pub mod error;
pub mod id;
pub mod intrinsic;
pub mod result;
pub mod telemetry;
pub mod validation;

pub use error::*;
pub use id::*;
pub use result::*;
pub use validation::*;
