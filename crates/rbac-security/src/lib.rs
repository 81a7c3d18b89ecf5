//! # RBAC Security
//!
//! Security model for the Redis RBAC stack: IAM policy statements and
//! principals, the cache access string grammar, and the settings a
//! credential store uses to generate cache passwords.

pub mod access;
pub mod credential;
pub mod iam;

pub use access::*;
pub use credential::*;
pub use iam::*;
