//! # RBAC Constructs
//!
//! Declares the resources of a Redis RBAC stack and renders them as a
//! deployment template.
//!
//! - [`graph`]: explicit dependency DAG between declared resources
//! - [`provider`]: collaborator traits the constructs are written against
//! - [`stack`]: the recording [`Stack`] implementation of those traits
//! - [`rbac_user`]: the credentialed cache user construct
//! - [`assembler`]: composes a full stack from configuration
//! - [`template`]: the synthesized output

pub mod assembler;
pub mod graph;
pub mod provider;
pub mod rbac_user;
pub mod stack;
pub mod template;

pub use assembler::*;
pub use graph::DependencyGraph;
pub use provider::*;
pub use rbac_user::*;
pub use stack::{Consumer, Stack, METADATA_KEY};
pub use template::*;
