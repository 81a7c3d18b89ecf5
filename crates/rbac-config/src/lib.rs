//! # RBAC Config
//!
//! Configuration for the Redis RBAC stack synthesizer.
//! Supports layered configuration from files and environment variables,
//! with defaults that describe the demo stack.

mod app_config;
mod loader;
mod profile;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use profile::*;
pub use validation::*;
