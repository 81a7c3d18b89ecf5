//! # RBAC Synth Library
//!
//! Runs one synthesis: configuration in, template out.

pub mod app;
pub mod startup;
