//! Domain models for TinyAMS.
//!
//! These are the core types shared across all crates.

pub mod association;
pub mod person;
pub mod session;
