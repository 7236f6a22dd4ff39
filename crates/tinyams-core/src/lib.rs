//! TinyAMS core: domain models, the error taxonomy, and the storage
//! traits shared by every other crate in the workspace.

pub mod error;
pub mod models;
pub mod repository;
pub mod validation;
