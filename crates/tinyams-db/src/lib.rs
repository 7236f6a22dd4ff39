//! TinyAMS Database: SurrealDB connection management, the roster
//! record store, and the synchronized person search index.
//!
//! This crate provides:
//! - Opening the store ([`open`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Repository implementations of the `tinyams-core` traits
//! - The person search index ([`search`])
//! - Error types ([`DbError`])

mod connection;
mod credential;
mod error;
pub mod repository;
mod schema;
pub mod search;

pub use connection::{DbConfig, open};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
