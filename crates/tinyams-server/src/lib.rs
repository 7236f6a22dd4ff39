//! TinyAMS Server: configuration, the request handlers for every page,
//! and the wiring used by the `tinyams` binary.

pub mod config;
pub mod handlers;

pub use config::{ConfigError, ServerConfig};
pub use handlers::{App, Form, Response};
