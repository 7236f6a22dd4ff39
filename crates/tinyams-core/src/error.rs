//! Error types for TinyAMS.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmsError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Bad credentials. The message never says which part was wrong.
    #[error("Invalid username and/or password")]
    AuthenticationFailed,

    #[error("Login required")]
    SessionRequired,

    #[error("{message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AmsError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// HTTP-class status code a presentation layer should answer with.
    ///
    /// `SessionRequired` maps to `303 See Other`: callers redirect to the
    /// login page instead of rendering an error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::AuthenticationFailed => 403,
            Self::SessionRequired => 303,
            Self::NotFound { .. } => 404,
            Self::Database(_) | Self::Crypto(_) | Self::Internal(_) => 500,
        }
    }
}

pub type AmsResult<T> = Result<T, AmsError>;
