//! Authentication error types.

use thiserror::Error;
use tinyams_core::error::AmsError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("no valid session")]
    SessionRequired,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for AmsError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AmsError::AuthenticationFailed,
            AuthError::SessionRequired => AmsError::SessionRequired,
            AuthError::Crypto(msg) => AmsError::Crypto(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_credentials_stay_generic() {
        let err: AmsError = AuthError::InvalidCredentials.into();
        assert!(matches!(err, AmsError::AuthenticationFailed));
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn missing_session_redirects() {
        let err: AmsError = AuthError::SessionRequired.into();
        assert_eq!(err.status_code(), 303);
    }
}
