//! Authentication configuration.

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Optional pepper prepended to passwords before Argon2id verification.
    /// Must match the pepper the repositories hash with.
    pub pepper: Option<String>,
    /// Session lifetime in seconds (default: 86_400 = 1 day).
    pub session_lifetime_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            pepper: None,
            session_lifetime_secs: 86_400,
        }
    }
}
