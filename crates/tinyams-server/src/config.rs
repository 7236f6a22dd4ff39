//! Process configuration, read from `TINYAMS_*` environment variables.
//!
//! Every setting has a default; unset variables are logged and the
//! default is used. A value that is set but unparsable is an error.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;
use tinyams_auth::AuthConfig;
use tinyams_db::DbConfig;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {message}")]
    Invalid {
        key: String,
        value: String,
        message: String,
    },
}

/// Everything the binary needs to wire up the application.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub auth: AuthConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` is this with
    /// `std::env::var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let vars = Vars { lookup: &lookup };

        Ok(Self {
            db: DbConfig {
                url: vars.string("TINYAMS_DB_URL", defaults.db.url),
                namespace: vars.string("TINYAMS_DB_NAMESPACE", defaults.db.namespace),
                database: vars.string("TINYAMS_DB_DATABASE", defaults.db.database),
                username: vars.string("TINYAMS_DB_USERNAME", defaults.db.username),
                password: vars.secret("TINYAMS_DB_PASSWORD", defaults.db.password),
            },
            auth: AuthConfig {
                pepper: vars.optional("TINYAMS_PEPPER"),
                session_lifetime_secs: vars.parsed(
                    "TINYAMS_SESSION_LIFETIME_SECS",
                    defaults.auth.session_lifetime_secs,
                )?,
            },
        })
    }
}

struct Vars<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, key: &str, default: String) -> String {
        self.var(key).unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default
        })
    }

    fn secret(&self, key: &str, default: String) -> String {
        self.var(key).unwrap_or_else(|| {
            info!("{key} not set, using default");
            default
        })
    }

    fn optional(&self, key: &str) -> Option<String> {
        let value = self.var(key);
        if value.is_none() {
            info!("{key} not set");
        }
        value
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + Display,
        T::Err: Display,
    {
        match self.var(key) {
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key: key.into(),
                value: raw.clone(),
                message: e.to_string(),
            }),
            None => {
                info!("{key} not set, using default: {default}");
                Ok(default)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db.url, "127.0.0.1:8000");
        assert_eq!(config.db.namespace, "tinyams");
        assert_eq!(config.auth.session_lifetime_secs, 86_400);
        assert!(config.auth.pepper.is_none());
    }

    #[test]
    fn variables_override_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("TINYAMS_DB_URL", "db.internal:8000"),
            ("TINYAMS_DB_DATABASE", "roster"),
            ("TINYAMS_PEPPER", "s3cret"),
            ("TINYAMS_SESSION_LIFETIME_SECS", " 3600 "),
        ]))
        .unwrap();
        assert_eq!(config.db.url, "db.internal:8000");
        assert_eq!(config.db.database, "roster");
        assert_eq!(config.auth.pepper.as_deref(), Some("s3cret"));
        assert_eq!(config.auth.session_lifetime_secs, 3600);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = ServerConfig::from_lookup(lookup(&[("TINYAMS_PEPPER", "  ")])).unwrap();
        assert!(config.auth.pepper.is_none());
    }

    #[test]
    fn unparsable_number_is_an_error() {
        let err = ServerConfig::from_lookup(lookup(&[("TINYAMS_SESSION_LIFETIME_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("TINYAMS_SESSION_LIFETIME_SECS"));
    }
}
