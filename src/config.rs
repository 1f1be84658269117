use std::env;

use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("DATABASE_URL (or SUPABASE_DB_URL) must be set to the board's Postgres instance")]
    MissingDatabaseUrl,
    #[error("{name} must be a number, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub default_target: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .or_else(|| lookup("SUPABASE_DB_URL"))
            .filter(|url| !url.trim().is_empty());

        let max_connections = match lookup("SQCDP_MAX_CONNECTIONS") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: "SQCDP_MAX_CONNECTIONS",
                    value,
                })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let default_target = match lookup("SQCDP_DEFAULT_TARGET") {
            Some(value) => value
                .trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: "SQCDP_DEFAULT_TARGET",
                    value,
                })?,
            None => 0.0,
        };

        Ok(Self {
            database_url,
            max_connections: max_connections.max(1),
            default_target,
        })
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.default_target, 0.0);
        assert_eq!(config.require_database_url(), Err(ConfigError::MissingDatabaseUrl));
    }

    #[test]
    fn supabase_url_is_a_fallback() {
        let config = Config::from_lookup(lookup(&[
            ("SUPABASE_DB_URL", "postgres://board@db.example.supabase.co/postgres"),
        ]))
        .unwrap();
        assert_eq!(
            config.require_database_url().unwrap(),
            "postgres://board@db.example.supabase.co/postgres"
        );

        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://local/board"),
            ("SUPABASE_DB_URL", "postgres://remote/board"),
        ]))
        .unwrap();
        assert_eq!(config.require_database_url().unwrap(), "postgres://local/board");
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = Config::from_lookup(lookup(&[("SQCDP_DEFAULT_TARGET", "ten")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                name: "SQCDP_DEFAULT_TARGET",
                value: "ten".to_string(),
            }
        );
        let config = Config::from_lookup(lookup(&[("SQCDP_MAX_CONNECTIONS", "0")])).unwrap();
        assert_eq!(config.max_connections, 1);
    }
}
