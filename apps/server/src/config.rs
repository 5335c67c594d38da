//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults that work out of the box for local development.

use std::env;
use thiserror::Error;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port the API listens on.
    pub port: u16,

    /// Path to the SQLite database file.
    pub database_path: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable             | Default          |
    /// |----------------------|------------------|
    /// | `KOPI_PORT`          | `7070`           |
    /// | `KOPI_DATABASE_PATH` | `./data/kopi.db` |
    pub fn load() -> Result<Self, ConfigError> {
        let config = ServerConfig {
            port: env::var("KOPI_PORT")
                .unwrap_or_else(|_| "7070".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("KOPI_PORT".to_string()))?,

            database_path: env::var("KOPI_DATABASE_PATH")
                .unwrap_or_else(|_| "./data/kopi.db".to_string()),
        };

        Ok(config)
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // Only meaningful when the variables are unset, which is the
        // normal test environment.
        if env::var("KOPI_PORT").is_err() {
            let config = ServerConfig::load().unwrap();
            assert_eq!(config.port, 7070);
            assert_eq!(config.database_path, "./data/kopi.db");
        }
    }
}
