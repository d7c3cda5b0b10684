use std::collections::HashMap;
use thiserror::Error;

/// Engine configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file path.
    pub database_path: String,
    /// Maximum unpriced deals examined per reconciliation sweep.
    pub sweep_batch_size: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let sweep_batch_size = env_map
            .get("SWEEP_BATCH_SIZE")
            .map(|s| s.as_str())
            .unwrap_or("500")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "SWEEP_BATCH_SIZE".to_string(),
                    "must be a non-negative integer".to_string(),
                )
            })?;

        Ok(Config {
            database_path,
            sweep_batch_size,
        })
    }
}
