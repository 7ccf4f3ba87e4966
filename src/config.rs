use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub storage_url: String,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Reads the process environment (after `.env` has been loaded by the caller).
    pub fn from_env() -> Result<Self, ConfigError> {
        let host: String = try_load("HOST", "127.0.0.1")?;
        let port: u16 = try_load("PORT", "3000")?;
        let default_storage_url = format!("http://{}:{}/storage", host, port);

        Ok(Self {
            database_url: try_load("DATABASE_URL", "sqlite://foodmap.db?mode=rwc")?,
            db_max_connections: try_load("DB_MAX_CONNECTIONS", "5")?,
            storage_dir: try_load("STORAGE_DIR", "storage/app/public")?,
            storage_url: try_load("STORAGE_URL", &default_storage_url)?,
            cors_allowed_origins: parse_origins(&try_load::<String>(
                "CORS_ALLOWED_ORIGINS",
                "http://localhost:3000,http://localhost:3001",
            )?),
            host,
            port,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }
    })
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
