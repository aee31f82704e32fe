use std::env;

use analysis_worker::config::WorkerConfig;
use analysis_worker::error::WorkerError;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub worker: WorkerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, WorkerError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| WorkerError::Config("DATABASE_URL must be set".into()))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            worker: WorkerConfig::from_env()?,
        })
    }
}
