//! Worker configuration from environment variables

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::classify::DEFAULT_MISTAKE_THRESHOLD;
use crate::enrich::EnrichmentSettings;
use crate::error::WorkerError;
use crate::explainer::ExplainerConfig;
use crate::pipeline::PipelineSettings;
use crate::stockfish::EngineOptions;

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Path to Stockfish binary
    pub stockfish_path: String,

    /// Search depth per position
    pub stockfish_depth: u32,

    pub stockfish_hash_mb: u32,

    /// Seconds before a single evaluation is abandoned
    pub eval_timeout_secs: u64,

    /// Centipawn drop a move must exceed to count as a mistake
    pub mistake_threshold: i32,

    pub max_pgns_per_request: usize,

    /// Empty disables explanations
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub openai_batch_size: usize,
    pub openai_concurrency: usize,
    pub openai_timeout_secs: u64,
    pub openai_max_attempts: u32,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, WorkerError> {
        let stockfish_path =
            env::var("STOCKFISH_PATH").unwrap_or_else(|_| "/usr/games/stockfish".to_string());

        let mistake_threshold = env_or("MISTAKE_THRESHOLD", DEFAULT_MISTAKE_THRESHOLD);
        if mistake_threshold < 0 {
            return Err(WorkerError::Config(format!(
                "MISTAKE_THRESHOLD must not be negative, got {mistake_threshold}"
            )));
        }

        let max_pgns_per_request = env_or("MAX_PGNS_PER_REQUEST", 100);
        if max_pgns_per_request == 0 {
            return Err(WorkerError::Config(
                "MAX_PGNS_PER_REQUEST must be at least 1".into(),
            ));
        }

        Ok(Self {
            stockfish_path,
            stockfish_depth: env_or("STOCKFISH_DEPTH", 20),
            stockfish_hash_mb: env_or("STOCKFISH_HASH_MB", 16),
            eval_timeout_secs: env_or("EVAL_TIMEOUT_SECS", 30),
            mistake_threshold,
            max_pgns_per_request,
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_batch_size: env_or("OPENAI_BATCH_SIZE", 10),
            openai_concurrency: env_or("OPENAI_CONCURRENCY", 5),
            openai_timeout_secs: env_or("OPENAI_TIMEOUT_SECS", 30),
            openai_max_attempts: env_or("OPENAI_MAX_ATTEMPTS", 2),
        })
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            depth: self.stockfish_depth,
            hash_mb: self.stockfish_hash_mb,
            ..EngineOptions::default()
        }
    }

    pub fn explainer_config(&self) -> ExplainerConfig {
        ExplainerConfig {
            api_key: self.openai_api_key.clone(),
            model: self.openai_model.clone(),
            base_url: self.openai_base_url.clone(),
            request_timeout: Duration::from_secs(self.openai_timeout_secs),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            mistake_threshold: self.mistake_threshold,
            eval_timeout: Duration::from_secs(self.eval_timeout_secs),
            max_games_per_submission: self.max_pgns_per_request,
            enrichment: EnrichmentSettings {
                batch_size: self.openai_batch_size.max(1),
                concurrency_limit: self.openai_concurrency.max(1),
                call_timeout: Duration::from_secs(self.openai_timeout_secs),
                max_attempts: self.openai_max_attempts.max(1),
                ..EnrichmentSettings::default()
            },
        }
    }
}
