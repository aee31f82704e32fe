//! Enrichment scheduler
//!
//! Mistakes are dispatched in chunks of `batch_size`, but concurrency is
//! bounded per explainer call: one semaphore shared by every chunk. A failed
//! call leaves that mistake unexplained and nothing else.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::db::GameStore;
use crate::error::ExplanationError;
use crate::explainer::Explainer;
use crate::model::Mistake;

#[derive(Clone, Debug)]
pub struct EnrichmentSettings {
    pub batch_size: usize,
    /// Maximum explainer calls in flight at once
    pub concurrency_limit: usize,
    pub call_timeout: Duration,
    /// Total attempts per mistake, including the first
    pub max_attempts: u32,
    /// Backoff before retry n is `retry_backoff * n`
    pub retry_backoff: Duration,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            concurrency_limit: 5,
            call_timeout: Duration::from_secs(30),
            max_attempts: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentFailure {
    pub mistake_id: i64,
    pub game_id: i64,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentReport {
    pub attempted: usize,
    pub enriched: usize,
    pub failures: Vec<EnrichmentFailure>,
}

/// Explain every mistake and write the text back. Never fails as a whole.
pub async fn enrich(
    mistakes: Vec<Mistake>,
    settings: &EnrichmentSettings,
    explainer: Option<Arc<dyn Explainer>>,
    store: Arc<dyn GameStore>,
) -> EnrichmentReport {
    let mut report = EnrichmentReport::default();

    let Some(explainer) = explainer else {
        if !mistakes.is_empty() {
            info!(
                mistakes = mistakes.len(),
                "No explainer configured, skipping enrichment"
            );
        }
        return report;
    };
    if mistakes.is_empty() {
        return report;
    }

    let semaphore = Arc::new(Semaphore::new(settings.concurrency_limit.max(1)));
    let mut tasks = JoinSet::new();

    for (batch, chunk) in mistakes.chunks(settings.batch_size.max(1)).enumerate() {
        debug!(batch, size = chunk.len(), "Dispatching enrichment batch");

        for mistake in chunk {
            // Semaphore is never closed
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let explainer = explainer.clone();
            let store = store.clone();
            let settings = settings.clone();
            let mistake = mistake.clone();

            tasks.spawn(async move {
                let _permit = permit; // Hold until done
                let outcome = match explain_with_retry(explainer.as_ref(), &mistake, &settings).await
                {
                    Ok(text) => store
                        .set_explanation(mistake.id, &text)
                        .await
                        .map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                (mistake, outcome)
            });
            report.attempted += 1;
        }
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(()))) => report.enriched += 1,
            Ok((mistake, Err(error))) => {
                warn!(
                    mistake_id = mistake.id,
                    game_id = mistake.game_id,
                    error = %error,
                    "Failed to explain mistake"
                );
                report.failures.push(EnrichmentFailure {
                    mistake_id: mistake.id,
                    game_id: mistake.game_id,
                    error,
                });
            }
            Err(e) => warn!(error = %e, "Enrichment task aborted"),
        }
    }

    info!(
        attempted = report.attempted,
        enriched = report.enriched,
        failed = report.failures.len(),
        "Enrichment finished"
    );
    report
}

async fn explain_with_retry(
    explainer: &dyn Explainer,
    mistake: &Mistake,
    settings: &EnrichmentSettings,
) -> Result<String, ExplanationError> {
    let max_attempts = settings.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = match tokio::time::timeout(settings.call_timeout, explainer.explain(mistake))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ExplanationError::Timeout(settings.call_timeout)),
        };

        match result {
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                debug!(mistake_id = mistake.id, attempt, error = %e, "Retrying explanation");
                tokio::time::sleep(settings.retry_backoff * attempt).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}
