//! Pipeline orchestrator
//!
//! A submission becomes one background task. The task walks its games one
//! at a time under the shared engine lock, then explains the mistakes of
//! every game that walked cleanly, then completes those games.

use std::sync::Arc;
use std::time::Duration;

use chess_core::decode_pgn;
use futures::{pin_mut, TryStreamExt};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::classify::DEFAULT_MISTAKE_THRESHOLD;
use crate::db::GameStore;
use crate::enrich::{enrich, EnrichmentReport, EnrichmentSettings};
use crate::error::{StoreError, SubmitError, WalkError};
use crate::evaluation::Evaluator;
use crate::explainer::Explainer;
use crate::model::{GameStatus, Mistake, NewGame};
use crate::state::StateTracker;
use crate::walker::walk;

/// One engine shared by every run. A game's walk holds it for every
/// evaluation of that game, never across store writes.
pub type SharedEvaluator = Arc<Mutex<dyn Evaluator>>;

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub mistake_threshold: i32,
    /// Bound on a single position evaluation
    pub eval_timeout: Duration,
    pub max_games_per_submission: usize,
    pub enrichment: EnrichmentSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            mistake_threshold: DEFAULT_MISTAKE_THRESHOLD,
            eval_timeout: Duration::from_secs(30),
            max_games_per_submission: 100,
            enrichment: EnrichmentSettings::default(),
        }
    }
}

/// An accepted submission. Awaiting `handle` waits for the whole run.
#[derive(Debug)]
pub struct Submission {
    pub job_id: Uuid,
    pub game_ids: Vec<i64>,
    pub handle: JoinHandle<RunSummary>,
}

#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub completed: Vec<i64>,
    pub failed: Vec<i64>,
    /// Games this run could not move into or out of PROCESSING
    pub skipped: Vec<i64>,
    pub mistakes: usize,
    pub enrichment: EnrichmentReport,
}

#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn GameStore>,
    tracker: StateTracker,
    engine: SharedEvaluator,
    explainer: Option<Arc<dyn Explainer>>,
    settings: Arc<PipelineSettings>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn GameStore>,
        engine: SharedEvaluator,
        explainer: Option<Arc<dyn Explainer>>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            tracker: StateTracker::new(store.clone()),
            store,
            engine,
            explainer,
            settings: Arc::new(settings),
        }
    }

    pub fn store(&self) -> &Arc<dyn GameStore> {
        &self.store
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Validate and store a batch of PGNs, then start analysing them in the background.
    pub async fn submit(&self, pgns: Vec<String>) -> Result<Submission, SubmitError> {
        let max = self.settings.max_games_per_submission;
        if pgns.is_empty() {
            return Err(SubmitError::Empty);
        }
        if pgns.len() > max {
            return Err(SubmitError::TooMany {
                max,
                got: pgns.len(),
            });
        }

        let mut games = Vec::with_capacity(pgns.len());
        for (i, pgn) in pgns.into_iter().enumerate() {
            let plies = decode_pgn(&pgn).map_err(|source| SubmitError::InvalidPgn {
                index: i + 1,
                source,
            })?;
            games.push(NewGame { pgn, plies });
        }

        let game_ids = self.store.create_games(games).await?;
        let job_id = Uuid::new_v4();
        info!(%job_id, games = game_ids.len(), "Analysis job accepted");

        let pipeline = self.clone();
        let ids = game_ids.clone();
        let handle = tokio::spawn(
            async move { pipeline.run(&ids).await }
                .instrument(info_span!("analysis_job", %job_id)),
        );

        Ok(Submission {
            job_id,
            game_ids,
            handle,
        })
    }

    /// Analyse games in order. One game's failure never stops the others.
    pub async fn run(&self, game_ids: &[i64]) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut walked = Vec::with_capacity(game_ids.len());
        let mut found: Vec<Mistake> = Vec::new();

        for &game_id in game_ids {
            if let Err(e) = self.tracker.transition(game_id, GameStatus::Processing).await {
                warn!(game_id, error = %e, "Skipping game");
                summary.skipped.push(game_id);
                continue;
            }

            let mut game_mistakes = Vec::new();
            let outcome = self.walk_game(game_id, &mut game_mistakes).await;
            summary.mistakes += game_mistakes.len();

            match outcome {
                Ok(()) => {
                    info!(game_id, mistakes = game_mistakes.len(), "Game walked");
                    walked.push(game_id);
                    found.extend(game_mistakes);
                }
                Err(e) => {
                    error!(
                        game_id,
                        error = %e,
                        kept = game_mistakes.len(),
                        "Game analysis failed"
                    );
                    if let Err(e) = self.tracker.transition(game_id, GameStatus::Failed).await {
                        error!(game_id, error = %e, "Could not mark game failed");
                    }
                    summary.failed.push(game_id);
                }
            }
        }

        summary.enrichment = enrich(
            found,
            &self.settings.enrichment,
            self.explainer.clone(),
            self.store.clone(),
        )
        .await;

        for game_id in walked {
            match self.tracker.transition(game_id, GameStatus::Completed).await {
                Ok(_) => summary.completed.push(game_id),
                Err(e) => {
                    warn!(game_id, error = %e, "Could not complete game");
                    summary.skipped.push(game_id);
                }
            }
        }

        info!(
            completed = summary.completed.len(),
            failed = summary.failed.len(),
            skipped = summary.skipped.len(),
            mistakes = summary.mistakes,
            "Analysis job finished"
        );
        summary
    }

    /// Walk one PROCESSING game under the engine lock, then persist its
    /// mistakes in move order with the lock released. Mistakes found before
    /// an evaluation error are still persisted.
    async fn walk_game(&self, game_id: i64, found: &mut Vec<Mistake>) -> Result<(), WalkError> {
        let game = self
            .store
            .fetch_game(game_id)
            .await?
            .ok_or(StoreError::GameNotFound(game_id))?;

        let mut drafts = Vec::new();
        let walked = {
            let mut engine = self.engine.lock().await;
            let stream = walk(
                &game.plies,
                &mut *engine,
                self.settings.mistake_threshold,
                self.settings.eval_timeout,
            );
            pin_mut!(stream);
            loop {
                match stream.try_next().await {
                    Ok(Some(draft)) => drafts.push(draft),
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(e),
                }
            }
        };

        for draft in &drafts {
            let mistake = self.store.insert_mistake(game_id, draft).await?;
            debug!(
                game_id,
                move_index = draft.move_index,
                san = %draft.move_san,
                drop = draft.eval_drop,
                "Mistake recorded"
            );
            found.push(mistake);
        }
        walked?;

        Ok(())
    }
}
