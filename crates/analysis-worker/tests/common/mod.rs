#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use analysis_worker::db::{GameStore, MemoryStore};
use analysis_worker::enrich::EnrichmentSettings;
use analysis_worker::error::{EvaluationError, ExplanationError};
use analysis_worker::evaluation::{Evaluation, Evaluator};
use analysis_worker::explainer::Explainer;
use analysis_worker::model::Mistake;
use analysis_worker::pipeline::{Pipeline, PipelineSettings, SharedEvaluator};
use analysis_worker::Color;
use async_trait::async_trait;
use chess_core::decode_pgn;

/// Answers from a FEN -> white-centipawn table. Unknown positions score 0.
#[derive(Default)]
pub struct ScriptedEvaluator {
    scores: HashMap<String, i32>,
    failing: HashSet<String>,
    delay: Duration,
    busy: Arc<AtomicBool>,
    pub overlapped: Arc<AtomicBool>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score a game's positions in order: the start, then after each ply.
    pub fn with_game(mut self, pgn: &str, scores: &[i32]) -> Self {
        for (fen, score) in positions(pgn).into_iter().zip(scores) {
            self.scores.insert(fen, *score);
        }
        self
    }

    /// Fail when asked for the position after ply `index` of `pgn`.
    pub fn failing_after(mut self, pgn: &str, index: usize) -> Self {
        self.failing.insert(positions(pgn)[index + 1].clone());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

fn positions(pgn: &str) -> Vec<String> {
    let plies = decode_pgn(pgn).unwrap();
    let mut fens = vec![plies[0].fen_before.clone()];
    fens.extend(plies.iter().map(|p| p.fen_after.clone()));
    fens
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
    async fn evaluate(&mut self, fen: &str) -> Result<Evaluation, EvaluationError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        self.calls.lock().unwrap().push(fen.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.busy.store(false, Ordering::SeqCst);

        if self.failing.contains(fen) {
            return Err(EvaluationError::ProcessExited);
        }
        let cp = self.scores.get(fen).copied().unwrap_or(0);
        Ok(Evaluation::cp(cp, Color::White))
    }
}

/// Explains everything except the listed move indices.
#[derive(Default)]
pub struct FakeExplainer {
    failing: HashSet<i32>,
    pub calls: AtomicUsize,
}

impl FakeExplainer {
    pub fn failing_on(indices: &[i32]) -> Self {
        Self {
            failing: indices.iter().copied().collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Explainer for FakeExplainer {
    async fn explain(&self, mistake: &Mistake) -> Result<String, ExplanationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&mistake.move_index) {
            return Err(ExplanationError::Service {
                status: 400,
                body: "bad request".into(),
            });
        }
        Ok(format!("{} was a mistake", mistake.move_san))
    }
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        mistake_threshold: 100,
        eval_timeout: Duration::from_secs(5),
        max_games_per_submission: 10,
        enrichment: EnrichmentSettings {
            batch_size: 2,
            concurrency_limit: 2,
            call_timeout: Duration::from_secs(5),
            max_attempts: 2,
            retry_backoff: Duration::from_millis(1),
        },
    }
}

pub fn pipeline(
    evaluator: ScriptedEvaluator,
    explainer: Option<Arc<dyn Explainer>>,
) -> (Pipeline, Arc<dyn GameStore>) {
    let store: Arc<dyn GameStore> = Arc::new(MemoryStore::new());
    let engine: SharedEvaluator = Arc::new(tokio::sync::Mutex::new(evaluator));
    let pipeline = Pipeline::new(store.clone(), engine, explainer, settings());
    (pipeline, store)
}
