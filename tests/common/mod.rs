#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use analysis_worker::db::{GameStore, MemoryStore};
use analysis_worker::error::EvaluationError;
use analysis_worker::evaluation::{Evaluation, Evaluator};
use analysis_worker::pipeline::{Pipeline, PipelineSettings, SharedEvaluator};
use analysis_worker::Color;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

/// Scores a fixed amount for white when white has castled short, 0 otherwise.
pub struct CastlingEvaluator {
    pub penalty: i32,
}

#[async_trait]
impl Evaluator for CastlingEvaluator {
    async fn evaluate(&mut self, fen: &str) -> Result<Evaluation, EvaluationError> {
        let board = fen.split_whitespace().next().unwrap_or_default();
        let cp = if board.ends_with("RK1") { -self.penalty } else { 0 };
        Ok(Evaluation::cp(cp, Color::White))
    }
}

/// Router over an in-memory store, plus the store for assertions.
pub fn app() -> (Router, Arc<dyn GameStore>) {
    let store: Arc<dyn GameStore> = Arc::new(MemoryStore::new());
    let engine: SharedEvaluator = Arc::new(tokio::sync::Mutex::new(CastlingEvaluator {
        penalty: 300,
    }));
    let settings = PipelineSettings {
        max_games_per_submission: 3,
        eval_timeout: Duration::from_secs(5),
        ..PipelineSettings::default()
    };
    let pipeline = Pipeline::new(store.clone(), engine, None, settings);
    (server::app::router(pipeline), store)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Poll a game's status until it leaves pending/processing.
pub async fn wait_for_terminal(app: &Router, game_id: i64) -> Value {
    for _ in 0..200 {
        let (_, body) = get(app, &format!("/api/games/{game_id}/status")).await;
        if body["status"] == "completed" || body["status"] == "failed" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("game {game_id} never finished");
}
