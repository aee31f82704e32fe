use analysis_worker::pipeline::Pipeline;
use analysis_worker::query::{self, GameStatusView, GameView};
use axum::{extract::rejection::JsonRejection, extract::Path, Extension, Json};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::AppError;

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub pgns: Vec<String>,
}

/// POST /api/analyze
///
/// Stores the games and starts analysing them in the background. Progress is
/// polled through the game endpoints.
pub async fn analyze_pgns(
    Extension(pipeline): Extension<Pipeline>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<JsonValue>, AppError> {
    let Json(body) = body?;
    let submission = pipeline.submit(body.pgns).await?;

    Ok(Json(serde_json::json!({
        "job_id": submission.job_id.to_string(),
        "message": "Analysis started. Use game IDs to track progress.",
        "games_count": submission.game_ids.len(),
        "game_ids": submission.game_ids,
    })))
}

/// GET /api/games
pub async fn list_games(
    Extension(pipeline): Extension<Pipeline>,
) -> Result<Json<Vec<GameView>>, AppError> {
    let games = query::all_games(pipeline.store().as_ref()).await?;
    Ok(Json(games))
}

/// GET /api/games/{game_id}
pub async fn get_game(
    Extension(pipeline): Extension<Pipeline>,
    Path(game_id): Path<i64>,
) -> Result<Json<GameView>, AppError> {
    query::game_view(pipeline.store().as_ref(), game_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Game not found".into()))
}

/// GET /api/games/{game_id}/status
pub async fn get_game_status(
    Extension(pipeline): Extension<Pipeline>,
    Path(game_id): Path<i64>,
) -> Result<Json<GameStatusView>, AppError> {
    query::game_status(pipeline.store().as_ref(), game_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Game not found".into()))
}
