use axum::Json;
use serde_json::{json, Value as JsonValue};

/// GET /health
pub async fn health_check() -> Json<JsonValue> {
    Json(json!({ "status": "healthy" }))
}

/// GET /
pub async fn service_info() -> Json<JsonValue> {
    Json(json!({
        "name": "CaissaAnalytics",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Chess game analysis service",
        "endpoints": {
            "analyze": "/api/analyze",
            "games": "/api/games",
            "game_details": "/api/games/{game_id}",
            "game_status": "/api/games/{game_id}/status",
        }
    }))
}
