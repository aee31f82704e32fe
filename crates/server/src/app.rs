use analysis_worker::pipeline::Pipeline;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::routes;

/// Build the router, same paths as the FastAPI service it replaces.
pub fn router(pipeline: Pipeline) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::health::service_info))
        .route("/health", get(routes::health::health_check))
        .route("/api/analyze", post(routes::analysis::analyze_pgns))
        .route("/api/games", get(routes::analysis::list_games))
        .route("/api/games/{game_id}", get(routes::analysis::get_game))
        .route(
            "/api/games/{game_id}/status",
            get(routes::analysis::get_game_status),
        )
        .layer(Extension(pipeline))
        .layer(cors)
}
