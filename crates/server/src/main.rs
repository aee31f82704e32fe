use std::sync::Arc;

use analysis_worker::db::{GameStore, PgStore};
use analysis_worker::explainer;
use analysis_worker::pipeline::{Pipeline, SharedEvaluator};
use analysis_worker::stockfish::StockfishEngine;
use anyhow::Context;
use server::{app, config, db};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;

    // Connect to Postgres
    tracing::info!("Connecting to database...");
    let pool = db::pool::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    // Run schema migrations
    tracing::info!("Running migrations...");
    db::pool::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    // A missing engine is fatal; a missing explainer only disables explanations
    let engine = StockfishEngine::new(&config.worker.stockfish_path, &config.worker.engine_options())
        .await
        .with_context(|| format!("Failed to spawn Stockfish at {}", config.worker.stockfish_path))?;
    tracing::info!(
        path = %config.worker.stockfish_path,
        depth = config.worker.stockfish_depth,
        "Stockfish engine ready"
    );
    let engine: SharedEvaluator = Arc::new(Mutex::new(engine));
    let explainer = explainer::from_config(&config.worker.explainer_config())?;

    let store: Arc<dyn GameStore> = Arc::new(PgStore::new(pool));
    let pipeline = Pipeline::new(store, engine, explainer, config.worker.pipeline_settings());

    let app = app::router(pipeline);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped; unfinished games stay in processing");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
