//! Analyze PGN files from the command line.
//!
//! Runs the full pipeline against an in-memory store and prints every game
//! with its mistakes as JSON. Explanations are added when OPENAI_API_KEY is set.
//!
//! Usage:
//!   cargo run -p analysis-worker --bin analyze-pgn -- games.pgn [more.pgn ...]

use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::sync::Mutex;
use tracing::info;

use analysis_worker::config::WorkerConfig;
use analysis_worker::db::{GameStore, MemoryStore};
use analysis_worker::explainer;
use analysis_worker::pipeline::{Pipeline, SharedEvaluator};
use analysis_worker::query;
use analysis_worker::stockfish::StockfishEngine;
use chess_core::pgn::split_games;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let _ = dotenvy::dotenv();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("usage: analyze-pgn <file.pgn> [more.pgn ...]");
    }

    let mut pgns = Vec::new();
    for path in &paths {
        let text = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        let games = split_games(&text);
        info!(path = %path, games = games.len(), "Loaded PGN file");
        pgns.extend(games);
    }

    let config = WorkerConfig::from_env()?;
    info!(
        stockfish_path = %config.stockfish_path,
        depth = config.stockfish_depth,
        "Worker config loaded"
    );

    let engine = StockfishEngine::new(&config.stockfish_path, &config.engine_options())
        .await
        .context("Failed to spawn Stockfish")?;
    let engine = Arc::new(Mutex::new(engine));
    let explainer = explainer::from_config(&config.explainer_config())?;

    let store: Arc<dyn GameStore> = Arc::new(MemoryStore::new());
    let shared: SharedEvaluator = engine.clone();
    let pipeline = Pipeline::new(store.clone(), shared, explainer, config.pipeline_settings());

    let submission = pipeline.submit(pgns).await?;
    let summary = submission.handle.await?;
    info!(
        job_id = %submission.job_id,
        completed = summary.completed.len(),
        failed = summary.failed.len(),
        mistakes = summary.mistakes,
        "Run finished"
    );

    let mut views = Vec::with_capacity(submission.game_ids.len());
    for game_id in &submission.game_ids {
        if let Some(view) = query::game_view(store.as_ref(), *game_id).await? {
            views.push(view);
        }
    }
    println!("{}", serde_json::to_string_pretty(&views)?);

    engine.lock().await.quit().await;
    Ok(())
}
