//! Worker error types

use std::time::Duration;

use chess_core::ReplayError;
use thiserror::Error;

use crate::model::GameStatus;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stockfish error: {0}")]
    Stockfish(#[from] EvaluationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Failure to obtain an evaluation for a position. Aborts the game being walked.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Failed to spawn engine: {0}")]
    Spawn(String),

    #[error("Engine I/O error: {0}")]
    Io(String),

    #[error("Engine process exited")]
    ProcessExited,

    #[error("Engine did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Engine returned no score for {0}")]
    NoScore(String),

    #[error("Invalid position: {0}")]
    InvalidPosition(String),
}

/// Failure to explain one mistake. Never escalates past that mistake.
#[derive(Error, Debug)]
pub enum ExplanationError {
    #[error("Explainer timed out after {0:?}")]
    Timeout(Duration),

    #[error("Explainer rate limited")]
    RateLimited,

    #[error("Explainer returned HTTP {status}: {body}")]
    Service { status: u16, body: String },

    #[error("Explainer transport error: {0}")]
    Transport(String),

    #[error("Malformed explainer response: {0}")]
    Malformed(String),
}

impl ExplanationError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ExplanationError::Timeout(_)
            | ExplanationError::RateLimited
            | ExplanationError::Transport(_) => true,
            ExplanationError::Service { status, .. } => *status >= 500,
            ExplanationError::Malformed(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Game not found: {0}")]
    GameNotFound(i64),

    #[error("Game {game_id} is {status}, write rejected")]
    NotProcessing { game_id: i64, status: GameStatus },

    #[error("Mistake {0} is missing or already explained")]
    MistakeRejected(i64),

    #[error("Unknown game status in store: {0}")]
    UnknownStatus(String),
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Illegal transition for game {game_id}: {current} -> {requested}")]
    Conflict {
        game_id: i64,
        current: GameStatus,
        requested: GameStatus,
    },

    #[error("Game not found: {0}")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Anything that stops one game's walk.
#[derive(Error, Debug)]
pub enum WalkError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("At least one PGN is required")]
    Empty,

    #[error("Maximum {max} PGNs allowed per request, got {got}")]
    TooMany { max: usize, got: usize },

    #[error("PGN #{index} is invalid: {source}")]
    InvalidPgn {
        index: usize,
        #[source]
        source: ReplayError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
