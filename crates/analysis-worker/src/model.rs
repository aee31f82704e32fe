//! Games, mistakes and their lifecycle status

use std::fmt;
use std::str::FromStr;

use chess_core::Ply;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-game lifecycle. Moves forward only; Completed and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl GameStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Pending => "pending",
            GameStatus::Processing => "processing",
            GameStatus::Completed => "completed",
            GameStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, GameStatus::Completed | GameStatus::Failed)
    }

    pub fn can_transition_to(self, next: GameStatus) -> bool {
        matches!(
            (self, next),
            (GameStatus::Pending, GameStatus::Processing)
                | (GameStatus::Processing, GameStatus::Completed)
                | (GameStatus::Processing, GameStatus::Failed)
        )
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(GameStatus::Pending),
            "processing" => Ok(GameStatus::Processing),
            "completed" => Ok(GameStatus::Completed),
            "failed" => Ok(GameStatus::Failed),
            other => Err(other.to_string()),
        }
    }
}

/// A submitted game. Plies are fixed at submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    pub pgn: String,
    pub plies: Vec<Ply>,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGame {
    pub pgn: String,
    pub plies: Vec<Ply>,
}

/// A mistake found by the walker, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MistakeDraft {
    pub move_index: usize,
    pub move_san: String,
    pub eval_before: i32,
    pub eval_after: i32,
    pub eval_drop: i32,
    pub fen_before: String,
}

/// A persisted mistake. Evaluations are centipawns from white's side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mistake {
    pub id: i64,
    pub game_id: i64,
    pub move_index: i32,
    pub move_san: String,
    pub eval_before: i32,
    pub eval_after: i32,
    pub eval_drop: i32,
    pub fen_before: String,
    pub explanation: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Mistake {
    /// 1-based ply number, as shown to users.
    pub fn move_number(&self) -> i32 {
        self.move_index + 1
    }
}
