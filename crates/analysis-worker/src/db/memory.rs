//! In-memory store for tests and one-shot CLI runs

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::GameStore;
use crate::error::StoreError;
use crate::model::{Game, GameStatus, Mistake, MistakeDraft, NewGame};

#[derive(Debug, Default)]
struct Tables {
    games: BTreeMap<i64, Game>,
    mistakes: BTreeMap<i64, Mistake>,
    next_game_id: i64,
    next_mistake_id: i64,
}

/// Store backed by ordered maps behind a mutex. The lock is never held across an await.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn create_games(&self, games: Vec<NewGame>) -> Result<Vec<i64>, StoreError> {
        let mut tables = self.tables();
        let now = Utc::now();
        let mut ids = Vec::with_capacity(games.len());

        for game in games {
            tables.next_game_id += 1;
            let id = tables.next_game_id;
            tables.games.insert(
                id,
                Game {
                    id,
                    pgn: game.pgn,
                    plies: game.plies,
                    status: GameStatus::Pending,
                    created_at: now,
                    updated_at: now,
                },
            );
            ids.push(id);
        }

        Ok(ids)
    }

    async fn fetch_game(&self, game_id: i64) -> Result<Option<Game>, StoreError> {
        Ok(self.tables().games.get(&game_id).cloned())
    }

    async fn fetch_status(&self, game_id: i64) -> Result<Option<GameStatus>, StoreError> {
        Ok(self.tables().games.get(&game_id).map(|g| g.status))
    }

    async fn compare_and_set_status(
        &self,
        game_id: i64,
        from: GameStatus,
        to: GameStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables();
        match tables.games.get_mut(&game_id) {
            Some(game) if game.status == from => {
                game.status = to;
                game.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_mistake(
        &self,
        game_id: i64,
        draft: &MistakeDraft,
    ) -> Result<Mistake, StoreError> {
        let mut tables = self.tables();
        let status = tables
            .games
            .get(&game_id)
            .map(|g| g.status)
            .ok_or(StoreError::GameNotFound(game_id))?;
        if status != GameStatus::Processing {
            return Err(StoreError::NotProcessing { game_id, status });
        }

        tables.next_mistake_id += 1;
        let mistake = Mistake {
            id: tables.next_mistake_id,
            game_id,
            move_index: draft.move_index as i32,
            move_san: draft.move_san.clone(),
            eval_before: draft.eval_before,
            eval_after: draft.eval_after,
            eval_drop: draft.eval_drop,
            fen_before: draft.fen_before.clone(),
            explanation: None,
            created_at: Utc::now(),
        };
        tables.mistakes.insert(mistake.id, mistake.clone());
        Ok(mistake)
    }

    async fn set_explanation(&self, mistake_id: i64, text: &str) -> Result<(), StoreError> {
        let mut tables = self.tables();
        let game_id = match tables.mistakes.get(&mistake_id) {
            Some(m) if m.explanation.is_none() => m.game_id,
            _ => return Err(StoreError::MistakeRejected(mistake_id)),
        };
        let processing = tables
            .games
            .get(&game_id)
            .is_some_and(|g| g.status == GameStatus::Processing);
        if !processing {
            return Err(StoreError::MistakeRejected(mistake_id));
        }

        if let Some(mistake) = tables.mistakes.get_mut(&mistake_id) {
            mistake.explanation = Some(text.to_string());
        }
        Ok(())
    }

    async fn list_mistakes(&self, game_id: i64) -> Result<Vec<Mistake>, StoreError> {
        let mut mistakes: Vec<Mistake> = self
            .tables()
            .mistakes
            .values()
            .filter(|m| m.game_id == game_id)
            .cloned()
            .collect();
        mistakes.sort_by_key(|m| m.move_index);
        Ok(mistakes)
    }

    async fn count_mistakes(&self, game_id: i64) -> Result<i64, StoreError> {
        let count = self
            .tables()
            .mistakes
            .values()
            .filter(|m| m.game_id == game_id)
            .count();
        Ok(count as i64)
    }

    async fn list_games(&self) -> Result<Vec<Game>, StoreError> {
        Ok(self.tables().games.values().cloned().collect())
    }
}
