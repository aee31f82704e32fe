//! Game and mistake persistence
//!
//! Every write is a single-row atomic operation. Writes that would touch a
//! game outside PROCESSING (or a mistake that was already explained) are
//! rejected by the store itself.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Game, GameStatus, Mistake, MistakeDraft, NewGame};

#[async_trait]
pub trait GameStore: Send + Sync {
    /// Insert games as PENDING, returning their ids in input order.
    async fn create_games(&self, games: Vec<NewGame>) -> Result<Vec<i64>, StoreError>;

    async fn fetch_game(&self, game_id: i64) -> Result<Option<Game>, StoreError>;

    async fn fetch_status(&self, game_id: i64) -> Result<Option<GameStatus>, StoreError>;

    /// Set `to` only if the game is currently `from`. Returns whether the row changed.
    async fn compare_and_set_status(
        &self,
        game_id: i64,
        from: GameStatus,
        to: GameStatus,
    ) -> Result<bool, StoreError>;

    /// Persist a mistake for a PROCESSING game.
    async fn insert_mistake(
        &self,
        game_id: i64,
        draft: &MistakeDraft,
    ) -> Result<Mistake, StoreError>;

    /// Attach an explanation once, while the owning game is PROCESSING.
    async fn set_explanation(&self, mistake_id: i64, text: &str) -> Result<(), StoreError>;

    /// Mistakes of one game ordered by move index.
    async fn list_mistakes(&self, game_id: i64) -> Result<Vec<Mistake>, StoreError>;

    async fn count_mistakes(&self, game_id: i64) -> Result<i64, StoreError>;

    /// All games, oldest first.
    async fn list_games(&self) -> Result<Vec<Game>, StoreError>;
}
