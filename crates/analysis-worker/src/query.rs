//! Read-side projections served to API clients and the CLI

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::GameStore;
use crate::error::StoreError;
use crate::model::{Game, GameStatus, Mistake};

#[derive(Debug, Serialize)]
pub struct MistakeView {
    pub id: i64,
    pub move_number: i32,
    pub move_san: String,
    pub eval_before: i32,
    pub eval_after: i32,
    pub eval_drop: i32,
    pub fen_before: String,
    pub explanation: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Mistake> for MistakeView {
    fn from(m: Mistake) -> Self {
        Self {
            id: m.id,
            move_number: m.move_number(),
            move_san: m.move_san,
            eval_before: m.eval_before,
            eval_after: m.eval_after,
            eval_drop: m.eval_drop,
            fen_before: m.fen_before,
            explanation: m.explanation,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GameView {
    pub id: i64,
    pub pgn: String,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub mistakes: Vec<MistakeView>,
}

#[derive(Debug, Serialize)]
pub struct GameStatusView {
    pub game_id: i64,
    pub status: GameStatus,
    pub mistakes_count: i64,
}

async fn view_of(store: &dyn GameStore, game: Game) -> Result<GameView, StoreError> {
    let mistakes = store.list_mistakes(game.id).await?;
    Ok(GameView {
        id: game.id,
        pgn: game.pgn,
        status: game.status,
        created_at: game.created_at,
        updated_at: game.updated_at,
        mistakes: mistakes.into_iter().map(MistakeView::from).collect(),
    })
}

/// One game with its mistakes, or None if the id is unknown.
pub async fn game_view(store: &dyn GameStore, game_id: i64) -> Result<Option<GameView>, StoreError> {
    match store.fetch_game(game_id).await? {
        Some(game) => Ok(Some(view_of(store, game).await?)),
        None => Ok(None),
    }
}

pub async fn game_status(
    store: &dyn GameStore,
    game_id: i64,
) -> Result<Option<GameStatusView>, StoreError> {
    let Some(status) = store.fetch_status(game_id).await? else {
        return Ok(None);
    };
    let mistakes_count = store.count_mistakes(game_id).await?;
    Ok(Some(GameStatusView {
        game_id,
        status,
        mistakes_count,
    }))
}

pub async fn all_games(store: &dyn GameStore) -> Result<Vec<GameView>, StoreError> {
    let games = store.list_games().await?;
    let mut views = Vec::with_capacity(games.len());
    for game in games {
        views.push(view_of(store, game).await?);
    }
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::model::{MistakeDraft, NewGame};

    #[tokio::test]
    async fn test_views_number_moves_from_one() {
        let store = MemoryStore::new();
        let ids = store
            .create_games(vec![NewGame {
                pgn: "1. f3 e5 2. g4 Qh4# 0-1".into(),
                plies: vec![],
            }])
            .await
            .unwrap();
        store
            .compare_and_set_status(ids[0], GameStatus::Pending, GameStatus::Processing)
            .await
            .unwrap();
        store
            .insert_mistake(
                ids[0],
                &MistakeDraft {
                    move_index: 2,
                    move_san: "g4".into(),
                    eval_before: -50,
                    eval_after: -10_000,
                    eval_drop: 9_950,
                    fen_before: "fen".into(),
                },
            )
            .await
            .unwrap();

        let view = game_view(&store, ids[0]).await.unwrap().unwrap();
        assert_eq!(view.mistakes.len(), 1);
        assert_eq!(view.mistakes[0].move_number, 3);

        let status = game_status(&store, ids[0]).await.unwrap().unwrap();
        assert_eq!(status.status, GameStatus::Processing);
        assert_eq!(status.mistakes_count, 1);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "processing");
    }

    #[tokio::test]
    async fn test_unknown_game_is_none() {
        let store = MemoryStore::new();
        assert!(game_view(&store, 7).await.unwrap().is_none());
        assert!(game_status(&store, 7).await.unwrap().is_none());
        assert!(all_games(&store).await.unwrap().is_empty());
    }
}
