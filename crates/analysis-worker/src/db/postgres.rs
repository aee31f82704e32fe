//! Postgres-backed store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use super::GameStore;
use crate::error::StoreError;
use crate::model::{Game, GameStatus, Mistake, MistakeDraft, NewGame};

type GameRow = (i64, String, JsonValue, String, DateTime<Utc>, DateTime<Utc>);

type MistakeRow = (
    i64,
    i64,
    i32,
    String,
    i32,
    i32,
    i32,
    String,
    Option<String>,
    DateTime<Utc>,
);

const GAME_COLUMNS: &str = "id, pgn, plies, status, created_at, updated_at";

const MISTAKE_COLUMNS: &str = "id, game_id, move_index, move_san, eval_before, eval_after, \
     eval_drop, fen_before, explanation, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_status(raw: &str) -> Result<GameStatus, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::UnknownStatus(raw.to_string()))
}

fn game_from_row(row: GameRow) -> Result<Game, StoreError> {
    let (id, pgn, plies, status, created_at, updated_at) = row;
    Ok(Game {
        id,
        pgn,
        plies: serde_json::from_value(plies)?,
        status: parse_status(&status)?,
        created_at,
        updated_at,
    })
}

fn mistake_from_row(row: MistakeRow) -> Mistake {
    let (
        id,
        game_id,
        move_index,
        move_san,
        eval_before,
        eval_after,
        eval_drop,
        fen_before,
        explanation,
        created_at,
    ) = row;
    Mistake {
        id,
        game_id,
        move_index,
        move_san,
        eval_before,
        eval_after,
        eval_drop,
        fen_before,
        explanation,
        created_at,
    }
}

#[async_trait]
impl GameStore for PgStore {
    async fn create_games(&self, games: Vec<NewGame>) -> Result<Vec<i64>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(games.len());

        for game in games {
            let plies = serde_json::to_value(&game.plies)?;
            let (id,): (i64,) = sqlx::query_as(
                "INSERT INTO games (pgn, plies, status) VALUES ($1, $2, 'pending') RETURNING id",
            )
            .bind(&game.pgn)
            .bind(&plies)
            .fetch_one(&mut *tx)
            .await?;
            ids.push(id);
        }

        tx.commit().await?;
        Ok(ids)
    }

    async fn fetch_game(&self, game_id: i64) -> Result<Option<Game>, StoreError> {
        let row: Option<GameRow> =
            sqlx::query_as(&format!("SELECT {GAME_COLUMNS} FROM games WHERE id = $1"))
                .bind(game_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(game_from_row).transpose()
    }

    async fn fetch_status(&self, game_id: i64) -> Result<Option<GameStatus>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT status FROM games WHERE id = $1")
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(status,)| parse_status(&status)).transpose()
    }

    async fn compare_and_set_status(
        &self,
        game_id: i64,
        from: GameStatus,
        to: GameStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE games SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(game_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_mistake(
        &self,
        game_id: i64,
        draft: &MistakeDraft,
    ) -> Result<Mistake, StoreError> {
        // Guarded on the owning game's status in the same statement
        let row: Option<MistakeRow> = sqlx::query_as(&format!(
            r#"INSERT INTO mistakes (
                game_id, move_index, move_san, eval_before, eval_after, eval_drop, fen_before
            )
            SELECT g.id, $2::INTEGER, $3::TEXT, $4::INTEGER, $5::INTEGER, $6::INTEGER, $7::TEXT
            FROM games g
            WHERE g.id = $1 AND g.status = 'processing'
            RETURNING {MISTAKE_COLUMNS}"#
        ))
        .bind(game_id)
        .bind(draft.move_index as i32)
        .bind(&draft.move_san)
        .bind(draft.eval_before)
        .bind(draft.eval_after)
        .bind(draft.eval_drop)
        .bind(&draft.fen_before)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(mistake_from_row(row)),
            None => match self.fetch_status(game_id).await? {
                Some(status) => Err(StoreError::NotProcessing { game_id, status }),
                None => Err(StoreError::GameNotFound(game_id)),
            },
        }
    }

    async fn set_explanation(&self, mistake_id: i64, text: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"UPDATE mistakes m SET explanation = $2
               FROM games g
               WHERE m.id = $1
                 AND m.game_id = g.id
                 AND g.status = 'processing'
                 AND m.explanation IS NULL"#,
        )
        .bind(mistake_id)
        .bind(text)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(StoreError::MistakeRejected(mistake_id))
        }
    }

    async fn list_mistakes(&self, game_id: i64) -> Result<Vec<Mistake>, StoreError> {
        let rows: Vec<MistakeRow> = sqlx::query_as(&format!(
            "SELECT {MISTAKE_COLUMNS} FROM mistakes WHERE game_id = $1 ORDER BY move_index"
        ))
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(mistake_from_row).collect())
    }

    async fn count_mistakes(&self, game_id: i64) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mistakes WHERE game_id = $1")
            .bind(game_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_games(&self) -> Result<Vec<Game>, StoreError> {
        let rows: Vec<GameRow> =
            sqlx::query_as(&format!("SELECT {GAME_COLUMNS} FROM games ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(game_from_row).collect()
    }
}
