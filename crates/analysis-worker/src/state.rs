//! Game state tracker
//!
//! PENDING -> PROCESSING -> {COMPLETED | FAILED}. Transitions are validated
//! here and applied as a compare-and-set in the store, so two tasks racing on
//! the same game cannot both win.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::db::GameStore;
use crate::error::StateError;
use crate::model::GameStatus;

#[derive(Clone)]
pub struct StateTracker {
    store: Arc<dyn GameStore>,
}

impl StateTracker {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self { store }
    }

    pub async fn current(&self, game_id: i64) -> Result<GameStatus, StateError> {
        self.store
            .fetch_status(game_id)
            .await?
            .ok_or(StateError::NotFound(game_id))
    }

    /// Move a game to `requested`. On conflict the error carries the actual current state.
    pub async fn transition(
        &self,
        game_id: i64,
        requested: GameStatus,
    ) -> Result<GameStatus, StateError> {
        let current = self.current(game_id).await?;
        if !current.can_transition_to(requested) {
            return Err(StateError::Conflict {
                game_id,
                current,
                requested,
            });
        }

        if self
            .store
            .compare_and_set_status(game_id, current, requested)
            .await?
        {
            debug!(game_id, from = %current, to = %requested, "Game state changed");
            return Ok(requested);
        }

        // Someone else moved the game between our read and write
        let actual = self.current(game_id).await?;
        warn!(game_id, current = %actual, requested = %requested, "Lost state transition race");
        Err(StateError::Conflict {
            game_id,
            current: actual,
            requested,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::model::NewGame;

    async fn tracker_with_game() -> (StateTracker, i64) {
        let store: Arc<dyn GameStore> = Arc::new(MemoryStore::new());
        let ids = store
            .create_games(vec![NewGame {
                pgn: "1. e4 *".into(),
                plies: vec![],
            }])
            .await
            .unwrap();
        (StateTracker::new(store), ids[0])
    }

    #[tokio::test]
    async fn test_happy_path() {
        let (tracker, id) = tracker_with_game().await;
        assert_eq!(tracker.current(id).await.unwrap(), GameStatus::Pending);
        tracker.transition(id, GameStatus::Processing).await.unwrap();
        tracker.transition(id, GameStatus::Completed).await.unwrap();
        assert_eq!(tracker.current(id).await.unwrap(), GameStatus::Completed);
    }

    #[tokio::test]
    async fn test_repeated_transition_rejected() {
        let (tracker, id) = tracker_with_game().await;
        tracker.transition(id, GameStatus::Processing).await.unwrap();

        let err = tracker
            .transition(id, GameStatus::Processing)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StateError::Conflict {
                current: GameStatus::Processing,
                requested: GameStatus::Processing,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_pending_cannot_skip_processing() {
        let (tracker, id) = tracker_with_game().await;
        assert!(tracker.transition(id, GameStatus::Completed).await.is_err());
        assert!(tracker.transition(id, GameStatus::Failed).await.is_err());
        assert_eq!(tracker.current(id).await.unwrap(), GameStatus::Pending);
    }

    #[tokio::test]
    async fn test_terminal_states_are_final() {
        let all = [
            GameStatus::Pending,
            GameStatus::Processing,
            GameStatus::Completed,
            GameStatus::Failed,
        ];

        for terminal in [GameStatus::Completed, GameStatus::Failed] {
            let (tracker, id) = tracker_with_game().await;
            tracker.transition(id, GameStatus::Processing).await.unwrap();
            tracker.transition(id, terminal).await.unwrap();

            for requested in all {
                let err = tracker.transition(id, requested).await.unwrap_err();
                assert!(matches!(err, StateError::Conflict { current, .. } if current == terminal));
                assert_eq!(tracker.current(id).await.unwrap(), terminal);
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_game() {
        let (tracker, _) = tracker_with_game().await;
        assert!(matches!(
            tracker.transition(42, GameStatus::Processing).await,
            Err(StateError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_racing_transitions_have_one_winner() {
        let (tracker, id) = tracker_with_game().await;
        tracker.transition(id, GameStatus::Processing).await.unwrap();

        let a = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.transition(id, GameStatus::Completed).await.is_ok() }
        });
        let b = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.transition(id, GameStatus::Failed).await.is_ok() }
        });

        let wins = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(wins.iter().filter(|w| **w).count(), 1);
        assert!(tracker.current(id).await.unwrap().is_terminal());
    }
}
