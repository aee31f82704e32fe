//! Sequential game walker
//!
//! Evaluates the starting position, then the position after every ply in
//! order, reusing each result as the next ply's "before" score. Position i is
//! only requested once position i-1 has been evaluated, so one game's walk can
//! never be parallelized.

use std::time::Duration;

use chess_core::Ply;
use futures::stream::{self, Stream};
use tracing::trace;

use crate::classify::classify;
use crate::error::EvaluationError;
use crate::evaluation::{Evaluation, Evaluator};
use crate::model::MistakeDraft;

struct WalkState<'a, E: Evaluator + ?Sized> {
    plies: &'a [Ply],
    evaluator: &'a mut E,
    threshold: i32,
    timeout: Duration,
    previous: Option<Evaluation>,
    next_ply: usize,
}

/// Lazily walk a game, yielding mistakes in ply order.
///
/// The stream ends after the last ply, or right after yielding an evaluation
/// error. Each call starts again from the first move.
pub fn walk<'a, E: Evaluator + ?Sized>(
    plies: &'a [Ply],
    evaluator: &'a mut E,
    threshold: i32,
    timeout: Duration,
) -> impl Stream<Item = Result<MistakeDraft, EvaluationError>> + 'a {
    let state = WalkState {
        plies,
        evaluator,
        threshold,
        timeout,
        previous: None,
        next_ply: 0,
    };
    stream::try_unfold(state, advance)
}

async fn advance<'a, E: Evaluator + ?Sized>(
    mut state: WalkState<'a, E>,
) -> Result<Option<(MistakeDraft, WalkState<'a, E>)>, EvaluationError> {
    let plies = state.plies;
    let Some(first) = plies.first() else {
        return Ok(None);
    };

    let mut previous = match state.previous.take() {
        Some(eval) => eval,
        None if state.next_ply == 0 => {
            evaluate(&mut *state.evaluator, &first.fen_before, state.timeout).await?
        }
        None => return Ok(None),
    };

    while state.next_ply < plies.len() {
        let index = state.next_ply;
        let ply = &plies[index];
        let current = evaluate(&mut *state.evaluator, &ply.fen_after, state.timeout)
            .await?
            .at_ply(index);
        state.next_ply += 1;
        trace!(
            ply = ?current.ply,
            before = previous.white_cp(),
            after = current.white_cp(),
            "Position evaluated"
        );

        let detail = classify(&previous, &current, ply.mover, state.threshold);
        previous = current;

        if let Some(detail) = detail {
            state.previous = Some(previous);
            let draft = MistakeDraft {
                move_index: index,
                move_san: ply.san.clone(),
                eval_before: detail.eval_before,
                eval_after: detail.eval_after,
                eval_drop: detail.drop,
                fen_before: ply.fen_before.clone(),
            };
            return Ok(Some((draft, state)));
        }
    }

    Ok(None)
}

async fn evaluate<E: Evaluator + ?Sized>(
    evaluator: &mut E,
    fen: &str,
    limit: Duration,
) -> Result<Evaluation, EvaluationError> {
    tokio::time::timeout(limit, evaluator.evaluate(fen))
        .await
        .map_err(|_| EvaluationError::Timeout(limit))?
}
