//! Evaluation delta classification
//! (No board, engine or store dependencies)

use chess_core::Color;

use crate::evaluation::Evaluation;

/// Default drop, in centipawns, past which a move counts as a mistake
pub const DEFAULT_MISTAKE_THRESHOLD: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MistakeDetail {
    /// White-perspective centipawns before the move
    pub eval_before: i32,
    /// White-perspective centipawns after the move
    pub eval_after: i32,
    /// How much worse the position got for the mover; never negative
    pub drop: i32,
}

/// Centipawns lost by `mover`, given white-perspective scores around its move.
/// Negative when the move improved the mover's position.
pub fn eval_drop(before_white: i32, after_white: i32, mover: Color) -> i32 {
    match mover {
        Color::White => before_white - after_white,
        Color::Black => after_white - before_white,
    }
}

pub fn classify(
    before: &Evaluation,
    after: &Evaluation,
    mover: Color,
    threshold: i32,
) -> Option<MistakeDetail> {
    let eval_before = before.white_cp();
    let eval_after = after.white_cp();
    let drop = eval_drop(eval_before, eval_after, mover);

    (drop > threshold.max(0)).then_some(MistakeDetail {
        eval_before,
        eval_after,
        drop,
    })
}
