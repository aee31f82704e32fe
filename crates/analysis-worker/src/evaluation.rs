//! Position evaluations and the evaluator seam

use async_trait::async_trait;
use chess_core::Color;

use crate::error::EvaluationError;

/// Magnitude a forced mate maps to. Centipawn scores are clamped into this range.
pub const MATE_SCORE: i32 = 10_000;

/// Mate distances beyond this all map to the same score.
const MAX_MATE_DISTANCE: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    /// Mate in N moves (positive = perspective side mates, zero or negative = it gets mated)
    Mate(i32),
}

/// A score tagged with the side it is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub score: Score,
    pub perspective: Color,
    /// Ply this evaluation follows; None for the starting position
    pub ply: Option<usize>,
}

impl Evaluation {
    pub fn new(score: Score, perspective: Color) -> Self {
        Self {
            score,
            perspective,
            ply: None,
        }
    }

    pub fn cp(cp: i32, perspective: Color) -> Self {
        Self::new(Score::Centipawns(cp), perspective)
    }

    pub fn mate(moves: i32, perspective: Color) -> Self {
        Self::new(Score::Mate(moves), perspective)
    }

    pub fn at_ply(mut self, ply: usize) -> Self {
        self.ply = Some(ply);
        self
    }

    /// Centipawns from the perspective side, mates saturated to ±MATE_SCORE.
    pub fn centipawns(&self) -> i32 {
        match self.score {
            Score::Centipawns(cp) => cp.clamp(-MATE_SCORE, MATE_SCORE),
            Score::Mate(m) => {
                let distance = m.saturating_abs().min(MAX_MATE_DISTANCE);
                if m > 0 {
                    MATE_SCORE - distance * 10
                } else {
                    -MATE_SCORE + distance * 10
                }
            }
        }
    }

    /// Centipawns normalized to white's side (white advantage positive).
    pub fn white_cp(&self) -> i32 {
        match self.perspective {
            Color::White => self.centipawns(),
            Color::Black => -self.centipawns(),
        }
    }
}

/// Supplies evaluations for positions given as FEN.
#[async_trait]
pub trait Evaluator: Send {
    async fn evaluate(&mut self, fen: &str) -> Result<Evaluation, EvaluationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_perspective_normalization() {
        assert_eq!(Evaluation::cp(35, Color::White).white_cp(), 35);
        assert_eq!(Evaluation::cp(35, Color::Black).white_cp(), -35);
    }

    #[test]
    fn test_mate_scores_saturate_with_sign() {
        assert_eq!(Evaluation::mate(3, Color::White).white_cp(), 9970);
        assert_eq!(Evaluation::mate(-2, Color::White).white_cp(), -9980);
        assert_eq!(Evaluation::mate(0, Color::White).white_cp(), -MATE_SCORE);
        assert_eq!(Evaluation::mate(3, Color::Black).white_cp(), -9970);
        assert_eq!(Evaluation::mate(i32::MIN, Color::White).white_cp(), -9000);
    }

    #[test]
    fn test_at_ply_tags_evaluation() {
        let start = Evaluation::cp(20, Color::White);
        assert_eq!(start.ply, None);
        let after = Evaluation::cp(20, Color::White).at_ply(4);
        assert_eq!(after.ply, Some(4));
        assert_eq!(after.white_cp(), start.white_cp());
    }

    #[test]
    fn test_centipawns_clamped() {
        assert_eq!(Evaluation::cp(i32::MAX, Color::White).white_cp(), MATE_SCORE);
        assert_eq!(Evaluation::cp(i32::MIN, Color::Black).white_cp(), MATE_SCORE);
    }
}
