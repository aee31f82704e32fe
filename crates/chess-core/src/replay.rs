//! Replay SAN move lists into plies with FEN positions on both sides of each move.

use shakmaty::{fen::Fen, san::San, Chess, EnPassantMode, Position};
use thiserror::Error;

use crate::game_data::{Color, Ply};
use crate::pgn;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("PGN could not be parsed or starts from a custom position")]
    Unparseable,

    #[error("Game has no moves")]
    Empty,

    #[error("Invalid SAN '{san}' at ply {ply}")]
    InvalidSan { ply: usize, san: String },

    #[error("Illegal move '{san}' at ply {ply}")]
    IllegalMove { ply: usize, san: String },
}

/// Replay SAN moves from the standard starting position.
pub fn replay(san_moves: &[String]) -> Result<Vec<Ply>, ReplayError> {
    let mut pos = Chess::default();
    let mut fen_before = fen_of(&pos);
    let mut plies = Vec::with_capacity(san_moves.len());

    for (i, san_str) in san_moves.iter().enumerate() {
        let san: San = san_str.parse().map_err(|_| ReplayError::InvalidSan {
            ply: i,
            san: san_str.clone(),
        })?;
        let mv = san.to_move(&pos).map_err(|_| ReplayError::IllegalMove {
            ply: i,
            san: san_str.clone(),
        })?;

        let mover = Color::from(pos.turn());
        pos.play_unchecked(mv);
        let fen_after = fen_of(&pos);

        plies.push(Ply {
            san: san_str.clone(),
            fen_before: std::mem::replace(&mut fen_before, fen_after.clone()),
            fen_after,
            mover,
        });
    }

    Ok(plies)
}

/// Parse a PGN and replay its mainline. Fails on games with no moves.
pub fn decode_pgn(pgn_text: &str) -> Result<Vec<Ply>, ReplayError> {
    let moves = pgn::mainline_moves(pgn_text).ok_or(ReplayError::Unparseable)?;
    if moves.is_empty() {
        return Err(ReplayError::Empty);
    }
    replay(&moves)
}

/// Side to move according to the second FEN field.
pub fn side_to_move(fen: &str) -> Option<Color> {
    match fen.split_whitespace().nth(1)? {
        "w" => Some(Color::White),
        "b" => Some(Color::Black),
        _ => None,
    }
}

fn fen_of(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pgn::STANDARD_START_FEN;

    fn moves(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_replay_chains_positions() {
        let plies = replay(&moves("e4 e5 Nf3")).unwrap();
        assert_eq!(plies.len(), 3);
        assert_eq!(plies[0].fen_before, STANDARD_START_FEN);
        assert_eq!(plies[0].mover, Color::White);
        assert_eq!(plies[1].mover, Color::Black);
        assert_eq!(plies[0].fen_after, plies[1].fen_before);
        assert_eq!(plies[1].fen_after, plies[2].fen_before);
        assert_eq!(side_to_move(&plies[2].fen_after), Some(Color::Black));
    }

    #[test]
    fn test_replay_rejects_illegal_move() {
        let err = replay(&moves("e4 e4")).unwrap_err();
        assert_eq!(
            err,
            ReplayError::IllegalMove {
                ply: 1,
                san: "e4".into()
            }
        );
    }

    #[test]
    fn test_decode_pgn() {
        let pgn = r#"[Event "Test"]

1. f3 e5 2. g4 Qh4# 0-1"#;
        let plies = decode_pgn(pgn).unwrap();
        assert_eq!(plies.len(), 4);
        assert_eq!(plies[3].san, "Qh4#");
        assert_eq!(plies[3].mover, Color::Black);
    }

    #[test]
    fn test_decode_pgn_zero_castling() {
        let plies = decode_pgn("1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. 0-0 Nf6 *").unwrap();
        assert_eq!(plies.len(), 8);
        assert_eq!(plies[6].san, "O-O");
        assert_eq!(plies[6].mover, Color::White);
        assert_eq!(plies[7].san, "Nf6");
        assert_eq!(plies[7].mover, Color::Black);
        assert!(plies[6].fen_after.starts_with("r1bqk1nr/pppp1ppp/2n5/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQ1RK1 b kq"));
    }

    #[test]
    fn test_decode_pgn_without_moves() {
        assert_eq!(decode_pgn("[Event \"Empty\"]\n\n*"), Err(ReplayError::Empty));
    }

    #[test]
    fn test_side_to_move() {
        assert_eq!(side_to_move(STANDARD_START_FEN), Some(Color::White));
        assert_eq!(side_to_move("garbage"), None);
    }
}
