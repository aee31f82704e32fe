//! Chess notation helpers shared by the pipeline and the server.

pub mod game_data;
pub mod pgn;
pub mod replay;

pub use game_data::{Color, Ply};
pub use replay::{decode_pgn, replay, side_to_move, ReplayError};
