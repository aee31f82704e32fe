//! Mistake analysis pipeline
//!
//! Walks submitted games through a position evaluator, records moves whose
//! evaluation drops past a threshold for the side that moved, and attaches
//! explanations from a text-generation service.

pub mod classify;
pub mod config;
pub mod db;
pub mod enrich;
pub mod error;
pub mod evaluation;
pub mod explainer;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod state;
pub mod stockfish;
pub mod walker;

pub use chess_core::{Color, Ply};
