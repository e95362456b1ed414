//! The rules: positions and legal moves, and the game record that only
//! advances through validated moves.

pub mod attacks;
pub mod bitboard;
pub mod core;
pub mod game;
pub mod position;
pub mod zobrist;
