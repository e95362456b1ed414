//! Zobrist hashing-related utilities: position keys and the repetition table
//! used to detect threefold repetition.

use std::collections::HashMap;

use crate::chess::core::{CastleRights, File, Piece, PieceKind, Player, Square, BOARD_SIZE};

/// Zobrist keys are 64-bit unsigned integers computed by XOR-ing the keys of
/// every feature of the position.
pub type Key = u64;

// Generated in build.rs: 12 piece kinds on 64 squares, side to move, 4
// castling rights and 8 en passant files.
const KEYS_COUNT: usize = 12 * BOARD_SIZE as usize + 1 + 4 + 8;
const KEYS: [Key; KEYS_COUNT] = include!(concat!(env!("OUT_DIR"), "/zobrist_keys"));

const BLACK_TO_MOVE_INDEX: usize = 12 * BOARD_SIZE as usize;
const CASTLING_INDEX: usize = BLACK_TO_MOVE_INDEX + 1;
const EN_PASSANT_INDEX: usize = CASTLING_INDEX + 4;

pub(super) fn piece_key(piece: Piece, square: Square) -> Key {
    let kind = match piece.kind {
        PieceKind::King => 0,
        PieceKind::Queen => 1,
        PieceKind::Rook => 2,
        PieceKind::Bishop => 3,
        PieceKind::Knight => 4,
        PieceKind::Pawn => 5,
    };
    let owner = match piece.owner {
        Player::White => 0,
        Player::Black => 6,
    };
    KEYS[(owner + kind) * BOARD_SIZE as usize + square as usize]
}

pub(super) const fn side_key(player: Player) -> Key {
    match player {
        Player::White => 0,
        Player::Black => KEYS[BLACK_TO_MOVE_INDEX],
    }
}

pub(super) fn castling_key(rights: CastleRights) -> Key {
    [
        CastleRights::WHITE_SHORT,
        CastleRights::WHITE_LONG,
        CastleRights::BLACK_SHORT,
        CastleRights::BLACK_LONG,
    ]
    .into_iter()
    .enumerate()
    .filter(|(_, right)| rights.contains(*right))
    .fold(0, |key, (index, _)| key ^ KEYS[CASTLING_INDEX + index])
}

pub(super) const fn en_passant_key(file: File) -> Key {
    KEYS[EN_PASSANT_INDEX + file as usize]
}

/// Counts how many times each position occurred in the game.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepetitionTable {
    table: HashMap<Key, u8>,
}

impl RepetitionTable {
    /// Creates an empty repetition table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the occurrence of a position and returns how many times it has
    /// been seen so far.
    pub fn record(&mut self, key: Key) -> u8 {
        let count = self.table.entry(key).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// How many times the position occurred.
    #[must_use]
    pub fn count(&self, key: Key) -> u8 {
        self.table.get(&key).copied().unwrap_or(0)
    }
}
