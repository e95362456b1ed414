//! Mappings of occupied squares to the attacked squares for each piece. Leaper
//! attacks (knight, king, pawns) are pre-calculated in `build.rs`, sliding
//! attacks are computed by walking the rays until the first blocker.

use crate::chess::bitboard::{Bitboard, Board};
use crate::chess::core::{Direction, Player, Square, BOARD_SIZE};

// Generated in build.rs.
const KNIGHT_ATTACKS: [Bitboard; BOARD_SIZE as usize] =
    include!(concat!(env!("OUT_DIR"), "/knight_attacks"));
const KING_ATTACKS: [Bitboard; BOARD_SIZE as usize] =
    include!(concat!(env!("OUT_DIR"), "/king_attacks"));
const WHITE_PAWN_ATTACKS: [Bitboard; BOARD_SIZE as usize] =
    include!(concat!(env!("OUT_DIR"), "/white_pawn_attacks"));
const BLACK_PAWN_ATTACKS: [Bitboard; BOARD_SIZE as usize] =
    include!(concat!(env!("OUT_DIR"), "/black_pawn_attacks"));

pub(super) const fn knight_attacks(square: Square) -> Bitboard {
    KNIGHT_ATTACKS[square as usize]
}

pub(super) const fn king_attacks(square: Square) -> Bitboard {
    KING_ATTACKS[square as usize]
}

/// Squares attacked by a pawn of `player` standing on `square`.
pub(super) const fn pawn_attacks(square: Square, player: Player) -> Bitboard {
    match player {
        Player::White => WHITE_PAWN_ATTACKS[square as usize],
        Player::Black => BLACK_PAWN_ATTACKS[square as usize],
    }
}

fn sliding_attacks(square: Square, occupancy: Bitboard, directions: [Direction; 4]) -> Bitboard {
    let mut result = Bitboard::empty();
    for direction in directions {
        let mut current = square;
        while let Some(next) = current.shift(direction) {
            result |= Bitboard::from(next);
            if occupancy.contains(next) {
                break;
            }
            current = next;
        }
    }
    result
}

pub(super) fn rook_attacks(square: Square, occupancy: Bitboard) -> Bitboard {
    sliding_attacks(square, occupancy, Direction::ORTHOGONAL)
}

pub(super) fn bishop_attacks(square: Square, occupancy: Bitboard) -> Bitboard {
    sliding_attacks(square, occupancy, Direction::DIAGONAL)
}

pub(super) fn queen_attacks(square: Square, occupancy: Bitboard) -> Bitboard {
    rook_attacks(square, occupancy) | bishop_attacks(square, occupancy)
}

/// Returns the pieces of `attacker` that attack `square`.
///
/// Attacks are symmetric: a knight on `square` would attack exactly the
/// squares from which knights attack it, and the same holds for all other
/// pieces (pawns with the color flipped).
pub(super) fn attackers(board: &Board, square: Square, attacker: Player) -> Bitboard {
    let pieces = board.player_pieces(attacker);
    let occupancy = board.occupancy();
    (knight_attacks(square) & pieces.knights)
        | (king_attacks(square) & pieces.king)
        | (pawn_attacks(square, attacker.opponent()) & pieces.pawns)
        | (rook_attacks(square, occupancy) & (pieces.rooks | pieces.queens))
        | (bishop_attacks(square, occupancy) & (pieces.bishops | pieces.queens))
}

pub(super) fn is_attacked(board: &Board, square: Square, attacker: Player) -> bool {
    attackers(board, square, attacker).has_any()
}
