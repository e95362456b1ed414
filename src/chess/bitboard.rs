//! [`Bitboard`]-based representation of the board.
//!
//! The same 64-bit layout is shared by two very different things: the logical
//! piece placement owned by [`crate::chess::position::Position`] and the raw
//! occupancy field sent by the sensor board. Sharing it makes comparing the
//! physical board with the expected position a single XOR.
//!
//! [Bitboard]: https://www.chessprogramming.org/Bitboards

use std::fmt::{self, Write};
use std::mem;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, Not, Sub, SubAssign};

use itertools::Itertools;

use crate::chess::core::{Piece, PieceKind, Player, Square, BOARD_WIDTH};

/// Represents a set of squares and provides common operations (e.g. AND, OR,
/// XOR) over these sets. Each bit corresponds to one of 64 squares of the chess
/// board.
///
/// Mirroring [`Square`] semantics, the least significant bit corresponds to
/// A1, and the most significant bit - to H8.
///
/// Bitboard is a thin wrapper around [u64].
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bitboard {
    bits: u64,
}

impl Bitboard {
    /// Constructs Bitboard from pre-calculated bits.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self { bits }
    }

    /// Constructs a bitboard representing empty set of squares.
    #[must_use]
    pub const fn empty() -> Self {
        Self::from_bits(0)
    }

    /// Constructs a bitboard representing the universal set, it contains all
    /// squares by setting all bits to binary one.
    #[must_use]
    pub const fn full() -> Self {
        Self::from_bits(u64::MAX)
    }

    /// Returns raw bits.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.bits
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn from_squares(squares: &[Square]) -> Self {
        let mut result = Self::empty();
        for square in squares {
            result |= Self::from(*square);
        }
        result
    }

    /// Returns true if this bitboard contains given square.
    #[must_use]
    pub const fn contains(self, square: Square) -> bool {
        (self.bits & (1u64 << square as u8)) != 0
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn count(self) -> u32 {
        self.bits.count_ones()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn has_any(self) -> bool {
        !self.is_empty()
    }

    /// Returns the only square in the set. Should only be called on bitboards
    /// with exactly one bit set.
    #[must_use]
    pub fn as_square(self) -> Square {
        debug_assert_eq!(self.count(), 1, "{self:?}");
        unsafe { mem::transmute(self.bits.trailing_zeros() as u8) }
    }

    /// The same set of squares as seen from the other side of the board.
    #[must_use]
    pub const fn rotate(self) -> Self {
        Self::from_bits(self.bits.reverse_bits())
    }

    /// An efficient way to iterate over the set squares.
    #[must_use]
    pub const fn iter(self) -> BitboardIterator {
        BitboardIterator { bits: self.bits }
    }
}

impl fmt::Debug for Bitboard {
    /// Dumps the set as an 8x8 grid with rank 8 at the top.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let squares = Square::iter().collect_vec();
        let lines = squares.chunks(BOARD_WIDTH as usize).rev().map(|rank| {
            rank.iter()
                .map(|square| if self.contains(*square) { '1' } else { '.' })
                .join(SQUARE_SEPARATOR)
        });
        f.write_str(&lines.collect_vec().join(LINE_SEPARATOR))
    }
}

impl BitOr for Bitboard {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.bits | rhs.bits)
    }
}

impl BitOrAssign for Bitboard {
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits |= rhs.bits;
    }
}

impl BitAnd for Bitboard {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.bits & rhs.bits)
    }
}

impl BitAndAssign for Bitboard {
    fn bitand_assign(&mut self, rhs: Self) {
        self.bits &= rhs.bits;
    }
}

impl BitXor for Bitboard {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.bits ^ rhs.bits)
    }
}

impl Sub for Bitboard {
    type Output = Self;

    /// Relative complement of the sets.
    fn sub(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.bits & !rhs.bits)
    }
}

impl SubAssign for Bitboard {
    fn sub_assign(&mut self, rhs: Self) {
        self.bits &= !rhs.bits;
    }
}

impl Not for Bitboard {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::from_bits(!self.bits)
    }
}

impl From<Square> for Bitboard {
    fn from(square: Square) -> Self {
        Self::from_bits(1u64 << square as u8)
    }
}

impl FromIterator<Square> for Bitboard {
    fn from_iter<I: IntoIterator<Item = Square>>(squares: I) -> Self {
        let mut result = Self::empty();
        for square in squares {
            result |= Self::from(square);
        }
        result
    }
}

/// Iterates over set bits in Bitboard from least significant 1 bits (LS1B) to
/// most significant 1 bits (MS1B) through implementing [BitScan] forward
/// operation.
///
/// [BitScan]: https://www.chessprogramming.org/BitScan
pub struct BitboardIterator {
    bits: u64,
}

impl Iterator for BitboardIterator {
    type Item = Square;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bits == 0 {
            return None;
        }
        // Get the LS1B and consume it from the iterator.
        let next_index = self.bits.trailing_zeros();
        self.bits ^= 1 << next_index;
        // The conversion is safe because trailing_zeros() will return a number
        // in 0..64 range.
        Some(unsafe { mem::transmute::<u8, Square>(next_index as u8) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self.bits.count_ones() as usize;
        (count, Some(count))
    }
}

/// Piece-centric representation of all material owned by one player. Uses
/// [Bitboard] to store a set of squares occupied by each piece.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pieces {
    #[allow(missing_docs)]
    pub king: Bitboard,
    #[allow(missing_docs)]
    pub queens: Bitboard,
    #[allow(missing_docs)]
    pub rooks: Bitboard,
    #[allow(missing_docs)]
    pub bishops: Bitboard,
    #[allow(missing_docs)]
    pub knights: Bitboard,
    #[allow(missing_docs)]
    pub pawns: Bitboard,
}

impl Pieces {
    pub(super) const fn empty() -> Self {
        Self {
            king: Bitboard::empty(),
            queens: Bitboard::empty(),
            rooks: Bitboard::empty(),
            bishops: Bitboard::empty(),
            knights: Bitboard::empty(),
            pawns: Bitboard::empty(),
        }
    }

    pub(super) const fn new_white() -> Self {
        Self {
            king: Bitboard::from_bits(0x0000_0000_0000_0010),
            queens: Bitboard::from_bits(0x0000_0000_0000_0008),
            rooks: Bitboard::from_bits(0x0000_0000_0000_0081),
            bishops: Bitboard::from_bits(0x0000_0000_0000_0024),
            knights: Bitboard::from_bits(0x0000_0000_0000_0042),
            pawns: Bitboard::from_bits(0x0000_0000_0000_FF00),
        }
    }

    pub(super) const fn new_black() -> Self {
        Self {
            king: Bitboard::from_bits(0x1000_0000_0000_0000),
            queens: Bitboard::from_bits(0x0800_0000_0000_0000),
            rooks: Bitboard::from_bits(0x8100_0000_0000_0000),
            bishops: Bitboard::from_bits(0x2400_0000_0000_0000),
            knights: Bitboard::from_bits(0x4200_0000_0000_0000),
            pawns: Bitboard::from_bits(0x00FF_0000_0000_0000),
        }
    }

    /// All squares occupied by the player.
    #[must_use]
    pub fn all(&self) -> Bitboard {
        self.king | self.queens | self.rooks | self.bishops | self.knights | self.pawns
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn bitboard(&self, kind: PieceKind) -> Bitboard {
        match kind {
            PieceKind::King => self.king,
            PieceKind::Queen => self.queens,
            PieceKind::Rook => self.rooks,
            PieceKind::Bishop => self.bishops,
            PieceKind::Knight => self.knights,
            PieceKind::Pawn => self.pawns,
        }
    }

    pub(super) fn bitboard_for(&mut self, kind: PieceKind) -> &mut Bitboard {
        match kind {
            PieceKind::King => &mut self.king,
            PieceKind::Queen => &mut self.queens,
            PieceKind::Rook => &mut self.rooks,
            PieceKind::Bishop => &mut self.bishops,
            PieceKind::Knight => &mut self.knights,
            PieceKind::Pawn => &mut self.pawns,
        }
    }

    /// Iterates over piece kinds together with the squares they occupy.
    pub fn iter(&self) -> impl Iterator<Item = (PieceKind, Bitboard)> + '_ {
        PieceKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.bitboard(kind)))
    }

    #[must_use]
    fn at(&self, square: Square) -> Option<PieceKind> {
        self.iter()
            .find_map(|(kind, bitboard)| bitboard.contains(square).then_some(kind))
    }
}

/// Piece-centric implementation of the chess board: the logical piece
/// placement. Maps each square to an optional [`Piece`] through [`Board::at`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Board {
    pub(super) white_pieces: Pieces,
    pub(super) black_pieces: Pieces,
}

impl Board {
    #[must_use]
    pub(super) const fn starting() -> Self {
        Self {
            white_pieces: Pieces::new_white(),
            black_pieces: Pieces::new_black(),
        }
    }

    // Constructs an empty Board to be filled by the position parser.
    #[must_use]
    pub(super) const fn empty() -> Self {
        Self {
            white_pieces: Pieces::empty(),
            black_pieces: Pieces::empty(),
        }
    }

    /// Pieces owned by given player.
    #[must_use]
    pub const fn player_pieces(&self, player: Player) -> &Pieces {
        match player {
            Player::White => &self.white_pieces,
            Player::Black => &self.black_pieces,
        }
    }

    pub(super) fn player_pieces_mut(&mut self, player: Player) -> &mut Pieces {
        match player {
            Player::White => &mut self.white_pieces,
            Player::Black => &mut self.black_pieces,
        }
    }

    /// Squares occupied by any piece: what an ideal sensor board would report.
    #[must_use]
    pub fn occupancy(&self) -> Bitboard {
        self.white_pieces.all() | self.black_pieces.all()
    }

    /// Returns the piece standing on given square.
    #[must_use]
    pub fn at(&self, square: Square) -> Option<Piece> {
        if let Some(kind) = self.white_pieces.at(square) {
            return Some(Piece::new(Player::White, kind));
        }
        self.black_pieces
            .at(square)
            .map(|kind| Piece::new(Player::Black, kind))
    }

    pub(super) fn put(&mut self, square: Square, piece: Piece) {
        *self.player_pieces_mut(piece.owner).bitboard_for(piece.kind) |= Bitboard::from(square);
    }

    pub(super) fn remove(&mut self, square: Square) -> Option<Piece> {
        let piece = self.at(square)?;
        *self.player_pieces_mut(piece.owner).bitboard_for(piece.kind) -= Bitboard::from(square);
        Some(piece)
    }
}

impl fmt::Display for Board {
    /// Prints piece placement in FEN format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let squares = Square::iter().collect_vec();
        for (index, rank) in squares.chunks(BOARD_WIDTH as usize).rev().enumerate() {
            if index != 0 {
                const RANK_SEPARATOR: char = '/';
                f.write_char(RANK_SEPARATOR)?;
            }
            let mut empty_squares = 0;
            for square in rank {
                if let Some(piece) = self.at(*square) {
                    if empty_squares != 0 {
                        write!(f, "{empty_squares}")?;
                        empty_squares = 0;
                    }
                    write!(f, "{piece}")?;
                } else {
                    empty_squares += 1;
                }
            }
            if empty_squares != 0 {
                write!(f, "{empty_squares}")?;
            }
        }
        Ok(())
    }
}

/// Dumps the board in a simple format ('.' for empty square, FEN algebraic
/// symbol for piece) a-la Stockfish "d" command.
pub(super) fn dump(board: &Board, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let squares = Square::iter().collect_vec();
    let lines = squares.chunks(BOARD_WIDTH as usize).rev().map(|rank| {
        rank.iter()
            .map(|square| match board.at(*square) {
                Some(piece) => piece.to_string(),
                None => ".".to_string(),
            })
            .join(SQUARE_SEPARATOR)
    });
    f.write_str(&lines.collect_vec().join(LINE_SEPARATOR))
}

const LINE_SEPARATOR: &str = "\n";
const SQUARE_SEPARATOR: &str = " ";

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn basics() {
        assert_eq!(std::mem::size_of::<Bitboard>(), 8);
        assert_eq!(Bitboard::full().bits(), u64::MAX);
        assert_eq!(Bitboard::empty().bits(), u64::MIN);
        assert_eq!(Bitboard::from(Square::A1).bits(), 1);
        assert_eq!(Bitboard::from(Square::B1).bits(), 2);
        assert_eq!(Bitboard::from(Square::H8).bits(), 1u64 << 63);
        assert_eq!(
            Bitboard::from(Square::A1) | Bitboard::from(Square::B1),
            Bitboard::from_bits(0b11)
        );
    }

    #[test]
    fn set_ops() {
        let bitboard = Bitboard::from_squares(&[
            Square::A1,
            Square::B1,
            Square::C1,
            Square::D1,
            Square::E1,
            Square::F1,
            Square::G1,
            Square::H1,
        ]);
        assert_eq!(bitboard.bits(), 0xFF);
        assert_eq!(bitboard.count(), 8);
        assert!(bitboard.contains(Square::E1));
        assert!(!bitboard.contains(Square::E2));
        assert_eq!(
            bitboard - Bitboard::from(Square::A1),
            Bitboard::from_bits(0xFE)
        );
        assert_eq!(
            bitboard ^ Bitboard::from_bits(0x1FF),
            Bitboard::from(Square::A2)
        );
        assert_eq!(bitboard.rotate(), Bitboard::from_bits(0xFF00_0000_0000_0000));
        assert_eq!(Bitboard::from(Square::E4).as_square(), Square::E4);
    }

    #[test]
    fn iterator() {
        let bitboard = Bitboard::from_squares(&[Square::H8, Square::A1, Square::E4]);
        assert_eq!(
            bitboard.iter().collect::<Vec<_>>(),
            vec![Square::A1, Square::E4, Square::H8]
        );
        assert_eq!(bitboard.iter().collect::<Bitboard>(), bitboard);
        assert_eq!(Bitboard::empty().iter().next(), None);
    }

    #[test]
    fn bitboard_dump() {
        assert_eq!(
            format!(
                "{:?}",
                Bitboard::from_squares(&[Square::A1, Square::E4, Square::H8])
            ),
            ". . . . . . . 1\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             . . . . 1 . . .\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             1 . . . . . . ."
        );
    }

    #[test]
    fn starting_board() {
        let board = Board::starting();
        assert_eq!(board.to_string(), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR");
        assert_eq!(board.occupancy(), Bitboard::from_bits(0xFFFF_0000_0000_FFFF));
        assert_eq!(
            board.at(Square::E1),
            Some(Piece::new(Player::White, PieceKind::King))
        );
        assert_eq!(
            board.at(Square::D8),
            Some(Piece::new(Player::Black, PieceKind::Queen))
        );
        assert_eq!(board.at(Square::E4), None);
    }

    #[test]
    fn put_and_remove() {
        let mut board = Board::empty();
        assert_eq!(board.to_string(), "8/8/8/8/8/8/8/8");
        board.put(Square::E4, Piece::new(Player::White, PieceKind::Knight));
        board.put(Square::A8, Piece::new(Player::Black, PieceKind::Rook));
        assert_eq!(board.to_string(), "r7/8/8/8/4N3/8/8/8");
        assert_eq!(
            board.remove(Square::E4),
            Some(Piece::new(Player::White, PieceKind::Knight))
        );
        assert_eq!(board.remove(Square::E4), None);
        assert_eq!(board.occupancy(), Bitboard::from(Square::A8));
    }
}
