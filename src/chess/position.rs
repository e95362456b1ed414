//! Provides fully-specified [Chess Position] implementation: stores information
//! about the board and tracks the state of castling, 50-move rule draw, etc.
//!
//! The Move Generator and move making are also implemented here as the only
//! ways of mutating [`Position`].
//!
//! [Chess Position]: https://www.chessprogramming.org/Chess_Position

use std::fmt::{self, Write};
use std::num::NonZeroU16;

use anyhow::{bail, Context};

use crate::chess::attacks;
use crate::chess::bitboard::{self, Bitboard, Board, Pieces};
use crate::chess::core::{
    castling_rook_squares,
    CastleRights,
    File,
    Move,
    MoveFlags,
    MoveList,
    Piece,
    PieceKind,
    Player,
    Promotion,
    Rank,
    Square,
    BOARD_WIDTH,
};
use crate::chess::zobrist::{self, Key};

const BACKRANKS: Bitboard = Bitboard::from_bits(0xFF00_0000_0000_00FF);
const DARK_SQUARES: Bitboard = Bitboard::from_bits(0xAA55_AA55_AA55_AA55);

/// State of the chess game: board, half-move counters and castling rights,
/// etc. It has 1:1 relationship with [Forsyth-Edwards Notation] (FEN).
///
/// [`Position::try_from()`] provides a convenient interface for creating a
/// [`Position`]. It will clean up the input (trim newlines and whitespace) and
/// attempt to parse in either FEN or a version of [Extended Position
/// Description] (EPD) without operations. Positions that can not occur in a
/// game (e.g. missing kings, pawns on backranks) are rejected by the parser.
///
/// [Forsyth-Edwards Notation]: https://www.chessprogramming.org/Forsyth-Edwards_Notation
/// [Extended Position Description]: https://www.chessprogramming.org/Extended_Position_Description
#[derive(Clone, PartialEq, Eq)]
pub struct Position {
    board: Board,
    castling: CastleRights,
    side_to_move: Player,
    /// [Halfmove Clock][^ply] keeps track of the number of (half-)moves
    /// since the last capture or pawn move and is used to enforce
    /// fifty[^fifty]-move draw rule.
    ///
    /// [Halfmove Clock]: https://www.chessprogramming.org/Halfmove_Clock
    /// [^ply]: "Half-move" or ["ply"](https://www.chessprogramming.org/Ply) means a move of only
    ///     one side.
    /// [^fifty]: 50 __full__ moves
    halfmove_clock: u16,
    fullmove_counter: NonZeroU16,
    /// Only set when the side to move has a pawn that can (pseudo-legally)
    /// capture en passant. This keeps equal positions hashed equally.
    en_passant_square: Option<Square>,
}

impl Position {
    /// Creates the starting position of the standard chess variant.
    ///
    /// ```
    /// use sensorboard::chess::position::Position;
    ///
    /// let starting_position = Position::starting();
    /// assert_eq!(
    ///     &starting_position.to_string(),
    ///     "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    /// );
    /// ```
    #[must_use]
    pub const fn starting() -> Self {
        Self {
            board: Board::starting(),
            castling: CastleRights::all(),
            ..Self::empty()
        }
    }

    // Creates an empty board to be filled by parser.
    const fn empty() -> Self {
        Self {
            board: Board::empty(),
            castling: CastleRights::empty(),
            side_to_move: Player::White,
            halfmove_clock: 0,
            fullmove_counter: NonZeroU16::MIN,
            en_passant_square: None,
        }
    }

    /// The player to move.
    #[must_use]
    pub const fn us(&self) -> Player {
        self.side_to_move
    }

    /// The player waiting for their turn.
    #[must_use]
    pub const fn they(&self) -> Player {
        self.us().opponent()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn pieces(&self, player: Player) -> &Pieces {
        self.board.player_pieces(player)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn castling(&self) -> CastleRights {
        self.castling
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn en_passant_square(&self) -> Option<Square> {
        self.en_passant_square
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn fullmove_counter(&self) -> u16 {
        self.fullmove_counter.get()
    }

    /// Returns the piece standing on given square.
    #[must_use]
    pub fn at(&self, square: Square) -> Option<Piece> {
        self.board.at(square)
    }

    /// Squares occupied by any piece. The physical board is expected to report
    /// exactly this set once it is in sync with the position.
    #[must_use]
    pub fn occupancy(&self) -> Bitboard {
        self.board.occupancy()
    }

    fn king_square(&self, player: Player) -> Option<Square> {
        self.pieces(player).king.iter().next()
    }

    fn is_king_attacked(&self, player: Player) -> bool {
        self.king_square(player).is_some_and(|king| {
            attacks::is_attacked(&self.board, king, player.opponent())
        })
    }

    /// Whether the side to move is in check.
    #[must_use]
    pub fn in_check(&self) -> bool {
        self.is_king_attacked(self.us())
    }

    /// Calculates a list of legal moves (i.e. the moves that do not leave our
    /// king in check).
    ///
    /// The moves are produced by the pseudo-legal generator and each one is
    /// tried on a copy of the position: the ones exposing our king are
    /// discarded. This covers check evasions, pins and en passant discovered
    /// checks uniformly.
    #[must_use]
    pub fn generate_moves(&self) -> MoveList {
        self.pseudo_legal_moves()
            .into_iter()
            .filter(|candidate| !self.exposes_king(candidate))
            .collect()
    }

    /// Returns the legal move matching the candidate's squares and promotion,
    /// with all flags set.
    #[must_use]
    pub fn legal_move(&self, candidate: &Move) -> Option<Move> {
        self.generate_moves()
            .into_iter()
            .find(|legal| legal.same_squares(candidate))
    }

    /// Returns the move matching the candidate if it follows the movement rules
    /// of the pieces, regardless of whether it leaves the king in check.
    #[must_use]
    pub fn pseudo_legal_move(&self, candidate: &Move) -> Option<Move> {
        self.pseudo_legal_moves()
            .into_iter()
            .find(|pseudo_legal| pseudo_legal.same_squares(candidate))
    }

    fn exposes_king(&self, candidate: &Move) -> bool {
        let mut next = self.clone();
        next.make_move(candidate);
        next.is_king_attacked(self.us())
    }

    fn pseudo_legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(64);
        let us = self.us();
        let ours = self.pieces(us).all();
        let theirs = self.pieces(self.they()).all();
        let occupancy = ours | theirs;
        for (kind, bitboard) in self.pieces(us).iter() {
            for from in bitboard.iter() {
                let targets = match kind {
                    PieceKind::Pawn => {
                        self.add_pawn_moves(from, occupancy, theirs, &mut moves);
                        continue;
                    },
                    PieceKind::King => attacks::king_attacks(from),
                    PieceKind::Queen => attacks::queen_attacks(from, occupancy),
                    PieceKind::Rook => attacks::rook_attacks(from, occupancy),
                    PieceKind::Bishop => attacks::bishop_attacks(from, occupancy),
                    PieceKind::Knight => attacks::knight_attacks(from),
                } - ours;
                for to in targets.iter() {
                    let flags = if theirs.contains(to) {
                        MoveFlags::CAPTURE
                    } else {
                        MoveFlags::empty()
                    };
                    moves.push(Move::with_flags(from, to, None, flags));
                }
            }
        }
        self.add_castling_moves(&mut moves);
        moves
    }

    fn add_pawn_moves(
        &self,
        from: Square,
        occupancy: Bitboard,
        theirs: Bitboard,
        moves: &mut Vec<Move>,
    ) {
        let us = self.us();
        let push_direction = us.push_direction();
        if let Some(to) = from.shift(push_direction) {
            if !occupancy.contains(to) {
                add_pawn_move(moves, from, to, MoveFlags::empty(), us);
                if from.rank() == Rank::pawns_starting(us) {
                    if let Some(double_push) = to.shift(push_direction) {
                        if !occupancy.contains(double_push) {
                            moves.push(Move::with_flags(
                                from,
                                double_push,
                                None,
                                MoveFlags::DOUBLE_PUSH,
                            ));
                        }
                    }
                }
            }
        }
        for to in attacks::pawn_attacks(from, us).iter() {
            if theirs.contains(to) {
                add_pawn_move(moves, from, to, MoveFlags::CAPTURE, us);
            } else if self.en_passant_square == Some(to) {
                moves.push(Move::with_flags(
                    from,
                    to,
                    None,
                    MoveFlags::CAPTURE | MoveFlags::EN_PASSANT,
                ));
            }
        }
    }

    fn add_castling_moves(&self, moves: &mut Vec<Move>) {
        let us = self.us();
        let backrank = Rank::backrank(us);
        let king = Square::new(File::E, backrank);
        if !self.pieces(us).king.contains(king) || self.in_check() {
            return;
        }
        let (short, long) = match us {
            Player::White => (CastleRights::WHITE_SHORT, CastleRights::WHITE_LONG),
            Player::Black => (CastleRights::BLACK_SHORT, CastleRights::BLACK_LONG),
        };
        let occupancy = self.occupancy();
        for (right, rook_file, king_file, between, transit) in [
            (short, File::H, File::G, &[File::F, File::G][..], &[File::F, File::G][..]),
            (
                long,
                File::A,
                File::C,
                &[File::B, File::C, File::D][..],
                &[File::D, File::C][..],
            ),
        ] {
            if !self.castling.contains(right) {
                continue;
            }
            if !self
                .pieces(us)
                .rooks
                .contains(Square::new(rook_file, backrank))
            {
                continue;
            }
            if between
                .iter()
                .any(|file| occupancy.contains(Square::new(*file, backrank)))
            {
                continue;
            }
            if transit.iter().any(|file| {
                attacks::is_attacked(&self.board, Square::new(*file, backrank), self.they())
            }) {
                continue;
            }
            moves.push(Move::with_flags(
                king,
                Square::new(king_file, backrank),
                None,
                MoveFlags::CASTLE,
            ));
        }
    }

    /// Applies the move in a position. The move is expected to be produced by
    /// the move generator (see [`Position::legal_move`]) so that its flags are
    /// set.
    pub fn make_move(&mut self, next_move: &Move) {
        let (us, they) = (self.us(), self.they());
        let (from, to) = (next_move.from(), next_move.to());
        let Some(piece) = self.board.remove(from) else {
            debug_assert!(false, "no piece to move on {from} in {self}");
            return;
        };
        let captured = if next_move.is_en_passant() {
            self.board.remove(Square::new(to.file(), from.rank()))
        } else {
            self.board.remove(to)
        };
        let placed = match next_move.promotion() {
            Some(promotion) => Piece::new(us, promotion.into()),
            None => piece,
        };
        self.board.put(to, placed);
        if next_move.is_castle() {
            let (rook_from, rook_to) = castling_rook_squares(to);
            if let Some(rook) = self.board.remove(rook_from) {
                self.board.put(rook_to, rook);
            }
        }
        self.castling -= CastleRights::lost_on(from) | CastleRights::lost_on(to);

        self.en_passant_square = None;
        if piece.kind == PieceKind::Pawn && (from.rank() as u8).abs_diff(to.rank() as u8) == 2 {
            if let Some(target) = from.shift(us.push_direction()) {
                if (attacks::pawn_attacks(target, us) & self.pieces(they).pawns).has_any() {
                    self.en_passant_square = Some(target);
                }
            }
        }

        if piece.kind == PieceKind::Pawn || captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }
        if us == Player::Black {
            self.fullmove_counter = self.fullmove_counter.saturating_add(1);
        }
        self.side_to_move = they;
    }

    /// Computes the Zobrist key of the position.
    #[must_use]
    pub fn hash(&self) -> Key {
        let mut key = zobrist::side_key(self.us()) ^ zobrist::castling_key(self.castling);
        for square in self.occupancy().iter() {
            if let Some(piece) = self.at(square) {
                key ^= zobrist::piece_key(piece, square);
            }
        }
        if let Some(square) = self.en_passant_square {
            key ^= zobrist::en_passant_key(square.file());
        }
        key
    }

    /// Neither side can possibly checkmate: bare kings, a single minor piece or
    /// bishops all standing on squares of the same color.
    #[must_use]
    pub fn has_insufficient_material(&self) -> bool {
        let (white, black) = (self.pieces(Player::White), self.pieces(Player::Black));
        let heavy = white.pawns | white.rooks | white.queens | black.pawns | black.rooks | black.queens;
        if heavy.has_any() {
            return false;
        }
        let knights = white.knights | black.knights;
        let bishops = white.bishops | black.bishops;
        if (knights | bishops).count() <= 1 {
            return true;
        }
        knights.is_empty() && ((bishops & DARK_SQUARES).is_empty() || (bishops - DARK_SQUARES).is_empty())
    }

    /// Serializes a legal move in [Standard Algebraic Notation].
    ///
    /// # Errors
    ///
    /// Returns an error if the move is not legal in this position.
    ///
    /// [Standard Algebraic Notation]: https://www.chessprogramming.org/Algebraic_Chess_Notation#SAN
    pub fn san(&self, candidate: &Move) -> anyhow::Result<String> {
        let moves = self.generate_moves();
        let Some(legal) = moves.iter().find(|legal| legal.same_squares(candidate)) else {
            bail!("{candidate} is not a legal move in {self}");
        };
        let (from, to) = (legal.from(), legal.to());
        let mut result = String::new();
        if legal.is_castle() {
            result.push_str(if to.file() == File::G { "O-O" } else { "O-O-O" });
        } else {
            let kind = self
                .at(from)
                .map(|piece| piece.kind)
                .context("legal moves always start from an occupied square")?;
            match kind.san_symbol() {
                Some(symbol) => {
                    result.push(symbol);
                    let ambiguous: Vec<Square> = moves
                        .iter()
                        .filter(|other| {
                            other.to() == to
                                && other.from() != from
                                && self.at(other.from()).is_some_and(|piece| piece.kind == kind)
                        })
                        .map(|other| other.from())
                        .collect();
                    if !ambiguous.is_empty() {
                        if ambiguous.iter().all(|square| square.file() != from.file()) {
                            write!(result, "{}", from.file())?;
                        } else if ambiguous.iter().all(|square| square.rank() != from.rank()) {
                            write!(result, "{}", from.rank())?;
                        } else {
                            write!(result, "{from}")?;
                        }
                    }
                },
                None => {
                    if legal.is_capture() {
                        write!(result, "{}", from.file())?;
                    }
                },
            }
            if legal.is_capture() {
                result.push('x');
            }
            write!(result, "{to}")?;
            if let Some(promotion) = legal.promotion() {
                result.push('=');
                result.extend(PieceKind::from(promotion).san_symbol());
            }
        }
        let mut next = self.clone();
        next.make_move(legal);
        if next.in_check() {
            result.push(if next.generate_moves().is_empty() { '#' } else { '+' });
        }
        Ok(result)
    }

    /// Rejects positions that can not occur in a game of chess.
    fn validate(&self) -> anyhow::Result<()> {
        for player in [Player::White, Player::Black] {
            let pieces = self.pieces(player);
            let color = player.name().to_lowercase();
            if pieces.king.count() != 1 {
                bail!("expected 1 {color} king, got {}", pieces.king.count());
            }
            if pieces.pawns.count() > 8 {
                bail!("expected <= 8 {color} pawns, got {}", pieces.pawns.count());
            }
            let promoted = pieces.queens.count().saturating_sub(1)
                + pieces.rooks.count().saturating_sub(2)
                + pieces.bishops.count().saturating_sub(2)
                + pieces.knights.count().saturating_sub(2);
            if promoted + pieces.pawns.count() > 8 {
                bail!("{color} has more promoted pieces than missing pawns");
            }
        }
        if ((self.pieces(Player::White).pawns | self.pieces(Player::Black).pawns) & BACKRANKS)
            .has_any()
        {
            bail!("pawns can not be placed on backranks");
        }
        if let Some(en_passant_square) = self.en_passant_square {
            let expected_rank = match self.us() {
                Player::White => Rank::Six,
                Player::Black => Rank::Three,
            };
            if en_passant_square.rank() != expected_rank {
                bail!(
                    "expected en passant square to be on rank {expected_rank}, got {}",
                    en_passant_square.rank()
                );
            }
            let pushed_pawn = en_passant_square.shift(self.they().push_direction());
            if !pushed_pawn.is_some_and(|square| self.pieces(self.they()).pawns.contains(square)) {
                bail!("en passant square is not beyond pushed pawn");
            }
        }
        if self.is_king_attacked(self.they()) {
            bail!("the side not to move can not be in check");
        }
        Ok(())
    }

    /// Parses board from Forsyth-Edwards Notation. It will also accept trimmed
    /// FEN (EPD with 4 parts).
    ///
    /// FEN ::=
    ///       Piece Placement
    ///   ' ' Side to move
    ///   ' ' Castling ability
    ///   ' ' En passant target square
    ///   ' ' Halfmove clock
    ///   ' ' Fullmove counter
    ///
    /// The last two parts (together) are optional and will default to "0 1".
    ///
    /// NOTE: This expects properly-formatted inputs: no extra symbols or
    /// additional whitespace. Use [`Position::try_from`] for cleaning up the
    /// input if it is coming from untrusted source and is likely to contain
    /// extra symbols.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed input and for positions that can not
    /// occur in a game.
    pub fn from_fen(input: &str) -> anyhow::Result<Self> {
        let mut parts = input.split(' ');
        let mut result = Self::empty();
        let Some(pieces_placement) = parts.next() else {
            bail!("incorrect FEN: missing pieces placement");
        };
        let ranks = pieces_placement.split('/');
        let mut rank_id = 8;
        for rank_fen in ranks {
            if rank_id == 0 {
                bail!("incorrect FEN: expected 8 ranks, got {pieces_placement}");
            }
            rank_id -= 1;
            let rank = Rank::try_from(rank_id)?;
            let mut file: u8 = 0;
            for symbol in rank_fen.chars() {
                if file >= BOARD_WIDTH {
                    bail!("incorrect FEN: rank {rank_fen} exceeds {BOARD_WIDTH} files");
                }
                match symbol {
                    '0' => bail!("increment can not be 0"),
                    '1'..='8' => {
                        file += symbol as u8 - b'0';
                        continue;
                    },
                    _ => (),
                }
                let piece = Piece::try_from(symbol)?;
                result.board.put(Square::new(file.try_into()?, rank), piece);
                file += 1;
            }
            if file != BOARD_WIDTH {
                bail!(
                    "incorrect FEN: rank size should be exactly {BOARD_WIDTH}, got {rank_fen} of length {file}"
                );
            }
        }
        if rank_id != 0 {
            bail!("incorrect FEN: there should be 8 ranks, got {pieces_placement}");
        }
        result.side_to_move = match parts.next() {
            Some(value) => value.try_into()?,
            None => bail!("incorrect FEN: missing side to move"),
        };
        result.castling = match parts.next() {
            Some(value) => value.try_into()?,
            None => bail!("incorrect FEN: missing castling rights"),
        };
        result.en_passant_square = match parts.next() {
            Some("-") => None,
            Some(value) => Some(value.try_into()?),
            None => bail!("incorrect FEN: missing en passant square"),
        };
        match parts.next() {
            Some(value) => {
                if !value.bytes().all(|c| c.is_ascii_digit()) {
                    bail!("halfmove clock can not contain anything other than digits");
                }
                result.halfmove_clock = value.parse::<u16>().with_context(|| {
                    format!("incorrect FEN: halfmove clock can not be parsed {value}")
                })?;
                let Some(value) = parts.next() else {
                    bail!("incorrect FEN: missing fullmove counter");
                };
                if !value.bytes().all(|c| c.is_ascii_digit()) {
                    bail!("fullmove counter can not contain anything other than digits");
                }
                result.fullmove_counter = value.parse::<NonZeroU16>().with_context(|| {
                    format!("incorrect FEN: fullmove counter can not be parsed {value}")
                })?;
                if parts.next().is_some() {
                    bail!("trailing symbols are not allowed in FEN");
                }
            },
            // This is a correct EPD.
            None => (),
        }
        result.validate()?;
        Ok(result)
    }
}

fn add_pawn_move(moves: &mut Vec<Move>, from: Square, to: Square, flags: MoveFlags, us: Player) {
    if to.rank() == Rank::promotion(us) {
        for promotion in Promotion::ALL {
            moves.push(Move::with_flags(from, to, Some(promotion), flags));
        }
    } else {
        moves.push(Move::with_flags(from, to, None, flags));
    }
}

impl TryFrom<&str> for Position {
    type Error = anyhow::Error;

    /// Cleans up the input (surrounding whitespace, optional "fen"/"epd"
    /// prefix) and parses it with [`Position::from_fen`].
    fn try_from(input: &str) -> anyhow::Result<Self> {
        let input = input.trim();
        for prefix in ["fen ", "epd "] {
            if let Some(stripped) = input.strip_prefix(prefix) {
                return Self::from_fen(stripped);
            }
        }
        Self::from_fen(input)
    }
}

impl fmt::Display for Position {
    /// Prints board in Forsyth-Edwards Notation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", &self.board)?;
        write!(f, "{} ", &self.side_to_move)?;
        write!(f, "{} ", &self.castling)?;
        match self.en_passant_square {
            Some(square) => write!(f, "{square} "),
            None => write!(f, "- "),
        }?;
        write!(f, "{} ", &self.halfmove_clock)?;
        write!(f, "{}", &self.fullmove_counter)?;
        Ok(())
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        bitboard::dump(&self.board, f)?;
        writeln!(f)?;
        writeln!(f, "Player to move: {:?}", &self.side_to_move)?;
        writeln!(f, "Fullmove counter: {:?}", &self.fullmove_counter)?;
        writeln!(f, "En Passant: {:?}", &self.en_passant_square)?;
        // bitflags' default fmt::Debug implementation is not very convenient:
        // dump FEN instead.
        writeln!(f, "Castling rights: {}", &self.castling)?;
        writeln!(f, "FEN: {self}")?;
        Ok(())
    }
}

/// [Perft] (**per**formance **t**esting) is a technique for checking
/// correctness of move generation by traversing the tree of possible positions
/// (nodes) and calculating all the leaf nodes at certain depth.
///
/// [Perft]: https://www.chessprogramming.org/Perft
#[must_use]
pub fn perft(position: &Position, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = position.generate_moves();
    if depth == 1 {
        return moves.len() as u64;
    }
    moves
        .iter()
        .map(|next_move| {
            let mut next = position.clone();
            next.make_move(next_move);
            perft(&next, depth - 1)
        })
        .sum()
}

#[cfg(test)]
mod test {
    use itertools::Itertools;
    use pretty_assertions::assert_eq;

    use super::*;

    fn setup(fen: &str) -> Position {
        let position = Position::try_from(fen);
        assert!(position.is_ok(), "input: {fen}: {position:?}");
        let position = position.unwrap();
        assert_eq!(position.to_string(), fen);
        position
    }

    fn get_moves(position: &Position) -> Vec<String> {
        position
            .generate_moves()
            .iter()
            .map(Move::to_string)
            .sorted()
            .collect::<Vec<_>>()
    }

    fn sorted_moves(moves: &[&str]) -> Vec<String> {
        moves
            .iter()
            .map(|m| (*m).to_string())
            .sorted()
            .collect::<Vec<_>>()
    }

    fn play(position: &mut Position, uci: &str) {
        let next = position
            .legal_move(&Move::from_uci(uci).unwrap())
            .unwrap_or_else(|| panic!("{uci} should be legal in {position}"));
        position.make_move(&next);
    }

    #[test]
    #[allow(unused_results)]
    fn correct_fen() {
        setup("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        setup("2r3r1/p3k3/1p3pp1/1B5p/5P2/2P1p1P1/PP4KP/3R4 w - - 0 34");
        setup("rnbqk1nr/p3bppp/1p2p3/2ppP3/3P4/P7/1PP1NPPP/R1BQKBNR w KQkq c6 0 7");
        setup("r2qkb1r/1pp1pp1p/p1np1np1/1B6/3PP1b1/2N1BN2/PPP2PPP/R2QK2R w KQkq - 0 7");
        setup("r3k3/5p2/2p5/p7/P3r3/2N2n2/1PP2P2/2K2B2 w q - 0 24");
        setup("8/8/8/8/2P5/3k4/8/KB6 b - c3 0 1");
    }

    #[test]
    fn correct_epd() {
        let epd = "rnbqkb1r/pp2pppp/3p1n2/8/3NP3/2N5/PPP2PPP/R1BQKB1R b KQkq -";
        assert!(Position::try_from(epd).is_ok());
        assert!(Position::try_from(format!("fen {epd} 0 1").as_str()).is_ok());
    }

    #[test]
    fn no_crash() {
        assert!(Position::try_from("3k2p1N/82/8/8/7B/6K1/3R4/8 b - - 0 1").is_err());
        assert!(
            Position::try_from("3kn3/R2p1N2/8/8/70000000000000000B/6K1/3R4/8 b - - 0 1").is_err()
        );
        assert!(Position::try_from("3kn3/R4N2/8/8/7B/6K1/3R4/8 b - - 0 48 b - - 0 4/8 b").is_err());
        assert!(Position::try_from("\tfen3kn3/R2p1N2/8/8/7B/6K1/3R4/8 b - - 0 23").is_err());
        assert!(Position::try_from("3kn3/R4N2/8/8/7B/6K1/3r4/8 b - - +8 1").is_err());
        assert!(Position::try_from("8/8/8/8/8/8/8/8 b 88 🔠 🔠 ").is_err());
        assert!(Position::try_from("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0").is_err());
    }

    #[test]
    fn illegal_positions() {
        let error = |fen: &str| Position::try_from(fen).unwrap_err().to_string();
        assert_eq!(error("3k4/8/8/8/8/8/8/8 w - - 0 1"), "expected 1 white king, got 0");
        assert_eq!(error("8/8/8/8/8/8/8/3K4 w - - 0 1"), "expected 1 black king, got 0");
        assert_eq!(
            error("rnbqkbnr/pppppppp/8/8/8/P7/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            "expected <= 8 white pawns, got 9"
        );
        assert_eq!(
            error("3kr3/8/8/8/8/5Q2/8/1KP5 w - - 0 1"),
            "pawns can not be placed on backranks"
        );
        assert_eq!(
            error("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e3 0 1"),
            "expected en passant square to be on rank 6, got 3"
        );
        assert_eq!(
            error("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq d3 0 1"),
            "en passant square is not beyond pushed pawn"
        );
        assert_eq!(
            error("4k3/8/8/8/8/8/8/4K2r b - - 0 1"),
            "the side not to move can not be in check"
        );
    }

    #[test]
    fn starting_moves() {
        assert_eq!(
            get_moves(&Position::starting()),
            sorted_moves(&[
                "a2a3", "a2a4", "b1a3", "b1c3", "b2b3", "b2b4", "c2c3", "c2c4", "d2d3", "d2d4",
                "e2e3", "e2e4", "f2f3", "f2f4", "g1f3", "g1h3", "g2g3", "g2g4", "h2h3", "h2h4"
            ])
        );
    }

    #[test]
    fn basic_moves() {
        assert_eq!(
            get_moves(&setup("2n4k/1PP5/6K1/3Pp1Q1/3N4/3P4/P3R3/8 w - e6 0 1")),
            sorted_moves(&[
                "a2a3", "a2a4", "d5d6", "d5e6", "b7b8q", "b7b8r", "b7b8b", "b7b8n", "b7c8q",
                "b7c8r", "b7c8b", "b7c8n", "e2e1", "e2e3", "e2e4", "e2e5", "e2b2", "e2c2", "e2d2",
                "e2f2", "e2g2", "e2h2", "d4b3", "d4c2", "d4f3", "d4b5", "d4c6", "d4e6", "d4f5",
                "g5c1", "g5d2", "g5e3", "g5f4", "g5g4", "g5g3", "g5g2", "g5g1", "g5h4", "g5e5",
                "g5f5", "g5h5", "g5h6", "g5f6", "g5e7", "g5d8", "g6f5", "g6h5", "g6f6", "g6h6",
                "g6f7",
            ])
        );
    }

    #[test]
    fn double_check_evasions() {
        assert_eq!(
            get_moves(&setup("3kn3/R2p1N2/8/8/7B/6K1/3R4/8 b - - 0 1")),
            sorted_moves(&["d8c8"])
        );
        assert_eq!(
            get_moves(&setup("8/5Nk1/7p/4Bp2/3q4/8/8/5KR1 b - - 0 1")),
            sorted_moves(&["g7f8", "g7f7", "g7h7"])
        );
    }

    #[test]
    fn check_evasions() {
        assert_eq!(
            get_moves(&setup("3kn3/R2p4/8/6B1/8/6K1/3R4/8 b - - 0 1")),
            sorted_moves(&["e8f6", "d8c8"])
        );
        assert_eq!(
            get_moves(&setup("2R5/8/6k1/8/8/8/PPn5/KR6 w - - 0 1")),
            sorted_moves(&["c8c2"])
        );
    }

    #[test]
    fn pins() {
        // The pawn is pinned but can capture en passant.
        assert_eq!(
            get_moves(&setup("6qk/8/8/3Pp3/8/8/K7/8 w - e6 0 1")),
            sorted_moves(&["a2a1", "a2a3", "a2b1", "a2b2", "a2b3", "d5e6"])
        );
        // The pawn is pinned and can't move.
        assert_eq!(
            get_moves(&setup("k7/1p6/8/8/8/8/8/4K2B b - - 0 1")),
            sorted_moves(&["a8a7", "a8b8"])
        );
        // En passant would expose the king along the rank.
        assert_eq!(
            get_moves(&setup("8/8/8/K2Pp2r/8/8/8/7k w - e6 0 1")),
            sorted_moves(&["a5a4", "a5a6", "a5b4", "a5b5", "a5b6", "d5d6"])
        );
    }

    #[test]
    fn castle() {
        // Can castle both sides.
        assert_eq!(
            get_moves(&setup("r3k2r/8/8/8/8/8/6N1/4K3 b kq - 0 1")),
            sorted_moves(&[
                "a8a7", "a8a6", "a8a5", "a8a4", "a8a3", "a8a2", "a8a1", "a8b8", "a8c8", "a8d8",
                "h8f8", "h8g8", "h8h7", "h8h6", "h8h5", "h8h4", "h8h3", "h8h2", "h8h1", "e8e7",
                "e8d8", "e8d7", "e8f8", "e8f7", "e8c8", "e8g8"
            ])
        );
        // Castling short blocked by an attack on the transit square.
        assert_eq!(
            get_moves(&setup("r3k2r/8/8/8/8/8/6R1/4K3 b kq - 0 1")),
            sorted_moves(&[
                "a8a7", "a8a6", "a8a5", "a8a4", "a8a3", "a8a2", "a8a1", "a8b8", "a8c8", "a8d8",
                "h8f8", "h8g8", "h8h7", "h8h6", "h8h5", "h8h4", "h8h3", "h8h2", "h8h1", "e8e7",
                "e8d8", "e8d7", "e8f8", "e8f7", "e8c8"
            ])
        );
        // Castling long is not blocked: the attacked square is not the one king will
        // walk through.
        assert_eq!(
            get_moves(&setup("r3k2r/8/8/8/8/8/1R6/4K3 b q - 0 1")),
            sorted_moves(&[
                "a8a7", "a8a6", "a8a5", "a8a4", "a8a3", "a8a2", "a8a1", "a8b8", "a8c8", "a8d8",
                "h8f8", "h8g8", "h8h7", "h8h6", "h8h5", "h8h4", "h8h3", "h8h2", "h8h1", "e8e7",
                "e8d8", "e8d7", "e8f8", "e8f7", "e8c8"
            ])
        );
    }

    #[test]
    fn chess_programming_wiki_perft_positions() {
        // Positions from https://www.chessprogramming.org/Perft_Results with
        // depth=1.
        assert_eq!(
            get_moves(&setup(
                "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"
            ))
            .len(),
            48
        );
        assert_eq!(
            get_moves(&setup("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1")).len(),
            14,
        );
        assert_eq!(
            get_moves(&setup(
                "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1"
            ))
            .len(),
            6
        );
        assert_eq!(
            get_moves(&setup(
                "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8"
            ))
            .len(),
            44
        );
        assert_eq!(
            get_moves(&setup(
                "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10"
            ))
            .len(),
            46
        );
    }

    #[test]
    fn perft_starting_position() {
        let position = Position::starting();
        assert_eq!(perft(&position, 1), 20);
        assert_eq!(perft(&position, 2), 400);
        assert_eq!(perft(&position, 3), 8902);
    }

    #[test]
    fn make_moves() {
        let mut position = Position::starting();
        play(&mut position, "e2e4");
        // No black pawn can capture: en passant square is not recorded.
        assert_eq!(
            position.to_string(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
        for uci in ["d7d5", "e4e5", "f7f5"] {
            play(&mut position, uci);
        }
        assert_eq!(
            position.to_string(),
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3"
        );
        play(&mut position, "e5f6");
        assert_eq!(
            position.to_string(),
            "rnbqkbnr/ppp1p1pp/5P2/3p4/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 3"
        );
        for uci in ["g8h6", "g1f3", "e7e6", "f1e2", "f8e7", "e1g1"] {
            play(&mut position, uci);
        }
        assert_eq!(
            position.to_string(),
            "rnbqk2r/ppp1b1pp/4pP1n/3p4/8/5N2/PPPPBPPP/RNBQ1RK1 b kq - 3 6"
        );
    }

    #[test]
    fn promotion_and_rights() {
        let mut position = setup("r3k2r/1P6/8/8/8/8/8/R3K2R w KQkq - 0 1");
        play(&mut position, "b7a8n");
        assert_eq!(position.to_string(), "N3k2r/8/8/8/8/8/8/R3K2R b KQk - 0 1");
        play(&mut position, "h8h1");
        assert_eq!(position.to_string(), "N3k3/8/8/8/8/8/8/R3K2r w Q - 0 2");
    }

    #[test]
    fn insufficient_material() {
        let insufficient = |fen: &str| setup(fen).has_insufficient_material();
        assert!(insufficient("8/8/4k3/8/8/3K4/8/8 w - - 0 1"));
        assert!(insufficient("8/8/4k3/8/8/3K4/8/6N1 w - - 0 1"));
        assert!(insufficient("8/8/4k3/8/8/3K4/8/5B2 w - - 0 1"));
        // Both bishops on light squares.
        assert!(insufficient("8/8/4k1b1/8/8/3K4/8/5B2 w - - 0 1"));
        assert!(!insufficient("8/8/4kb2/8/8/3K4/8/5B2 w - - 0 1"));
        assert!(!insufficient("8/8/4k3/8/8/3K4/8/5NN1 w - - 0 1"));
        assert!(!insufficient("8/8/4k3/8/8/3K4/4P3/8 w - - 0 1"));
    }

    #[test]
    fn san() {
        let position = Position::starting();
        let san = |position: &Position, uci: &str| {
            position.san(&Move::from_uci(uci).unwrap()).unwrap()
        };
        assert_eq!(san(&position, "e2e4"), "e4");
        assert_eq!(san(&position, "g1f3"), "Nf3");
        assert!(position.san(&Move::from_uci("e2e5").unwrap()).is_err());

        let position = setup("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert_eq!(san(&position, "e1g1"), "O-O");
        assert_eq!(san(&position, "e1c1"), "O-O-O");
        assert_eq!(san(&position, "a1a8"), "Rxa8+");

        // Knights on b1 and f1 can both reach d2.
        let position = setup("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1");
        assert_eq!(san(&position, "b1d2"), "Nbd2");

        let position = setup("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1");
        assert_eq!(san(&position, "b7b8q"), "b8=Q+");

        let position = setup("7k/8/6K1/8/8/8/8/R7 w - - 0 1");
        assert_eq!(san(&position, "a1a8"), "Ra8#");

        let position = setup("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3");
        assert_eq!(san(&position, "e5f6"), "exf6");
    }
}
