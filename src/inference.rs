//! Turns settled occupancy changes into candidate moves.
//!
//! The sensors only tell whether a square is occupied, so the inference works
//! with the shape of the change relative to the last synchronized occupancy
//! (the "baseline"):
//!
//! | vacated | occupied | interpretation                                   |
//! | ------- | -------- | ------------------------------------------------ |
//! | 0       | 0        | nothing happened                                 |
//! | 1       | 1        | quiet move (or the first half of castling)        |
//! | 1       | 0        | capture, if exactly one enemy piece was lifted    |
//! | 2       | 2        | castling: king and rook                          |
//! | 2       | 1        | en passant                                       |
//!
//! The piece a pawn promotes to can not be sensed at all: such moves are
//! reported as [`Inference::PromotionAmbiguous`] and the choice has to come
//! from the operator.
//!
//! Inference never decides whether the move is legal, that is
//! [`crate::chess::game`]'s job.

use log::{debug, info};

use crate::board::debounce::Delta;
use crate::chess::bitboard::Bitboard;
use crate::chess::core::{castling_rook_squares, File, Move, PieceKind, Rank, Square};
use crate::chess::position::Position;

/// Interpretation of the physical board relative to the baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inference {
    /// The board matches the baseline.
    NoChange,
    /// Pieces were lifted but the move is not finished yet.
    Incomplete,
    /// A complete move (not necessarily a legal one).
    Candidate(Move),
    /// A pawn reached the last rank: the promotion has to be chosen.
    PromotionAmbiguous {
        #[allow(missing_docs)]
        from: Square,
        #[allow(missing_docs)]
        to: Square,
    },
    /// The change does not look like any move.
    Uninterpretable(Delta),
}

/// Tracks the physical board between two synchronization points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveInference {
    baseline: Bitboard,
    lifted: Bitboard,
}

impl MoveInference {
    /// Starts tracking from the occupancy that matches the position.
    #[must_use]
    pub const fn new(baseline: Bitboard) -> Self {
        Self {
            baseline,
            lifted: Bitboard::empty(),
        }
    }

    /// Called after a move is accepted and the board is in sync again.
    pub fn rebase(&mut self, occupancy: Bitboard) {
        self.baseline = occupancy;
        self.lifted = Bitboard::empty();
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn baseline(&self) -> Bitboard {
        self.baseline
    }

    /// Interprets the next settled occupancy. Squares that were emptied at
    /// some point are remembered: this is how captures are recognized once the
    /// capturing piece takes the place of the captured one.
    pub fn observe(&mut self, occupancy: Bitboard, position: &Position) -> Inference {
        let delta = Delta::between(self.baseline, occupancy);
        if delta.is_empty() {
            self.lifted = Bitboard::empty();
            return Inference::NoChange;
        }
        self.lifted |= delta.vacated;
        let inference = infer(&delta, self.lifted, position);
        match inference {
            Inference::Candidate(candidate) => info!("inferred {candidate} from {delta}"),
            Inference::Uninterpretable(_) => info!("can not interpret {delta}"),
            _ => debug!("{delta}: {inference:?}"),
        }
        inference
    }
}

/// Interprets the change given the squares emptied since the baseline.
#[must_use]
pub fn infer(delta: &Delta, lifted: Bitboard, position: &Position) -> Inference {
    let (vacated, occupied) = (delta.vacated, delta.occupied);
    let inference = match (vacated.count(), occupied.count()) {
        (0, 0) => Some(Inference::NoChange),
        (1, 1) => quiet_move(vacated.as_square(), occupied.as_square(), position),
        (1, 0) => capture(vacated.as_square(), lifted, position),
        (2, 2) => castle(delta, position),
        (2, 1) => en_passant(delta, position),
        _ => None,
    };
    inference.unwrap_or_else(|| in_progress(delta, position))
}

/// Squares are only vacated: the hand is still busy.
fn in_progress(delta: &Delta, position: &Position) -> Inference {
    let occupancy = position.occupancy();
    if delta.occupied.count() < delta.vacated.count()
        && delta.vacated.count() <= 3
        && (delta.vacated - occupancy).is_empty()
    {
        Inference::Incomplete
    } else {
        Inference::Uninterpretable(*delta)
    }
}

fn quiet_move(from: Square, to: Square, position: &Position) -> Option<Inference> {
    let piece = position.at(from)?;
    if piece.kind == PieceKind::King
        && position
            .legal_move(&Move::new(from, to, None))
            .is_some_and(|legal| legal.is_castle())
    {
        // The rook is yet to move.
        return Some(Inference::Incomplete);
    }
    if piece.kind == PieceKind::Pawn {
        if position.en_passant_square() == Some(to) && from.file() != to.file() {
            // The captured pawn is still on the board.
            return Some(Inference::Incomplete);
        }
        if to.rank() == Rank::promotion(piece.owner) {
            return Some(Inference::PromotionAmbiguous { from, to });
        }
    }
    Some(Inference::Candidate(Move::new(from, to, None)))
}

fn capture(from: Square, lifted: Bitboard, position: &Position) -> Option<Inference> {
    let piece = position.at(from)?;
    let victims = (lifted - Bitboard::from(from)) & position.pieces(piece.owner.opponent()).all();
    match victims.count() {
        0 => Some(Inference::Incomplete),
        1 => {
            let to = victims.as_square();
            if piece.kind == PieceKind::Pawn && to.rank() == Rank::promotion(piece.owner) {
                Some(Inference::PromotionAmbiguous { from, to })
            } else {
                Some(Inference::Candidate(Move::new(from, to, None)))
            }
        },
        _ => None,
    }
}

fn castle(delta: &Delta, position: &Position) -> Option<Inference> {
    let backrank = Rank::backrank(position.us());
    let king_from = Square::new(File::E, backrank);
    [File::G, File::C].into_iter().find_map(|king_file| {
        let king_to = Square::new(king_file, backrank);
        let (rook_from, rook_to) = castling_rook_squares(king_to);
        (delta.vacated == Bitboard::from_squares(&[king_from, rook_from])
            && delta.occupied == Bitboard::from_squares(&[king_to, rook_to]))
        .then_some(Inference::Candidate(Move::new(king_from, king_to, None)))
    })
}

fn en_passant(delta: &Delta, position: &Position) -> Option<Inference> {
    let us = position.us();
    let to = delta.occupied.as_square();
    let victim = to.shift(us.push_direction().opposite())?;
    if !delta.vacated.contains(victim) {
        return None;
    }
    let from = (delta.vacated - Bitboard::from(victim)).as_square();
    let is_our_pawn = |square| {
        position
            .at(square)
            .is_some_and(|piece| piece.kind == PieceKind::Pawn && piece.owner == us)
    };
    let is_their_pawn = position
        .at(victim)
        .is_some_and(|piece| piece.kind == PieceKind::Pawn && piece.owner != us);
    let diagonal = from.rank() == victim.rank()
        && (from.file() as u8).abs_diff(victim.file() as u8) == 1;
    // Whether en passant is still allowed is decided by the rules: the same
    // shape one ply too late produces an illegal candidate.
    (is_our_pawn(from) && is_their_pawn && diagonal)
        .then_some(Inference::Candidate(Move::new(from, to, None)))
}
