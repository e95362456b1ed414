//! The authoritative game record: validates candidate moves, detects the end
//! of the game and keeps previous states around for take-backs.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::chess::core::{Move, MoveList, Player};
use crate::chess::position::Position;
use crate::chess::zobrist::RepetitionTable;

/// Halfmoves without captures and pawn moves after which a draw may be
/// claimed.
const FIFTY_MOVES: u16 = 100;
/// Halfmoves without captures and pawn moves that end the game.
const SEVENTY_FIVE_MOVES: u16 = 150;
/// Occurrences of a position that end the game.
const FIVEFOLD: u8 = 5;
const THREEFOLD: u8 = 3;

/// Why the game was drawn. Threefold repetition and the fifty-move rule are
/// only draws when claimed, see [`GameState::claimable_draw`].
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawReason {
    FiftyMoves,
    SeventyFiveMoves,
    ThreefoldRepetition,
    FivefoldRepetition,
    InsufficientMaterial,
}

impl fmt::Display for DrawReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FiftyMoves => "fifty-move rule",
            Self::SeventyFiveMoves => "seventy-five-move rule",
            Self::ThreefoldRepetition => "threefold repetition",
            Self::FivefoldRepetition => "fivefold repetition",
            Self::InsufficientMaterial => "insufficient material",
        })
    }
}

/// How the game ended.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Checkmate { winner: Player },
    Stalemate,
    Draw(DrawReason),
    Resigned { winner: Player },
    /// The loser ran out of time.
    TimeForfeit { winner: Player },
    Abandoned,
}

impl Outcome {
    /// Game termination marker used in PGN.
    #[must_use]
    pub const fn result(&self) -> &'static str {
        match self {
            Self::Checkmate { winner }
            | Self::Resigned { winner }
            | Self::TimeForfeit { winner } => match winner {
                Player::White => "1-0",
                Player::Black => "0-1",
            },
            Self::Stalemate | Self::Draw(_) => "1/2-1/2",
            Self::Abandoned => "*",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkmate { winner } => write!(f, "{} wins by checkmate", winner.name()),
            Self::Stalemate => write!(f, "draw by stalemate"),
            Self::Draw(reason) => write!(f, "draw by {reason}"),
            Self::Resigned { winner } => write!(f, "{} wins by resignation", winner.name()),
            Self::TimeForfeit { winner } => write!(f, "{} wins on time", winner.name()),
            Self::Abandoned => write!(f, "game abandoned"),
        }
    }
}

/// Why a candidate move was not accepted.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[allow(missing_docs)]
    #[error("the game is over: {0}")]
    GameOver(Outcome),
    /// The moved piece belongs to the player waiting for their turn.
    #[error("not your turn: {} to move", expected.name())]
    NotYourTurn {
        #[allow(missing_docs)]
        expected: Player,
    },
    /// The move follows the movement rules but exposes the king.
    #[error("{0} leaves the king in check")]
    LeavesKingInCheck(Move),
    /// Not in the set of legal moves.
    #[error("{0} is not a legal move")]
    IllegalMove(Move),
}

/// Result of [`GameState::validate`].
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Validation {
    Accepted(GameState),
    Rejected(Rejection),
}

/// Position together with everything needed to judge the game: the starting
/// position, moves made so far, repetition counts and the outcome once the
/// game is over.
///
/// States are values: validation produces a new state and never touches the
/// old one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    initial: Position,
    position: Position,
    history: Vec<Move>,
    repetitions: RepetitionTable,
    outcome: Option<Outcome>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Standard game from the starting position.
    #[must_use]
    pub fn new() -> Self {
        Self::from_position(Position::starting())
    }

    /// Starts the game from an arbitrary (valid) position. The game might be
    /// over right away, e.g. if the position is a checkmate.
    #[must_use]
    pub fn from_position(position: Position) -> Self {
        let mut repetitions = RepetitionTable::new();
        let count = repetitions.record(position.hash());
        let mut result = Self {
            initial: position.clone(),
            position,
            history: Vec::new(),
            repetitions,
            outcome: None,
        };
        result.outcome = result.detect_outcome(count);
        result
    }

    /// Replays the moves from the initial position.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the moves is rejected.
    pub fn replay(initial: Position, moves: &[Move]) -> anyhow::Result<Self> {
        let mut state = Self::from_position(initial);
        for (ply, next_move) in moves.iter().enumerate() {
            state = match state.validate(next_move) {
                Validation::Accepted(next) => next,
                Validation::Rejected(reason) => {
                    bail!("move #{} ({next_move}) can not be replayed: {reason}", ply + 1)
                },
            };
        }
        Ok(state)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn position(&self) -> &Position {
        &self.position
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn initial(&self) -> &Position {
        &self.initial
    }

    /// Accepted moves, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn side_to_move(&self) -> Player {
        self.position.us()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn legal_moves(&self) -> MoveList {
        self.position.generate_moves()
    }

    /// Checks the candidate against the rules and returns the state after the
    /// move if it is accepted. Candidates only need the squares and the
    /// promotion to be set: the flags are taken from the move generator.
    #[must_use]
    pub fn validate(&self, candidate: &Move) -> Validation {
        if let Some(outcome) = self.outcome {
            return Validation::Rejected(Rejection::GameOver(outcome));
        }
        match self.position.at(candidate.from()) {
            None => return Validation::Rejected(Rejection::IllegalMove(*candidate)),
            Some(piece) if piece.owner != self.position.us() => {
                return Validation::Rejected(Rejection::NotYourTurn {
                    expected: self.position.us(),
                })
            },
            Some(_) => (),
        }
        if let Some(legal) = self.position.legal_move(candidate) {
            return Validation::Accepted(self.advance(legal));
        }
        if self.position.pseudo_legal_move(candidate).is_some() {
            Validation::Rejected(Rejection::LeavesKingInCheck(*candidate))
        } else {
            Validation::Rejected(Rejection::IllegalMove(*candidate))
        }
    }

    fn advance(&self, legal: Move) -> Self {
        let mut next = self.clone();
        next.position.make_move(&legal);
        next.history.push(legal);
        let count = next.repetitions.record(next.position.hash());
        next.outcome = next.detect_outcome(count);
        next
    }

    fn detect_outcome(&self, repetitions: u8) -> Option<Outcome> {
        let position = &self.position;
        if position.generate_moves().is_empty() {
            return Some(if position.in_check() {
                Outcome::Checkmate {
                    winner: position.they(),
                }
            } else {
                Outcome::Stalemate
            });
        }
        if position.has_insufficient_material() {
            return Some(Outcome::Draw(DrawReason::InsufficientMaterial));
        }
        if position.halfmove_clock() >= SEVENTY_FIVE_MOVES {
            return Some(Outcome::Draw(DrawReason::SeventyFiveMoves));
        }
        if repetitions >= FIVEFOLD {
            return Some(Outcome::Draw(DrawReason::FivefoldRepetition));
        }
        None
    }

    /// The draw the players may claim in the current position, if any.
    #[must_use]
    pub fn claimable_draw(&self) -> Option<DrawReason> {
        if self.outcome.is_some() {
            return None;
        }
        if self.repetitions.count(self.position.hash()) >= THREEFOLD {
            return Some(DrawReason::ThreefoldRepetition);
        }
        if self.position.halfmove_clock() >= FIFTY_MOVES {
            return Some(DrawReason::FiftyMoves);
        }
        None
    }

    /// Ends the game with given outcome (resignation, abandonment).
    #[must_use]
    pub fn concluded(&self, outcome: Outcome) -> Self {
        Self {
            outcome: Some(outcome),
            ..self.clone()
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn to_saved(&self) -> SavedGame {
        SavedGame {
            starting_fen: self.initial.to_string(),
            moves: self.history.iter().map(Move::to_string).collect(),
        }
    }

    /// Movetext in Standard Algebraic Notation with the game termination
    /// marker, e.g. "1. f3 e5 2. g4 Qh4# 0-1".
    ///
    /// # Errors
    ///
    /// Fails only if the history contains a move that is illegal, which
    /// accepted states never do.
    pub fn to_pgn(&self) -> anyhow::Result<String> {
        let mut tokens = Vec::with_capacity(self.history.len() * 3 / 2 + 1);
        let mut position = self.initial.clone();
        for (ply, next_move) in self.history.iter().enumerate() {
            match position.us() {
                Player::White => tokens.push(format!("{}.", position.fullmove_counter())),
                Player::Black if ply == 0 => {
                    tokens.push(format!("{}...", position.fullmove_counter()));
                },
                Player::Black => (),
            }
            tokens.push(position.san(next_move)?);
            position.make_move(next_move);
        }
        tokens.push(
            self.outcome
                .map_or("*", |outcome| outcome.result())
                .to_string(),
        );
        Ok(tokens.join(" "))
    }
}

/// Owns the current [`GameState`] and the previous ones. This is the only
/// place where the game advances.
#[derive(Clone, Debug)]
pub struct RulesValidator {
    current: GameState,
    past: Vec<GameState>,
}

impl RulesValidator {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn new(state: GameState) -> Self {
        Self {
            current: state,
            past: Vec::new(),
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn current(&self) -> &GameState {
        &self.current
    }

    /// See [`GameState::validate`].
    #[must_use]
    pub fn validate(&self, candidate: &Move) -> Validation {
        self.current.validate(candidate)
    }

    /// Replaces the current state with an accepted one.
    pub fn commit(&mut self, next: GameState) {
        let previous = std::mem::replace(&mut self.current, next);
        self.past.push(previous);
    }

    /// Validates and commits the candidate in one step.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason, the state is left untouched.
    pub fn apply(&mut self, candidate: &Move) -> Result<&GameState, Rejection> {
        match self.validate(candidate) {
            Validation::Accepted(next) => {
                self.commit(next);
                Ok(&self.current)
            },
            Validation::Rejected(reason) => Err(reason),
        }
    }

    /// Restores the previous state. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.past.pop() {
            Some(previous) => {
                self.current = previous;
                true
            },
            None => false,
        }
    }

    #[allow(missing_docs)]
    pub fn conclude(&mut self, outcome: Outcome) {
        let concluded = self.current.concluded(outcome);
        self.commit(concluded);
    }
}

/// Persisted form of the game: enough to reconstruct [`GameState`] by replay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGame {
    /// FEN of the initial position.
    pub starting_fen: String,
    /// Moves in UCI notation.
    pub moves: Vec<String>,
}

impl SavedGame {
    /// Reads the game from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can not be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading saved game {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing saved game {}", path.display()))
    }

    /// Writes the game as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can not be written.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents).with_context(|| format!("writing saved game {}", path.display()))
    }

    /// Replays the saved moves.
    ///
    /// # Errors
    ///
    /// Returns an error if the starting position or any of the moves is
    /// invalid.
    pub fn restore(&self) -> anyhow::Result<GameState> {
        let initial = Position::try_from(self.starting_fen.as_str())?;
        let moves = self
            .moves
            .iter()
            .map(|uci| Move::from_uci(uci))
            .collect::<anyhow::Result<Vec<_>>>()?;
        GameState::replay(initial, &moves)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn uci(input: &str) -> Move {
        Move::from_uci(input).unwrap()
    }

    fn play(state: &GameState, moves: &[&str]) -> GameState {
        let mut state = state.clone();
        for input in moves {
            state = match state.validate(&uci(input)) {
                Validation::Accepted(next) => next,
                Validation::Rejected(reason) => panic!("{input}: {reason}"),
            };
        }
        state
    }

    fn history(state: &GameState) -> Vec<String> {
        state.history().iter().map(Move::to_string).collect()
    }

    fn from_fen(fen: &str) -> GameState {
        GameState::from_position(Position::try_from(fen).unwrap())
    }

    #[test]
    fn accepts_and_flips_side() {
        let start = GameState::new();
        let next = play(&start, &["e2e4"]);
        assert_eq!(next.side_to_move(), Player::Black);
        assert_eq!(history(&next), vec!["e2e4"]);
        // The original state is intact.
        assert_eq!(start.side_to_move(), Player::White);
        assert!(start.history().is_empty());
    }

    #[test]
    fn rejections() {
        let start = GameState::new();
        assert_eq!(
            start.validate(&uci("e7e5")),
            Validation::Rejected(Rejection::NotYourTurn {
                expected: Player::White
            })
        );
        assert_eq!(
            start.validate(&uci("e2e5")),
            Validation::Rejected(Rejection::IllegalMove(uci("e2e5")))
        );
        assert_eq!(
            start.validate(&uci("e3e4")),
            Validation::Rejected(Rejection::IllegalMove(uci("e3e4")))
        );
        let pinned = from_fen("4k3/4r3/8/8/8/8/4B3/4K3 w - - 0 1");
        assert_eq!(
            pinned.validate(&uci("e2d3")),
            Validation::Rejected(Rejection::LeavesKingInCheck(uci("e2d3")))
        );
        assert_eq!(
            Rejection::NotYourTurn {
                expected: Player::Black
            }
            .to_string(),
            "not your turn: Black to move"
        );
    }

    #[test]
    fn checkmate() {
        let state = play(&GameState::new(), &["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert_eq!(
            state.outcome(),
            Some(Outcome::Checkmate {
                winner: Player::Black
            })
        );
        assert_eq!(
            state.validate(&uci("a2a3")),
            Validation::Rejected(Rejection::GameOver(Outcome::Checkmate {
                winner: Player::Black
            }))
        );
        assert_eq!(state.to_pgn().unwrap(), "1. f3 e5 2. g4 Qh4# 0-1");
    }

    #[test]
    fn draws() {
        let stalemate = play(&from_fen("7k/8/6K1/8/8/8/5Q2/8 w - - 0 1"), &["f2f7"]);
        assert_eq!(stalemate.outcome(), Some(Outcome::Stalemate));

        let fifty = play(&from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 99 60"), &["a1a2"]);
        assert_eq!(fifty.outcome(), None);
        assert_eq!(fifty.claimable_draw(), Some(DrawReason::FiftyMoves));
        let seventy_five = play(&from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 149 90"), &["a1a2"]);
        assert_eq!(
            seventy_five.outcome(),
            Some(Outcome::Draw(DrawReason::SeventyFiveMoves))
        );
        assert_eq!(seventy_five.claimable_draw(), None);

        let bare_kings = play(&from_fen("4k3/8/8/8/8/8/3r4/4K3 w - - 0 1"), &["e1d2"]);
        assert_eq!(
            bare_kings.outcome(),
            Some(Outcome::Draw(DrawReason::InsufficientMaterial))
        );

        let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];
        let twice = play(&GameState::new(), &shuffle);
        assert_eq!(twice.outcome(), None);
        assert_eq!(twice.claimable_draw(), None);
        let thrice = play(&twice, &shuffle);
        assert_eq!(thrice.outcome(), None);
        assert_eq!(
            thrice.claimable_draw(),
            Some(DrawReason::ThreefoldRepetition)
        );
        let four_times = play(&thrice, &shuffle);
        assert_eq!(four_times.outcome(), None);
        let five_times = play(&four_times, &shuffle);
        assert_eq!(
            five_times.outcome(),
            Some(Outcome::Draw(DrawReason::FivefoldRepetition))
        );
    }

    #[test]
    fn outcome_messages() {
        let on_time = Outcome::TimeForfeit {
            winner: Player::White,
        };
        assert_eq!(on_time.to_string(), "White wins on time");
        assert_eq!(on_time.result(), "1-0");
        assert_eq!(
            Outcome::Draw(DrawReason::FivefoldRepetition).to_string(),
            "draw by fivefold repetition"
        );
        assert_eq!(Outcome::Draw(DrawReason::SeventyFiveMoves).result(), "1/2-1/2");
    }

    #[test]
    fn replay_is_deterministic() {
        let moves = ["e2e4", "d7d5", "e4d5", "g8f6", "f1b5", "c7c6", "d5c6", "d8d2"];
        let state = play(&GameState::new(), &moves);
        let replayed = GameState::replay(Position::starting(), state.history()).unwrap();
        assert_eq!(replayed, state);

        let restored = state.to_saved().restore().unwrap();
        assert_eq!(restored, state);
        assert!(GameState::replay(Position::starting(), &[uci("e2e4"), uci("e4e5")]).is_err());
    }

    #[test]
    fn pgn_from_black() {
        let state = play(
            &from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"),
            &["e7e5", "g1f3"],
        );
        assert_eq!(state.to_pgn().unwrap(), "1... e5 2. Nf3 *");
    }

    #[test]
    fn validator_history() {
        let mut validator = RulesValidator::new(GameState::new());
        assert!(!validator.undo());
        assert!(validator.apply(&uci("e2e4")).is_ok());
        assert!(validator.apply(&uci("e2e4")).is_err());
        assert!(validator.apply(&uci("e7e5")).is_ok());
        assert_eq!(validator.current().history().len(), 2);
        assert!(validator.undo());
        assert_eq!(history(validator.current()), vec!["e2e4"]);

        validator.conclude(Outcome::Resigned {
            winner: Player::White,
        });
        assert_eq!(
            validator.current().outcome().map(|outcome| outcome.to_string()),
            Some("White wins by resignation".to_string())
        );
        assert!(validator.undo());
        assert_eq!(validator.current().outcome(), None);
    }
}
