//! The text protocol spoken with the engine: [`Command`]s are written to its
//! input and [`Response`]s are parsed from its output.
//!
//! Only the subset needed to run timed searches is supported. Unknown output is
//! kept as [`Response::Unknown`] and ignored by the session.

use std::fmt;

use itertools::Itertools;

use crate::chess::core::Move;
use crate::chess::game::GameState;
use crate::chess::position::Position;

/// Messages sent to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    #[allow(missing_docs)]
    Uci,
    #[allow(missing_docs)]
    IsReady,
    #[allow(missing_docs)]
    NewGame,
    /// `fen` is [`None`] for the starting position.
    SetPosition {
        #[allow(missing_docs)]
        fen: Option<String>,
        #[allow(missing_docs)]
        moves: Vec<String>,
    },
    #[allow(missing_docs)]
    Go {
        movetime: Option<u64>,
        depth: Option<u8>,
    },
    #[allow(missing_docs)]
    Stop,
    #[allow(missing_docs)]
    Quit,
}

impl Command {
    /// The initial position of the game followed by all the moves played, so
    /// that the engine can detect repetitions.
    #[must_use]
    pub fn position(game: &GameState) -> Self {
        let fen = (*game.initial() != Position::starting()).then(|| game.initial().to_string());
        Self::SetPosition {
            fen,
            moves: game.history().iter().map(ToString::to_string).collect(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uci => f.write_str("uci"),
            Self::IsReady => f.write_str("isready"),
            Self::NewGame => f.write_str("ucinewgame"),
            Self::SetPosition { fen, moves } => {
                match fen {
                    Some(fen) => write!(f, "position fen {fen}")?,
                    None => f.write_str("position startpos")?,
                }
                if !moves.is_empty() {
                    write!(f, " moves {}", moves.iter().join(" "))?;
                }
                Ok(())
            },
            Self::Go { movetime, depth } => {
                f.write_str("go")?;
                if let Some(movetime) = movetime {
                    write!(f, " movetime {movetime}")?;
                }
                if let Some(depth) = depth {
                    write!(f, " depth {depth}")?;
                }
                Ok(())
            },
            Self::Stop => f.write_str("stop"),
            Self::Quit => f.write_str("quit"),
        }
    }
}

/// Evaluation reported during the search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Score {
    /// In hundredths of a pawn, from the point of view of the side to move.
    Centipawns(i32),
    /// Mate in given number of moves (negative if the side to move is mated).
    Mate(i32),
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Centipawns(cp) => write!(f, "cp {cp}"),
            Self::Mate(moves) => write!(f, "mate {moves}"),
        }
    }
}

/// Messages received from the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// `id name ...` or `id author ...`.
    Id(String),
    #[allow(missing_docs)]
    UciOk,
    #[allow(missing_docs)]
    ReadyOk,
    /// `best` is [`None`] if there are no legal moves.
    BestMove {
        #[allow(missing_docs)]
        best: Option<Move>,
        #[allow(missing_docs)]
        ponder: Option<Move>,
    },
    /// Search progress.
    Info {
        #[allow(missing_docs)]
        depth: Option<u32>,
        #[allow(missing_docs)]
        score: Option<Score>,
        #[allow(missing_docs)]
        nodes: Option<u64>,
        #[allow(missing_docs)]
        pv: Vec<Move>,
    },
    #[allow(missing_docs)]
    Unknown(String),
}

fn parse_move(token: &str) -> Option<Move> {
    match token {
        "(none)" | "0000" => None,
        _ => Move::from_uci(token).ok(),
    }
}

fn parse_bestmove(parts: &[&str]) -> Response {
    let best = parts.get(1).and_then(|token| parse_move(token));
    let ponder = match parts.get(2) {
        Some(&"ponder") => parts.get(3).and_then(|token| parse_move(token)),
        _ => None,
    };
    Response::BestMove { best, ponder }
}

fn parse_info(parts: &[&str]) -> Response {
    let mut depth = None;
    let mut score = None;
    let mut nodes = None;
    let mut pv = Vec::new();

    let mut i = 1;

    while i < parts.len() {
        match parts[i] {
            "depth" if i + 1 < parts.len() => depth = parts[i + 1].parse().ok(),
            "nodes" if i + 1 < parts.len() => nodes = parts[i + 1].parse().ok(),
            "score" if i + 2 < parts.len() => {
                score = match parts[i + 1] {
                    "cp" => parts[i + 2].parse().ok().map(Score::Centipawns),
                    "mate" => parts[i + 2].parse().ok().map(Score::Mate),
                    _ => None,
                };
                i += 1;
            },
            // The principal variation is always the last field.
            "pv" => {
                pv = parts[i + 1..].iter().filter_map(|token| parse_move(token)).collect();
                break;
            },
            // Free-form text until the end of the line.
            "string" => break,
            _ => {},
        }
        i += 2;
    }

    Response::Info {
        depth,
        score,
        nodes,
        pv,
    }
}

impl Response {
    /// Parses a line of engine output.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let parts: Vec<&str> = input.split_whitespace().collect();

        if parts.is_empty() {
            return Self::Unknown(input.to_string());
        }

        match parts[0] {
            "id" => Self::Id(parts[1..].join(" ")),
            "uciok" => Self::UciOk,
            "readyok" => Self::ReadyOk,
            "bestmove" => parse_bestmove(&parts),
            "info" => parse_info(&parts),
            _ => Self::Unknown(input.trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn uci(input: &str) -> Move {
        Move::from_uci(input).unwrap()
    }

    #[test]
    fn commands() {
        assert_eq!(Command::Uci.to_string(), "uci");
        assert_eq!(Command::NewGame.to_string(), "ucinewgame");
        assert_eq!(
            Command::Go {
                movetime: Some(1500),
                depth: None
            }
            .to_string(),
            "go movetime 1500"
        );
        assert_eq!(
            Command::Go {
                movetime: Some(100),
                depth: Some(8)
            }
            .to_string(),
            "go movetime 100 depth 8"
        );
    }

    #[test]
    fn set_position() {
        let mut game = GameState::new();
        assert_eq!(
            Command::position(&game).to_string(),
            "position startpos"
        );
        for next in ["e2e4", "e7e5"] {
            game = match game.validate(&uci(next)) {
                crate::chess::game::Validation::Accepted(next) => next,
                rejected => panic!("{rejected:?}"),
            };
        }
        assert_eq!(
            Command::position(&game).to_string(),
            "position startpos moves e2e4 e7e5"
        );

        let game = GameState::from_position(
            Position::from_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap(),
        );
        assert_eq!(
            Command::position(&game).to_string(),
            "position fen 4k3/8/8/8/8/8/8/4K2R w K - 0 1"
        );
    }

    #[test]
    fn parse_handshake() {
        assert_eq!(Response::parse("uciok\n"), Response::UciOk);
        assert_eq!(Response::parse("readyok"), Response::ReadyOk);
        assert_eq!(
            Response::parse("id name Stockfish 16"),
            Response::Id("name Stockfish 16".to_string())
        );
    }

    #[test]
    fn parse_bestmove() {
        assert_eq!(
            Response::parse("bestmove e2e4 ponder e7e5"),
            Response::BestMove {
                best: Some(uci("e2e4")),
                ponder: Some(uci("e7e5"))
            }
        );
        assert_eq!(
            Response::parse("bestmove a7a8q"),
            Response::BestMove {
                best: Some(uci("a7a8q")),
                ponder: None
            }
        );
        assert_eq!(
            Response::parse("bestmove (none)"),
            Response::BestMove {
                best: None,
                ponder: None
            }
        );
        assert_eq!(
            Response::parse("bestmove 0000"),
            Response::BestMove {
                best: None,
                ponder: None
            }
        );
    }

    #[test]
    fn parse_info() {
        assert_eq!(
            Response::parse("info depth 12 seldepth 16 score cp 35 nodes 120345 nps 1000 pv e2e4 e7e5 g1f3"),
            Response::Info {
                depth: Some(12),
                score: Some(Score::Centipawns(35)),
                nodes: Some(120_345),
                pv: vec![uci("e2e4"), uci("e7e5"), uci("g1f3")],
            }
        );
        assert_eq!(
            Response::parse("info depth 3 score mate -2"),
            Response::Info {
                depth: Some(3),
                score: Some(Score::Mate(-2)),
                nodes: None,
                pv: vec![],
            }
        );
        assert_eq!(
            Response::parse("info string NNUE evaluation enabled"),
            Response::Info {
                depth: None,
                score: None,
                nodes: None,
                pv: vec![],
            }
        );
    }

    #[test]
    fn unknown() {
        assert_eq!(
            Response::parse("option name Hash type spin default 16"),
            Response::Unknown("option name Hash type spin default 16".to_string())
        );
        assert_eq!(Response::parse(""), Response::Unknown(String::new()));
    }
}
