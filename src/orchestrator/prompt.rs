//! Messages for the person at the board and the commands they can type.

use std::fmt;
use std::io::{BufRead, Write};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use itertools::Itertools;
use log::{debug, warn};

use crate::board::debounce::Delta;
use crate::chess::bitboard::Bitboard;
use crate::chess::core::{Player, Promotion, Square};
use crate::chess::game::{Outcome, Rejection};
use crate::orchestrator::Event;

/// Everything the orchestrator tells the operator.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prompt {
    /// The physical board does not match the position.
    SetupMismatch {
        missing: Bitboard,
        extra: Bitboard,
    },
    Ready,
    YourMove {
        side: Player,
    },
    ChoosePromotion {
        from: Square,
        to: Square,
    },
    Uninterpretable {
        delta: Delta,
    },
    Rejected {
        reason: Rejection,
    },
    MoveAccepted {
        san: String,
    },
    EngineThinking,
    /// The engine move has to be made on the board.
    ExecuteMove {
        san: String,
        from: Square,
        to: Square,
    },
    /// The board stayed different from the expected result for too long.
    PossibleMisplacement {
        san: String,
        missing: Bitboard,
        extra: Bitboard,
    },
    MoveExecuted {
        san: String,
    },
    LinkLost,
    LinkRestored,
    Reconnecting,
    ReconnectFailed {
        reason: String,
    },
    EngineRestarted,
    /// Both sides are played by hand from now on.
    EngineUnavailable,
    TookBack {
        plies: usize,
    },
    NothingToTakeBack,
    FindingHint,
    /// The engine suggests a move, its squares are lit.
    Hint {
        san: String,
    },
    HintUnavailable,
    NoDrawToClaim,
    /// The time of the side to move is running out.
    LowTime {
        side: Player,
        left: Duration,
    },
    GameOver {
        outcome: Outcome,
        pgn: String,
    },
}

fn squares(squares: Bitboard) -> String {
    squares.iter().join(" ")
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetupMismatch { missing, extra } => {
                f.write_str("Set up the position.")?;
                if missing.has_any() {
                    write!(f, " Missing pieces: {}.", squares(*missing))?;
                }
                if extra.has_any() {
                    write!(f, " Remove pieces from: {}.", squares(*extra))?;
                }
                Ok(())
            },
            Self::Ready => f.write_str("Board is set up."),
            Self::YourMove { side } => write!(f, "{} to move.", side.name()),
            Self::ChoosePromotion { from, to } => write!(
                f,
                "Promotion {from}{to}: type q, r, b or n and press Enter."
            ),
            Self::Uninterpretable { delta } => write!(
                f,
                "Can not recognize the move ({delta}), restore the squares."
            ),
            Self::Rejected { reason } => write!(f, "Illegal: {reason}. Take the move back."),
            Self::MoveAccepted { san } => write!(f, "Played {san}."),
            Self::EngineThinking => f.write_str("Engine is thinking..."),
            Self::ExecuteMove { san, from, to } => {
                write!(f, "Engine plays {san}: move the piece from {from} to {to}.")
            },
            Self::PossibleMisplacement { san, missing, extra } => {
                write!(f, "The board does not show {san}.")?;
                if missing.has_any() {
                    write!(f, " Expected pieces on: {}.", squares(*missing))?;
                }
                if extra.has_any() {
                    write!(f, " Unexpected pieces on: {}.", squares(*extra))?;
                }
                Ok(())
            },
            Self::MoveExecuted { san } => write!(f, "{san} is on the board."),
            Self::LinkLost => f.write_str(
                "Board connection lost, the game is paused. Type \"reconnect\" to retry.",
            ),
            Self::LinkRestored => f.write_str("Board connection restored."),
            Self::Reconnecting => f.write_str("Reconnecting to the board..."),
            Self::ReconnectFailed { reason } => write!(f, "Reconnection failed: {reason}."),
            Self::EngineRestarted => f.write_str("Engine crashed and was restarted."),
            Self::EngineUnavailable => {
                f.write_str("Engine is unavailable, make the moves of both sides by hand.")
            },
            Self::TookBack { plies } => write!(
                f,
                "Took back {plies} {}, restore the position.",
                if *plies == 1 { "move" } else { "moves" }
            ),
            Self::NothingToTakeBack => f.write_str("Nothing to take back."),
            Self::FindingHint => f.write_str("Looking for a hint..."),
            Self::Hint { san } => write!(f, "Hint: {san}."),
            Self::HintUnavailable => f.write_str("No hint available."),
            Self::NoDrawToClaim => f.write_str(
                "No draw to claim: the position did not repeat three times and captures or \
                 pawn moves were made in the last 50 moves.",
            ),
            Self::LowTime { side, left } => {
                write!(f, "{} has {} seconds left.", side.name(), left.as_secs())
            },
            Self::GameOver { outcome, pgn } => write!(f, "Game over: {outcome}.\n{pgn}"),
        }
    }
}

/// Shows the prompts to the operator.
pub trait Prompter {
    #[allow(missing_docs)]
    fn show(&mut self, prompt: &Prompt);
}

/// Prints the prompts line by line.
pub struct TerminalPrompter<W: Write> {
    output: W,
}

impl<W: Write> TerminalPrompter<W> {
    #[allow(missing_docs)]
    pub const fn new(output: W) -> Self {
        Self { output }
    }
}

impl<W: Write> Prompter for TerminalPrompter<W> {
    fn show(&mut self, prompt: &Prompt) {
        debug!("prompt: {prompt:?}");
        if let Err(error) = writeln!(self.output, "{prompt}").and_then(|()| self.output.flush()) {
            warn!("failed to show prompt: {error}");
        }
    }
}

/// Parses an operator command.
#[must_use]
pub fn parse_command(input: &str) -> Option<Event> {
    let event = match input.trim().to_lowercase().as_str() {
        "q" | "queen" => Event::PromotionChosen(Promotion::Queen),
        "r" | "rook" => Event::PromotionChosen(Promotion::Rook),
        "b" | "bishop" => Event::PromotionChosen(Promotion::Bishop),
        "n" | "knight" => Event::PromotionChosen(Promotion::Knight),
        "takeback" | "undo" => Event::TakeBack,
        "resign" => Event::Resign,
        "force" => Event::ForceMove,
        "hint" => Event::Hint,
        "claim" | "draw" => Event::ClaimDraw,
        "reconnect" => Event::Reconnect,
        "quit" | "exit" => Event::Quit,
        _ => return None,
    };
    Some(event)
}

/// Reads operator commands in the background. The end of the input quits the
/// game.
///
/// # Errors
///
/// Returns an error if the thread can not be started.
pub fn spawn_operator_input<R: BufRead + Send + 'static>(
    input: R,
    events: Sender<Event>,
) -> anyhow::Result<()> {
    let _operator = thread::Builder::new()
        .name("operator-input".to_string())
        .spawn(move || {
            for line in input.lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Some(event) => {
                        if events.send(event).is_err() {
                            return;
                        }
                    },
                    None => warn!(
                        "unknown command {line:?}, expected one of: q r b n takeback resign force hint claim reconnect quit"
                    ),
                }
            }
            let _delivered = events.send(Event::Quit);
        })?;
    Ok(())
}
