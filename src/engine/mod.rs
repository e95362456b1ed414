//! The engine bridge: asks a chess engine for the moves of the side that is not
//! played by a human.
//!
//! Searches are asynchronous. [`Engine::search`] returns a [`SearchHandle`]
//! immediately and the best move arrives later as
//! [`crate::orchestrator::Event::EngineReply`] carrying the same handle. Setting
//! a new position or cancelling makes the engine drop the result of the
//! search in flight, so a stale reply never reaches the orchestrator.
//!
//! The only implementation is [`process::UciEngine`] which talks the
//! [Universal Chess Interface] to an engine subprocess. Tests substitute a
//! deterministic stub.
//!
//! [Universal Chess Interface]: https://www.chessprogramming.org/UCI

use std::io;
use std::time::Duration;

use crate::chess::game::GameState;

pub mod process;
pub mod uci;

/// Limits of a single search. The engine commits to its best move once the
/// time is over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchBudget {
    #[allow(missing_docs)]
    pub movetime: Duration,
    #[allow(missing_docs)]
    pub depth: Option<u8>,
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            movetime: Duration::from_secs(2),
            depth: None,
        }
    }
}

/// Identifies a search: replies carry the handle of the search they answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SearchHandle(u64);

impl SearchHandle {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn new(generation: u64) -> Self {
        Self(generation)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.0
    }
}

#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    #[error("engine handshake failed: {0}")]
    Handshake(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A chess engine session.
pub trait Engine {
    /// Sends the position to analyze. The result of any search in flight is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine can not be reached.
    fn set_position(&mut self, game: &GameState) -> Result<(), EngineError>;

    /// Starts searching the last position sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine can not be reached.
    fn search(&mut self, budget: SearchBudget) -> Result<SearchHandle, EngineError>;

    /// Drops the result of the search in flight.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine can not be reached.
    fn cancel(&mut self) -> Result<(), EngineError>;

    /// Asks the engine to commit to its current best move now. The reply is
    /// still delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine can not be reached.
    fn stop(&mut self) -> Result<(), EngineError>;

    /// Replaces a dead engine with a fresh one and sends it the last position.
    ///
    /// # Errors
    ///
    /// Returns an error if the new engine does not start.
    fn restart(&mut self) -> Result<(), EngineError>;
}
