//! The game orchestrator: a state machine that reacts to events from the
//! board, the engine and the operator.
//!
//! ```text
//! AwaitingSetup -> WaitingHumanMove -> Validating -> WaitingHumanMove (rejected)
//!                                                 -> WaitingEngineMove (accepted)
//! WaitingEngineMove -> EngineReplied -> PromptPhysicalExecution
//!     -> VerifyingExecution -> WaitingHumanMove (board matches)
//!                           -> PromptPhysicalExecution (not yet)
//! ```
//!
//! Any state may be suspended when the board link is lost and resumes once
//! the board reports again. The game state is owned by [`RulesValidator`] and
//! only advances through accepted moves. With a time control, the
//! [`GameClock`] runs for the side to move and is checked on every tick.

use std::mem;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::board::debounce::Delta;
use crate::board::leds::LedPattern;
use crate::board::BoardControl;
use crate::chess::bitboard::Bitboard;
use crate::chess::core::{Move, Player, Promotion, Square};
use crate::chess::game::{DrawReason, GameState, Outcome, RulesValidator, Validation};
use crate::config::{GameSettings, HumanSide};
use crate::engine::{Engine, SearchHandle};
use crate::inference::{Inference, MoveInference};
use crate::orchestrator::clock::GameClock;
use crate::orchestrator::prompt::{Prompt, Prompter};

pub mod clock;
pub mod prompt;

/// How often [`Event::Tick`] is generated while nothing else happens.
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Everything the orchestrator reacts to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The board occupancy changed and stayed stable.
    SnapshotSettled {
        #[allow(missing_docs)]
        occupancy: Bitboard,
        #[allow(missing_docs)]
        at: Instant,
    },
    /// The board link is lost.
    LinkFault,
    /// The engine finished a search.
    EngineReply {
        #[allow(missing_docs)]
        handle: SearchHandle,
        #[allow(missing_docs)]
        best: Option<Move>,
    },
    /// The engine process died.
    EngineLost,
    /// The operator picked the promotion piece.
    PromotionChosen(Promotion),
    #[allow(missing_docs)]
    TakeBack,
    #[allow(missing_docs)]
    Resign,
    /// Makes the engine move now.
    ForceMove,
    /// Asks the engine for a move suggestion for the human.
    Hint,
    /// Claims a draw by threefold repetition or the fifty-move rule.
    ClaimDraw,
    /// Tries to connect to the board again.
    Reconnect,
    #[allow(missing_docs)]
    Quit,
    /// Time passes.
    Tick(Instant),
}

#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// The physical board has to match the position before play continues.
    AwaitingSetup,
    WaitingHumanMove,
    Validating,
    /// The human moved a pawn to the last rank.
    AwaitingPromotion {
        from: Square,
        to: Square,
    },
    WaitingEngineMove {
        handle: SearchHandle,
    },
    EngineReplied,
    /// The engine move is waiting for the human to make it on the board.
    PromptPhysicalExecution,
    VerifyingExecution,
    /// The board link is lost, holds the state to resume.
    Suspended(Box<State>),
    Checkmate {
        winner: Player,
    },
    Stalemate,
    Draw(DrawReason),
    Resigned {
        winner: Player,
    },
    TimeForfeit {
        winner: Player,
    },
    Abandoned,
}

impl State {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Checkmate { .. }
                | Self::Stalemate
                | Self::Draw(_)
                | Self::Resigned { .. }
                | Self::TimeForfeit { .. }
                | Self::Abandoned
        )
    }
}

impl From<Outcome> for State {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Checkmate { winner } => Self::Checkmate { winner },
            Outcome::Stalemate => Self::Stalemate,
            Outcome::Draw(reason) => Self::Draw(reason),
            Outcome::Resigned { winner } => Self::Resigned { winner },
            Outcome::TimeForfeit { winner } => Self::TimeForfeit { winner },
            Outcome::Abandoned => Self::Abandoned,
        }
    }
}

/// An engine move the human has to make on the board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingPhysicalMove {
    /// The move with its flags, as accepted by the rules.
    pub mv: Move,
    #[allow(missing_docs)]
    pub san: String,
    /// Occupancy before the move.
    pub before: Bitboard,
    /// Occupancy once the move is made.
    pub after: Bitboard,
    /// Squares of `before` seen empty since the prompt.
    pub lifted: Bitboard,
    /// The game after the move, committed once the board shows it.
    pub next: GameState,
    /// When the board started to differ from anything on the way to `after`.
    pub mismatch_since: Option<Instant>,
    /// Whether the misplacement was already reported.
    pub flagged: bool,
}

/// Why [`Orchestrator::run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shutdown {
    /// The game ended or the operator quit.
    Finished,
    /// The operator quit while the board was disconnected.
    LinkLost,
}

impl Shutdown {
    /// Process exit code.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Finished => 0,
            Self::LinkLost => 2,
        }
    }
}

/// Coordinates the board, the rules and the engine.
pub struct Orchestrator<E: Engine, P: Prompter, B: BoardControl> {
    validator: RulesValidator,
    inference: MoveInference,
    engine: Option<E>,
    prompter: P,
    board: B,
    settings: GameSettings,
    state: State,
    pending: Option<PendingPhysicalMove>,
    /// Last settled occupancy.
    occupancy: Option<Bitboard>,
    /// Whether the engine was restarted since its last reply.
    restarted: bool,
    /// Search running for a hint.
    hint: Option<SearchHandle>,
    clock: Option<GameClock>,
}

impl<E: Engine, P: Prompter, B: BoardControl> Orchestrator<E, P, B> {
    /// Starts in [`State::AwaitingSetup`] unless the game is already over.
    /// Without an engine both sides are played by hand.
    pub fn new(
        game: GameState,
        engine: Option<E>,
        board: B,
        prompter: P,
        settings: GameSettings,
    ) -> Self {
        let state = game.outcome().map_or(State::AwaitingSetup, State::from);
        let clock = settings
            .time_limits()
            .map(|limits| GameClock::new(limits, settings.time_warning()));
        Self {
            inference: MoveInference::new(game.position().occupancy()),
            validator: RulesValidator::new(game),
            engine,
            prompter,
            board,
            settings,
            state,
            pending: None,
            occupancy: None,
            restarted: false,
            hint: None,
            clock,
        }
    }

    /// The effective state: the suspended one while the link is lost.
    #[must_use]
    pub fn state(&self) -> &State {
        match &self.state {
            State::Suspended(inner) => inner,
            state => state,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn is_suspended(&self) -> bool {
        matches!(self.state, State::Suspended(_))
    }

    /// The current game.
    #[must_use]
    pub const fn game(&self) -> &GameState {
        self.validator.current()
    }

    /// The engine move waiting to be made on the board.
    #[must_use]
    pub const fn pending(&self) -> Option<&PendingPhysicalMove> {
        self.pending.as_ref()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn prompter(&self) -> &P {
        &self.prompter
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn board(&self) -> &B {
        &self.board
    }

    /// The game clock, `None` if the game is not timed.
    #[must_use]
    pub const fn clock(&self) -> Option<&GameClock> {
        self.clock.as_ref()
    }

    /// Handles events until the game is over or the operator quits. Ticks are
    /// generated when no events arrive.
    pub fn run(&mut self, events: &Receiver<Event>) -> Shutdown {
        if self.state.is_terminal() {
            return Shutdown::Finished;
        }
        loop {
            let link_lost = self.is_suspended();
            let event = match events.recv_timeout(TICK_INTERVAL) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => Event::Tick(Instant::now()),
                Err(RecvTimeoutError::Disconnected) => Event::Quit,
            };
            let quit = event == Event::Quit;
            self.handle(event);
            if quit && link_lost {
                return Shutdown::LinkLost;
            }
            if quit || self.state.is_terminal() {
                return Shutdown::Finished;
            }
        }
    }

    /// Advances the state machine.
    pub fn handle(&mut self, event: Event) {
        if self.state.is_terminal() {
            debug!("game is over, ignoring {event:?}");
            return;
        }
        match event {
            Event::SnapshotSettled { occupancy, at } => self.on_snapshot(occupancy, at),
            Event::LinkFault => self.suspend(),
            Event::EngineReply { handle, best } => self.on_engine_reply(handle, best),
            Event::EngineLost => self.on_engine_lost(),
            Event::PromotionChosen(promotion) => self.on_promotion(promotion),
            Event::TakeBack => self.take_back(),
            Event::Resign => self.resign(),
            Event::ForceMove => self.force_move(),
            Event::Hint => self.hint(),
            Event::ClaimDraw => self.claim_draw(),
            Event::Reconnect => self.reconnect(),
            Event::Quit => self.conclude(Outcome::Abandoned),
            Event::Tick(now) => {
                self.check_misplacement(now);
                self.check_clock(now);
            },
        }
    }

    fn transition(&mut self, next: State) {
        debug!("{:?} -> {next:?}", self.state);
        match &mut self.state {
            State::Suspended(inner) if !next.is_terminal() => **inner = next,
            state => *state = next,
        }
    }

    fn human_moves(&self, side: Player) -> bool {
        self.engine.is_none() || self.settings.human.plays(side)
    }

    fn show(&mut self, prompt: &Prompt) {
        self.prompter.show(prompt);
    }

    fn light(&mut self, squares: Bitboard) {
        if let Err(error) = self.board.set_leds(LedPattern::from(squares)) {
            debug!("failed to update the lights: {error:#}");
        }
    }

    fn autosave(&self) {
        let Some(path) = &self.settings.save else {
            return;
        };
        match self.game().to_saved().save(path) {
            Ok(()) => debug!("saved the game to {}", path.display()),
            Err(error) => warn!("failed to save the game: {error:#}"),
        }
    }

    fn on_snapshot(&mut self, occupancy: Bitboard, at: Instant) {
        self.occupancy = Some(occupancy);
        if let State::Suspended(inner) = &mut self.state {
            let resumed = mem::replace(&mut **inner, State::AwaitingSetup);
            info!("board link restored");
            self.state = resumed;
            if let Some(clock) = self.clock.as_mut() {
                clock.resume(at);
            }
            self.show(&Prompt::LinkRestored);
        }
        match self.state.clone() {
            State::AwaitingSetup => self.check_setup(occupancy),
            State::WaitingHumanMove | State::AwaitingPromotion { .. } => {
                self.on_human_board(occupancy);
            },
            State::PromptPhysicalExecution => self.verify_execution(occupancy, at),
            state => debug!("board changed while {state:?}"),
        }
    }

    fn check_setup(&mut self, occupancy: Bitboard) {
        let expected = self.game().position().occupancy();
        if occupancy != expected {
            let delta = Delta::between(expected, occupancy);
            debug!("setup differs: {delta}");
            self.show(&Prompt::SetupMismatch {
                missing: delta.vacated,
                extra: delta.occupied,
            });
            self.light(delta.changed());
            return;
        }
        self.inference.rebase(occupancy);
        self.show(&Prompt::Ready);
        self.await_turn();
    }

    fn await_turn(&mut self) {
        let side = self.game().side_to_move();
        if let Some(clock) = self.clock.as_mut() {
            let now = Instant::now();
            clock.switch_to(side, now);
            debug!(
                "clock: White {:?}, Black {:?}",
                clock.remaining(Player::White, now),
                clock.remaining(Player::Black, now)
            );
        }
        if self.human_moves(side) {
            self.light(Bitboard::empty());
            self.show(&Prompt::YourMove { side });
            self.transition(State::WaitingHumanMove);
        } else {
            self.start_search();
        }
    }

    fn on_human_board(&mut self, occupancy: Bitboard) {
        let inference = self
            .inference
            .observe(occupancy, self.validator.current().position());
        match inference {
            Inference::NoChange | Inference::Incomplete => {
                if matches!(self.state(), State::AwaitingPromotion { .. }) {
                    self.transition(State::WaitingHumanMove);
                }
            },
            Inference::Candidate(candidate) => self.validate_human(candidate),
            Inference::PromotionAmbiguous { from, to } => {
                let awaiting = State::AwaitingPromotion { from, to };
                if *self.state() != awaiting {
                    self.show(&Prompt::ChoosePromotion { from, to });
                    self.transition(awaiting);
                }
            },
            Inference::Uninterpretable(delta) => {
                self.show(&Prompt::Uninterpretable { delta });
                self.transition(State::WaitingHumanMove);
            },
        }
    }

    fn on_promotion(&mut self, promotion: Promotion) {
        if let State::AwaitingPromotion { from, to } = *self.state() {
            self.validate_human(Move::new(from, to, Some(promotion)));
        } else {
            debug!("no promotion expected while {:?}", self.state());
        }
    }

    fn validate_human(&mut self, candidate: Move) {
        self.transition(State::Validating);
        match self.validator.validate(&candidate) {
            Validation::Accepted(next) => {
                let san = self
                    .game()
                    .position()
                    .san(&candidate)
                    .unwrap_or_else(|_| candidate.to_string());
                info!("accepted {san}");
                self.drop_hint();
                self.inference.rebase(next.position().occupancy());
                self.validator.commit(next);
                self.show(&Prompt::MoveAccepted { san });
                self.autosave();
                self.after_move();
            },
            Validation::Rejected(reason) => {
                info!("rejected {candidate}: {reason}");
                self.show(&Prompt::Rejected { reason });
                self.transition(State::WaitingHumanMove);
            },
        }
    }

    fn after_move(&mut self) {
        match self.game().outcome() {
            Some(outcome) => self.finish(outcome),
            None => self.await_turn(),
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        info!("game over: {outcome}");
        let pgn = self
            .game()
            .to_pgn()
            .unwrap_or_else(|error| format!("(no record: {error})"));
        self.light(Bitboard::empty());
        self.show(&Prompt::GameOver { outcome, pgn });
        self.transition(State::from(outcome));
    }

    fn start_search(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return self.await_turn();
        };
        let budget = self.settings.budget();
        let started = engine
            .set_position(self.validator.current())
            .and_then(|()| engine.search(budget));
        match started {
            Ok(handle) => {
                self.show(&Prompt::EngineThinking);
                self.transition(State::WaitingEngineMove { handle });
            },
            Err(error) => {
                warn!("failed to start the search: {error}");
                if self.recover_engine() {
                    self.start_search();
                } else {
                    self.await_turn();
                }
            },
        }
    }

    fn on_engine_reply(&mut self, handle: SearchHandle, best: Option<Move>) {
        if self.hint == Some(handle) {
            self.hint = None;
            return self.show_hint(best);
        }
        if *self.state() != (State::WaitingEngineMove { handle }) {
            debug!("dropping stale engine reply {best:?}");
            return;
        }
        self.restarted = false;
        self.transition(State::EngineReplied);
        let Some(best) = best else {
            warn!("engine did not return a move");
            return self.fall_back_to_manual();
        };
        let next = match self.validator.validate(&best) {
            Validation::Accepted(next) => next,
            Validation::Rejected(reason) => {
                error!("engine move {best} was rejected: {reason}");
                return self.fall_back_to_manual();
            },
        };
        let position = self.game().position();
        let san = position.san(&best).unwrap_or_else(|_| best.to_string());
        let before = position.occupancy();
        let mv = next.history().last().copied().unwrap_or(best);
        info!("waiting for {san} to be made on the board");
        self.light(mv.touched_squares());
        self.show(&Prompt::ExecuteMove {
            san: san.clone(),
            from: mv.from(),
            to: mv.to(),
        });
        self.pending = Some(PendingPhysicalMove {
            mv,
            san,
            before,
            after: next.position().occupancy(),
            lifted: Bitboard::empty(),
            next,
            mismatch_since: None,
            flagged: false,
        });
        self.transition(State::PromptPhysicalExecution);
    }

    fn verify_execution(&mut self, occupancy: Bitboard, at: Instant) {
        self.transition(State::VerifyingExecution);
        if let Some(pending) = self.pending.as_mut() {
            pending.lifted |= pending.before - occupancy;
        }
        if self.pending.as_ref().is_some_and(|pending| {
            // With the capturing piece in hand the board already shows
            // `after`: the captured piece has to be seen removed.
            pending.after == occupancy
                && pending
                    .mv
                    .captured_square()
                    .map_or(true, |captured| pending.lifted.contains(captured))
        }) {
            let Some(executed) = self.pending.take() else {
                return;
            };
            info!("{} was made on the board", executed.san);
            self.inference.rebase(occupancy);
            self.validator.commit(executed.next);
            self.light(Bitboard::empty());
            self.show(&Prompt::MoveExecuted { san: executed.san });
            self.autosave();
            return self.after_move();
        }
        if let Some(pending) = self.pending.as_mut() {
            let changed = Delta::between(pending.before, occupancy).changed();
            if (changed - pending.mv.touched_squares()).is_empty() {
                // Lifted or partially moved pieces.
                pending.mismatch_since = None;
                pending.flagged = false;
            } else if pending.mismatch_since.is_none() {
                pending.mismatch_since = Some(at);
            }
        }
        self.transition(State::PromptPhysicalExecution);
        self.check_misplacement(at);
    }

    fn check_misplacement(&mut self, now: Instant) {
        if self.state != State::PromptPhysicalExecution {
            return;
        }
        let grace = self.settings.grace();
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        let Some(since) = pending.mismatch_since else {
            return;
        };
        if pending.flagged || now.saturating_duration_since(since) < grace {
            return;
        }
        pending.flagged = true;
        let wrong = Delta::between(pending.after, self.occupancy.unwrap_or(pending.before));
        let prompt = Prompt::PossibleMisplacement {
            san: pending.san.clone(),
            missing: wrong.vacated,
            extra: wrong.occupied,
        };
        let squares = wrong.changed() | pending.mv.touched_squares();
        warn!("possible misplacement: {wrong}");
        self.light(squares);
        self.show(&prompt);
    }

    fn on_engine_lost(&mut self) {
        self.hint = None;
        let searching = matches!(
            self.state(),
            State::WaitingEngineMove { .. } | State::EngineReplied
        );
        if self.recover_engine() {
            if searching {
                self.start_search();
            }
        } else if searching {
            self.await_turn();
        }
    }

    /// Restarts the engine once in a row, switches to manual play if that
    /// fails. Returns whether the engine is available.
    fn recover_engine(&mut self) -> bool {
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };
        if !self.restarted {
            self.restarted = true;
            match engine.restart() {
                Ok(()) => {
                    self.show(&Prompt::EngineRestarted);
                    return true;
                },
                Err(error) => warn!("failed to restart the engine: {error}"),
            }
        }
        self.disable_engine();
        false
    }

    fn disable_engine(&mut self) {
        error!("engine is unavailable, switching to manual play");
        self.engine = None;
        self.show(&Prompt::EngineUnavailable);
    }

    fn fall_back_to_manual(&mut self) {
        self.disable_engine();
        self.await_turn();
    }

    fn force_move(&mut self) {
        if !matches!(self.state(), State::WaitingEngineMove { .. }) && self.hint.is_none() {
            debug!("engine is not searching");
            return;
        }
        if let Some(engine) = self.engine.as_mut() {
            if let Err(error) = engine.stop() {
                warn!("failed to stop the search: {error}");
            }
        }
    }

    fn cancel_search(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            if let Err(error) = engine.cancel() {
                warn!("failed to cancel the search: {error}");
            }
        }
    }

    fn hint(&mut self) {
        if *self.state() != State::WaitingHumanMove || self.hint.is_some() {
            debug!("no hint while {:?}", self.state());
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return self.show(&Prompt::HintUnavailable);
        };
        let budget = self.settings.budget();
        let started = engine
            .set_position(self.validator.current())
            .and_then(|()| engine.search(budget));
        match started {
            Ok(handle) => {
                self.hint = Some(handle);
                self.show(&Prompt::FindingHint);
            },
            Err(error) => {
                warn!("failed to start the hint search: {error}");
                self.show(&Prompt::HintUnavailable);
            },
        }
    }

    fn show_hint(&mut self, best: Option<Move>) {
        if *self.state() != State::WaitingHumanMove {
            debug!("dropping hint {best:?} while {:?}", self.state());
            return;
        }
        let Some(best) = best else {
            return self.show(&Prompt::HintUnavailable);
        };
        match self.validator.validate(&best) {
            Validation::Accepted(next) => {
                let mv = next.history().last().copied().unwrap_or(best);
                let san = self
                    .game()
                    .position()
                    .san(&best)
                    .unwrap_or_else(|_| best.to_string());
                info!("hint: {san}");
                self.light(mv.touched_squares());
                self.show(&Prompt::Hint { san });
            },
            Validation::Rejected(reason) => {
                warn!("engine hint {best} was rejected: {reason}");
                self.show(&Prompt::HintUnavailable);
            },
        }
    }

    fn drop_hint(&mut self) {
        if self.hint.take().is_some() {
            self.cancel_search();
        }
    }

    fn claim_draw(&mut self) {
        match self.game().claimable_draw() {
            Some(reason) => {
                info!("draw claimed: {reason}");
                self.conclude(Outcome::Draw(reason));
            },
            None => self.show(&Prompt::NoDrawToClaim),
        }
    }

    fn check_clock(&mut self, now: Instant) {
        let Some(clock) = self.clock.as_mut() else {
            return;
        };
        if let Some(loser) = clock.flagged(now) {
            info!("{} ran out of time", loser.name());
            return self.conclude(Outcome::TimeForfeit {
                winner: loser.opponent(),
            });
        }
        if let Some((side, left)) = clock.low_time(now) {
            self.show(&Prompt::LowTime { side, left });
        }
    }

    fn take_back(&mut self) {
        let mut plies = 0;
        while self.validator.undo() {
            plies += 1;
            if self.human_moves(self.game().side_to_move()) {
                break;
            }
        }
        if plies == 0 {
            self.show(&Prompt::NothingToTakeBack);
            return;
        }
        info!("took back {plies} plies");
        self.cancel_search();
        self.hint = None;
        self.pending = None;
        self.inference.rebase(self.game().position().occupancy());
        self.show(&Prompt::TookBack { plies });
        self.autosave();
        self.transition(State::AwaitingSetup);
        if let (Some(occupancy), false) = (self.occupancy, self.is_suspended()) {
            self.check_setup(occupancy);
        }
    }

    fn resign(&mut self) {
        let loser = match self.settings.human {
            HumanSide::White => Player::White,
            HumanSide::Black => Player::Black,
            HumanSide::Both => self.game().side_to_move(),
        };
        info!("{} resigns", loser.name());
        self.conclude(Outcome::Resigned {
            winner: loser.opponent(),
        });
    }

    fn conclude(&mut self, outcome: Outcome) {
        self.cancel_search();
        self.hint = None;
        self.pending = None;
        self.validator.conclude(outcome);
        self.autosave();
        self.finish(outcome);
    }

    fn suspend(&mut self) {
        if self.is_suspended() {
            return;
        }
        warn!("board link lost, pausing the game");
        if let Some(clock) = self.clock.as_mut() {
            clock.pause(Instant::now());
        }
        let inner = mem::replace(&mut self.state, State::AwaitingSetup);
        self.state = State::Suspended(Box::new(inner));
        self.show(&Prompt::LinkLost);
    }

    fn reconnect(&mut self) {
        if !self.is_suspended() {
            debug!("board is connected");
            return;
        }
        self.show(&Prompt::Reconnecting);
        if let Err(error) = self.board.reconnect() {
            warn!("failed to reconnect: {error:#}");
            self.show(&Prompt::ReconnectFailed {
                reason: format!("{error:#}"),
            });
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::chess::position::Position;
    use crate::engine::{EngineError, SearchBudget};

    struct NoEngine;

    impl Engine for NoEngine {
        fn set_position(&mut self, _: &GameState) -> Result<(), EngineError> {
            Err(EngineError::Unavailable("test".to_string()))
        }

        fn search(&mut self, _: SearchBudget) -> Result<SearchHandle, EngineError> {
            Err(EngineError::Unavailable("test".to_string()))
        }

        fn cancel(&mut self) -> Result<(), EngineError> {
            Ok(())
        }

        fn stop(&mut self) -> Result<(), EngineError> {
            Ok(())
        }

        fn restart(&mut self) -> Result<(), EngineError> {
            Err(EngineError::Unavailable("test".to_string()))
        }
    }

    #[derive(Default)]
    struct Prompts(Vec<Prompt>);

    impl Prompter for Prompts {
        fn show(&mut self, prompt: &Prompt) {
            self.0.push(prompt.clone());
        }
    }

    #[derive(Default)]
    struct Lights(Vec<LedPattern>);

    impl BoardControl for Lights {
        fn set_leds(&mut self, pattern: LedPattern) -> anyhow::Result<()> {
            self.0.push(pattern);
            Ok(())
        }

        fn reconnect(&mut self) -> anyhow::Result<()> {
            anyhow::bail!("no board")
        }
    }

    fn manual() -> Orchestrator<NoEngine, Prompts, Lights> {
        Orchestrator::new(
            GameState::new(),
            None,
            Lights::default(),
            Prompts::default(),
            GameSettings {
                human: HumanSide::Both,
                ..GameSettings::default()
            },
        )
    }

    fn settled(occupancy: Bitboard) -> Event {
        Event::SnapshotSettled {
            occupancy,
            at: Instant::now(),
        }
    }

    fn moved(occupancy: Bitboard, from: Square, to: Square) -> Bitboard {
        (occupancy - Bitboard::from(from)) | Bitboard::from(to)
    }

    #[test]
    fn setup_then_moves() {
        let mut orchestrator = manual();
        let start = orchestrator.game().position().occupancy();
        let missing = start - Bitboard::from(Square::D1);
        orchestrator.handle(settled(missing));
        assert_eq!(orchestrator.state(), &State::AwaitingSetup);
        assert_eq!(
            orchestrator.prompter().0.last(),
            Some(&Prompt::SetupMismatch {
                missing: Bitboard::from(Square::D1),
                extra: Bitboard::empty()
            })
        );
        assert_eq!(
            orchestrator.board().0.last(),
            Some(&LedPattern::from(Bitboard::from(Square::D1)))
        );

        orchestrator.handle(settled(start));
        assert_eq!(orchestrator.state(), &State::WaitingHumanMove);

        let e4 = moved(start, Square::E2, Square::E4);
        orchestrator.handle(settled(start - Bitboard::from(Square::E2)));
        assert_eq!(orchestrator.state(), &State::WaitingHumanMove);
        orchestrator.handle(settled(e4));
        assert_eq!(orchestrator.game().history().len(), 1);
        assert_eq!(orchestrator.game().side_to_move(), Player::Black);
        assert!(orchestrator.prompter().0.contains(&Prompt::MoveAccepted {
            san: "e4".to_string()
        }));
    }

    #[test]
    fn rejected_move_keeps_the_game() {
        let mut orchestrator = manual();
        let start = orchestrator.game().position().occupancy();
        orchestrator.handle(settled(start));
        orchestrator.handle(settled(moved(start, Square::E2, Square::E5)));
        assert_eq!(orchestrator.state(), &State::WaitingHumanMove);
        assert!(orchestrator.game().history().is_empty());
        assert!(matches!(
            orchestrator.prompter().0.last(),
            Some(Prompt::Rejected { .. })
        ));
        // Putting the pawn back is not a move.
        orchestrator.handle(settled(start));
        assert!(orchestrator.game().history().is_empty());
    }

    #[test]
    fn link_fault_suspends() {
        let mut orchestrator = manual();
        let start = orchestrator.game().position().occupancy();
        orchestrator.handle(settled(start));
        orchestrator.handle(Event::LinkFault);
        assert!(orchestrator.is_suspended());
        assert_eq!(orchestrator.state(), &State::WaitingHumanMove);
        orchestrator.handle(Event::Reconnect);
        assert!(matches!(
            orchestrator.prompter().0.last(),
            Some(Prompt::ReconnectFailed { .. })
        ));
        orchestrator.handle(settled(moved(start, Square::G1, Square::F3)));
        assert!(!orchestrator.is_suspended());
        assert_eq!(orchestrator.game().history().len(), 1);
    }

    #[test]
    fn take_back_and_resign() {
        let mut orchestrator = manual();
        let start = orchestrator.game().position().occupancy();
        orchestrator.handle(Event::TakeBack);
        assert_eq!(
            orchestrator.prompter().0.last(),
            Some(&Prompt::NothingToTakeBack)
        );
        orchestrator.handle(settled(start));
        let e4 = moved(start, Square::E2, Square::E4);
        orchestrator.handle(settled(e4));
        orchestrator.handle(Event::TakeBack);
        assert_eq!(orchestrator.game().history().len(), 0);
        // The pawn is still on e4.
        assert_eq!(orchestrator.state(), &State::AwaitingSetup);
        orchestrator.handle(settled(start));
        assert_eq!(orchestrator.state(), &State::WaitingHumanMove);

        orchestrator.handle(Event::Resign);
        assert_eq!(
            orchestrator.state(),
            &State::Resigned {
                winner: Player::Black
            }
        );
        assert_eq!(orchestrator.game().outcome(), Some(Outcome::Resigned {
            winner: Player::Black
        }));
        // Nothing happens after the game is over.
        orchestrator.handle(settled(e4));
        assert!(orchestrator.game().history().is_empty());
    }

    #[test]
    fn engine_failure_falls_back_to_manual() {
        let mut orchestrator = Orchestrator::new(
            GameState::new(),
            Some(NoEngine),
            Lights::default(),
            Prompts::default(),
            GameSettings {
                human: HumanSide::Black,
                ..GameSettings::default()
            },
        );
        orchestrator.handle(settled(Position::starting().occupancy()));
        assert_eq!(orchestrator.state(), &State::WaitingHumanMove);
        assert!(orchestrator
            .prompter()
            .0
            .contains(&Prompt::EngineUnavailable));
    }
}
