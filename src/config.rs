//! Settings of the board link and the game. Both are parsed from the command
//! line and have defaults that match the common boards, so that tests can
//! construct them directly.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};

use crate::chess::core::Player;
use crate::engine::SearchBudget;

/// How to reach the board and when to give up on it.
#[derive(Args, Clone, Debug, PartialEq, Eq)]
pub struct LinkSettings {
    /// Serial port of the board (e.g. /dev/ttyUSB0). Detected automatically if
    /// omitted.
    #[arg(long)]
    pub port: Option<String>,
    #[allow(missing_docs)]
    #[arg(long, default_value_t = 38400)]
    pub baud: u32,
    /// How long to wait for a single frame.
    #[arg(long, default_value_t = 2500)]
    pub read_timeout_ms: u64,
    /// Consecutive corrupted frames before the link is considered lost.
    #[arg(long, default_value_t = 5)]
    pub max_frame_errors: u32,
    /// Consecutive read timeouts before the link is considered lost.
    #[arg(long, default_value_t = 8)]
    pub max_timeouts: u32,
    /// The board is turned around: a1 is in the top right corner.
    #[arg(long)]
    pub rotate180: bool,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud: 38400,
            read_timeout_ms: 2500,
            max_frame_errors: 5,
            max_timeouts: 8,
            rotate180: false,
        }
    }
}

impl LinkSettings {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Command line arguments reproducing these settings for the board reader
    /// process.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(port) = &self.port {
            args.extend(["--port".to_string(), port.clone()]);
        }
        args.extend([
            "--baud".to_string(),
            self.baud.to_string(),
            "--read-timeout-ms".to_string(),
            self.read_timeout_ms.to_string(),
            "--max-frame-errors".to_string(),
            self.max_frame_errors.to_string(),
            "--max-timeouts".to_string(),
            self.max_timeouts.to_string(),
        ]);
        if self.rotate180 {
            args.push("--rotate180".to_string());
        }
        args
    }
}

/// Who moves the pieces by hand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum HumanSide {
    #[allow(missing_docs)]
    #[default]
    White,
    #[allow(missing_docs)]
    Black,
    /// Two humans, no engine moves.
    Both,
}

impl HumanSide {
    /// Whether the human makes the moves of given player.
    #[must_use]
    pub const fn plays(self, player: Player) -> bool {
        matches!(
            (self, player),
            (Self::Both, _) | (Self::White, Player::White) | (Self::Black, Player::Black)
        )
    }
}

/// Time control of the game clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum TimeControl {
    /// No clock.
    #[default]
    Unlimited,
    /// 5 minutes per player.
    Blitz,
    /// 10 minutes per player.
    Rapid,
    /// 15 minutes per player and 15 seconds per move.
    Classical,
    /// Set with --clock-minutes and --increment-secs.
    Custom,
}

/// Starting time of each player and the time added after every move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeLimits {
    #[allow(missing_docs)]
    pub total: Duration,
    #[allow(missing_docs)]
    pub increment: Duration,
}

/// Everything about the game except for the board connection.
#[derive(Args, Clone, Debug, PartialEq, Eq)]
pub struct GameSettings {
    /// Side played by the human.
    #[arg(long, value_enum, default_value_t = HumanSide::White)]
    pub human: HumanSide,
    /// UCI engine executable. Without it, all moves are made by hand.
    #[arg(long)]
    pub engine: Option<PathBuf>,
    /// Time the engine is given for each move.
    #[arg(long, default_value_t = 2000)]
    pub movetime_ms: u64,
    /// Limits the engine search depth.
    #[arg(long)]
    pub depth: Option<u8>,
    /// Identical readings required before the board is considered settled.
    #[arg(long, default_value_t = 3)]
    pub debounce: usize,
    /// How long a wrong placement may stay on the board before it is
    /// reported.
    #[arg(long, default_value_t = 3000)]
    pub grace_ms: u64,
    /// Saves the game after every move.
    #[arg(long)]
    pub save: Option<PathBuf>,
    /// Continues a previously saved game.
    #[arg(long)]
    pub resume: Option<PathBuf>,
    /// Game clock. Running out of time loses the game.
    #[arg(long, value_enum, default_value_t = TimeControl::Unlimited)]
    pub clock: TimeControl,
    /// Time of each player with the custom clock.
    #[arg(long, default_value_t = 5)]
    pub clock_minutes: u64,
    /// Time added after each move with the custom clock.
    #[arg(long, default_value_t = 8)]
    pub increment_secs: u64,
    /// Warns the player once less time is left.
    #[arg(long, default_value_t = 60)]
    pub time_warning_secs: u64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            human: HumanSide::White,
            engine: None,
            movetime_ms: 2000,
            depth: None,
            debounce: 3,
            grace_ms: 3000,
            save: None,
            resume: None,
            clock: TimeControl::Unlimited,
            clock_minutes: 5,
            increment_secs: 8,
            time_warning_secs: 60,
        }
    }
}

impl GameSettings {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn budget(&self) -> SearchBudget {
        SearchBudget {
            movetime: Duration::from_millis(self.movetime_ms),
            depth: self.depth,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    /// Limits of the clock, `None` if the game is not timed.
    #[must_use]
    pub const fn time_limits(&self) -> Option<TimeLimits> {
        let (minutes, increment) = match self.clock {
            TimeControl::Unlimited => return None,
            TimeControl::Blitz => (5, 0),
            TimeControl::Rapid => (10, 0),
            TimeControl::Classical => (15, 15),
            TimeControl::Custom => (self.clock_minutes, self.increment_secs),
        };
        Some(TimeLimits {
            total: Duration::from_secs(minutes.saturating_mul(60)),
            increment: Duration::from_secs(increment),
        })
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn time_warning(&self) -> Duration {
        Duration::from_secs(self.time_warning_secs)
    }
}
