//! Chess clock. Only the time of the side to move runs, the player who just
//! moved gets the increment.

use std::time::{Duration, Instant};

use crate::chess::core::Player;
use crate::config::TimeLimits;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Side {
    left: Duration,
    warned: bool,
}

/// Time left for both players.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameClock {
    limits: TimeLimits,
    warning: Duration,
    white: Side,
    black: Side,
    /// Whose time runs.
    turn: Option<Player>,
    /// Last time the running player was charged, `None` while paused.
    since: Option<Instant>,
}

impl GameClock {
    /// The clock does not run until [`GameClock::switch_to`] is called.
    #[must_use]
    pub const fn new(limits: TimeLimits, warning: Duration) -> Self {
        let side = Side {
            left: limits.total,
            warned: false,
        };
        Self {
            limits,
            warning,
            white: side,
            black: side,
            turn: None,
            since: None,
        }
    }

    const fn side(&self, player: Player) -> &Side {
        match player {
            Player::White => &self.white,
            Player::Black => &self.black,
        }
    }

    fn side_mut(&mut self, player: Player) -> &mut Side {
        match player {
            Player::White => &mut self.white,
            Player::Black => &mut self.black,
        }
    }

    /// Time left for the player.
    #[must_use]
    pub fn remaining(&self, player: Player, now: Instant) -> Duration {
        let left = self.side(player).left;
        match (self.turn, self.since) {
            (Some(turn), Some(since)) if turn == player => {
                left.saturating_sub(now.saturating_duration_since(since))
            },
            _ => left,
        }
    }

    /// The player whose time runs.
    #[must_use]
    pub const fn turn(&self) -> Option<Player> {
        self.turn
    }

    /// Starts the time of the player to move. Nothing changes if it already
    /// runs.
    pub fn switch_to(&mut self, player: Player, now: Instant) {
        if self.turn == Some(player) {
            return;
        }
        if let Some(previous) = self.turn {
            self.charge(now);
            let increment = self.limits.increment;
            let side = self.side_mut(previous);
            side.left = side.left.saturating_add(increment);
        }
        self.turn = Some(player);
        self.since = Some(now);
    }

    fn charge(&mut self, now: Instant) {
        let (Some(turn), Some(since)) = (self.turn, self.since) else {
            return;
        };
        let elapsed = now.saturating_duration_since(since);
        let side = self.side_mut(turn);
        side.left = side.left.saturating_sub(elapsed);
        self.since = Some(now);
    }

    /// Stops the running time until [`GameClock::resume`].
    pub fn pause(&mut self, now: Instant) {
        self.charge(now);
        self.since = None;
    }

    #[allow(missing_docs)]
    pub fn resume(&mut self, now: Instant) {
        if self.turn.is_some() && self.since.is_none() {
            self.since = Some(now);
        }
    }

    /// The player to move if their time is over.
    #[must_use]
    pub fn flagged(&self, now: Instant) -> Option<Player> {
        let turn = self.turn?;
        self.remaining(turn, now).is_zero().then_some(turn)
    }

    /// The player to move and their time once it drops below the warning
    /// threshold. Reported once per player.
    pub fn low_time(&mut self, now: Instant) -> Option<(Player, Duration)> {
        let turn = self.turn?;
        let left = self.remaining(turn, now);
        let warning = self.warning;
        let side = self.side_mut(turn);
        if side.warned || left >= warning {
            return None;
        }
        side.warned = true;
        Some((turn, left))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn seconds(secs: u64) -> Duration {
        Duration::from_secs(secs)
    }

    fn clock() -> GameClock {
        GameClock::new(
            TimeLimits {
                total: seconds(300),
                increment: seconds(2),
            },
            seconds(60),
        )
    }

    #[test]
    fn only_the_side_to_move_loses_time() {
        let start = Instant::now();
        let mut clock = clock();
        assert_eq!(clock.remaining(Player::White, start + seconds(100)), seconds(300));

        clock.switch_to(Player::White, start);
        assert_eq!(clock.remaining(Player::White, start + seconds(10)), seconds(290));
        assert_eq!(clock.remaining(Player::Black, start + seconds(10)), seconds(300));

        clock.switch_to(Player::Black, start + seconds(10));
        // The increment goes to the player who moved.
        assert_eq!(clock.remaining(Player::White, start + seconds(50)), seconds(292));
        assert_eq!(clock.remaining(Player::Black, start + seconds(50)), seconds(260));
        assert_eq!(clock.turn(), Some(Player::Black));

        // Switching to the running side changes nothing.
        clock.switch_to(Player::Black, start + seconds(50));
        assert_eq!(clock.remaining(Player::Black, start + seconds(60)), seconds(250));
    }

    #[test]
    fn pause_and_resume() {
        let start = Instant::now();
        let mut clock = clock();
        clock.switch_to(Player::White, start);
        clock.pause(start + seconds(30));
        assert_eq!(clock.remaining(Player::White, start + seconds(200)), seconds(270));
        clock.resume(start + seconds(200));
        assert_eq!(clock.remaining(Player::White, start + seconds(210)), seconds(260));
    }

    #[test]
    fn flag_and_warning() {
        let start = Instant::now();
        let mut clock = clock();
        assert_eq!(clock.flagged(start), None);
        clock.switch_to(Player::White, start);
        assert_eq!(clock.low_time(start + seconds(200)), None);
        assert_eq!(
            clock.low_time(start + seconds(250)),
            Some((Player::White, seconds(50)))
        );
        assert_eq!(clock.low_time(start + seconds(260)), None);
        assert_eq!(clock.flagged(start + seconds(299)), None);
        assert_eq!(clock.flagged(start + seconds(300)), Some(Player::White));
    }
}
