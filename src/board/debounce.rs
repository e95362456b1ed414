//! Sensor readings flicker while a hand hovers over the board or a piece slides
//! between squares. [`Debouncer`] only reports the occupancy once it has been
//! read the same way several times in a row.

use std::fmt;
use std::time::Instant;

use crate::board::BoardSnapshot;
use crate::chess::bitboard::Bitboard;

/// Difference between two occupancy readings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delta {
    /// Squares that had a piece and are now empty.
    pub vacated: Bitboard,
    /// Squares that were empty and now have a piece.
    pub occupied: Bitboard,
}

impl Delta {
    #[allow(missing_docs)]
    #[must_use]
    pub fn between(before: Bitboard, after: Bitboard) -> Self {
        Self {
            vacated: before - after,
            occupied: after - before,
        }
    }

    /// All squares whose occupancy changed.
    #[must_use]
    pub fn changed(&self) -> Bitboard {
        self.vacated | self.occupied
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.vacated.is_empty() && self.occupied.is_empty()
    }
}

impl fmt::Display for Delta {
    /// Lists vacated squares with "-" and occupied ones with "+", e.g.
    /// "-e2 +e4".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (sign, squares) in [('-', self.vacated), ('+', self.occupied)] {
            for square in squares.iter() {
                if !first {
                    f.write_str(" ")?;
                }
                first = false;
                write!(f, "{sign}{square}")?;
            }
        }
        Ok(())
    }
}

/// Occupancy that stayed stable long enough.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settled {
    #[allow(missing_docs)]
    pub occupancy: Bitboard,
    /// Change since the previous settled occupancy. The first settled reading
    /// is compared to an empty board.
    pub delta: Delta,
    /// Time of the reading that settled the occupancy.
    pub at: Instant,
}

/// Requires N identical readings before accepting a new occupancy.
#[derive(Clone, Debug)]
pub struct Debouncer {
    required: usize,
    settled: Option<Bitboard>,
    candidate: Option<Bitboard>,
    streak: usize,
}

impl Debouncer {
    /// Creates a debouncer requiring `required` identical readings (at least
    /// one).
    #[must_use]
    pub fn new(required: usize) -> Self {
        Self {
            required: required.max(1),
            settled: None,
            candidate: None,
            streak: 0,
        }
    }

    /// Feeds the next reading. Returns the new occupancy once it settles,
    /// readings that do not change the settled occupancy produce nothing.
    pub fn push(&mut self, snapshot: &BoardSnapshot) -> Option<Settled> {
        if self.candidate == Some(snapshot.occupancy) {
            self.streak += 1;
        } else {
            self.candidate = Some(snapshot.occupancy);
            self.streak = 1;
        }
        if self.streak < self.required || self.settled == Some(snapshot.occupancy) {
            return None;
        }
        let before = self.settled.unwrap_or_default();
        self.settled = Some(snapshot.occupancy);
        Some(Settled {
            occupancy: snapshot.occupancy,
            delta: Delta::between(before, snapshot.occupancy),
            at: snapshot.timestamp,
        })
    }

    /// Last settled occupancy.
    #[must_use]
    pub const fn settled(&self) -> Option<Bitboard> {
        self.settled
    }

    /// Forgets everything: the next stable reading is reported even if it is
    /// the same as before.
    pub fn reset(&mut self) {
        self.settled = None;
        self.candidate = None;
        self.streak = 0;
    }
}
