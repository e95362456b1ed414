//! LED output: the board has a light under each square which is used to show
//! the engine's move and the squares that need attention.

use crate::chess::bitboard::Bitboard;
use crate::chess::core::Square;

/// First byte of the LED command.
pub const LED_MARKER: u8 = 0x5A;

/// Set of lit squares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedPattern(Bitboard);

impl LedPattern {
    /// All lights off.
    #[must_use]
    pub const fn off() -> Self {
        Self(Bitboard::empty())
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn from_squares(squares: &[Square]) -> Self {
        Self(Bitboard::from_squares(squares))
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn squares(self) -> Bitboard {
        self.0
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn is_off(self) -> bool {
        self.0.is_empty()
    }

    /// Serializes the command: marker followed by one byte per rank, starting
    /// with the 8th rank. Bit f of each byte is file f.
    #[must_use]
    pub const fn encode(self, rotate180: bool) -> [u8; 9] {
        let squares = if rotate180 { self.0.rotate() } else { self.0 };
        let ranks = squares.bits().to_be_bytes();
        [
            LED_MARKER, ranks[0], ranks[1], ranks[2], ranks[3], ranks[4], ranks[5], ranks[6],
            ranks[7],
        ]
    }
}

impl From<Bitboard> for LedPattern {
    fn from(squares: Bitboard) -> Self {
        Self(squares)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn encoding() {
        assert_eq!(LedPattern::off().encode(false), [LED_MARKER, 0, 0, 0, 0, 0, 0, 0, 0]);
        let e2e4 = LedPattern::from_squares(&[Square::E2, Square::E4]);
        assert_eq!(
            e2e4.encode(false),
            [LED_MARKER, 0, 0, 0, 0, 0b1_0000, 0, 0b1_0000, 0]
        );
        // E2 and E4 become D7 and D5.
        assert_eq!(
            e2e4.encode(true),
            [LED_MARKER, 0, 0b1000, 0, 0b1000, 0, 0, 0, 0]
        );
        assert!(LedPattern::off().is_off());
        assert!(!e2e4.is_off());
    }
}
