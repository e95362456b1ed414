//! Everything that talks to the physical board: the serial frame format, the
//! link owning the port, debouncing of sensor readings and LED output.
//!
//! The board only reports which squares are occupied. Turning occupancy
//! changes into moves is the job of [`crate::inference`].

use std::time::Instant;

use crate::chess::bitboard::Bitboard;

pub mod debounce;
pub mod frame;
pub mod ipc;
pub mod leds;
pub mod link;

/// A single raw sensor reading. Might be noisy: pieces in transit and hands
/// hovering over the board produce short-lived changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardSnapshot {
    /// Bit i is set iff square i has a piece on it.
    pub occupancy: Bitboard,
    /// Frame sequence number reported by the device.
    pub sequence: u8,
    #[allow(missing_docs)]
    pub timestamp: Instant,
}

/// Operations the game needs from the board besides the readings, which are
/// delivered as events.
pub trait BoardControl {
    /// Lights up given squares, turning all others off.
    ///
    /// # Errors
    ///
    /// Returns an error if the command can not be delivered to the board.
    fn set_leds(&mut self, pattern: leds::LedPattern) -> anyhow::Result<()>;

    /// Re-establishes the connection after the link was lost.
    ///
    /// # Errors
    ///
    /// Returns an error if the board is still not reachable.
    fn reconnect(&mut self) -> anyhow::Result<()>;
}
