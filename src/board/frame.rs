//! Wire format of the sensor frames:
//!
//! ```text
//! 0xA5 | occupancy (8 bytes, little-endian) | sequence | checksum
//! ```
//!
//! Bit i of the occupancy corresponds to square i (A1 = 0, H8 = 63). The
//! checksum is XOR of the occupancy bytes and the sequence byte.

use log::debug;

/// First byte of every frame sent by the board.
pub const START_MARKER: u8 = 0xA5;
/// Sent to the board after a corrupted frame: asks it to retransmit.
pub const RESYNC_REQUEST: u8 = 0x15;
/// Total frame length including the marker.
pub const FRAME_SIZE: usize = 11;

/// Decoded sensor frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    #[allow(missing_docs)]
    pub occupancy: u64,
    #[allow(missing_docs)]
    pub sequence: u8,
}

#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame should be 11 bytes long, got {len}")]
    Truncated { len: usize },
    #[error("frame should start with the marker, got {0:#04x}")]
    MissingMarker(u8),
    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Checksum { expected: u8, actual: u8 },
}

impl Frame {
    #[allow(missing_docs)]
    #[must_use]
    pub fn checksum(&self) -> u8 {
        self.occupancy
            .to_le_bytes()
            .iter()
            .fold(self.sequence, |checksum, byte| checksum ^ byte)
    }

    /// Serializes the frame the way the board sends it.
    #[must_use]
    pub fn encode(&self) -> [u8; FRAME_SIZE] {
        let mut bytes = [0; FRAME_SIZE];
        bytes[0] = START_MARKER;
        bytes[1..9].copy_from_slice(&self.occupancy.to_le_bytes());
        bytes[9] = self.sequence;
        bytes[10] = self.checksum();
        bytes
    }

    /// Parses exactly one frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if the frame is malformed.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() != FRAME_SIZE {
            return Err(FrameError::Truncated { len: bytes.len() });
        }
        if bytes[0] != START_MARKER {
            return Err(FrameError::MissingMarker(bytes[0]));
        }
        let mut occupancy = [0; 8];
        occupancy.copy_from_slice(&bytes[1..9]);
        let frame = Self {
            occupancy: u64::from_le_bytes(occupancy),
            sequence: bytes[9],
        };
        let expected = frame.checksum();
        if expected != bytes[10] {
            return Err(FrameError::Checksum {
                expected,
                actual: bytes[10],
            });
        }
        Ok(frame)
    }
}

/// Splits the byte stream into frames. Bytes before the start marker are
/// skipped, a corrupted frame only consumes its marker so that the decoder
/// resynchronizes on the next one. Markers inside a corrupted frame are tried
/// too but failing there is not reported again: one corrupted frame is one
/// error.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Bytes of the last corrupted frame that are still buffered.
    corrupted: usize,
}

impl FrameDecoder {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the bytes received from the port.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Returns the next frame, an error for a corrupted one or `None` if more
    /// bytes are needed.
    pub fn next_frame(&mut self) -> Option<Result<Frame, FrameError>> {
        loop {
            let Some(start) = self.buffer.iter().position(|byte| *byte == START_MARKER) else {
                if !self.buffer.is_empty() {
                    debug!("skipping {} bytes without start marker", self.buffer.len());
                    self.consume(self.buffer.len());
                }
                return None;
            };
            if start > 0 {
                debug!("skipping {start} bytes before start marker");
                self.consume(start);
            }
            if self.buffer.len() < FRAME_SIZE {
                return None;
            }
            match Frame::decode(&self.buffer[..FRAME_SIZE]) {
                Ok(frame) => {
                    self.consume(FRAME_SIZE);
                    return Some(Ok(frame));
                },
                Err(error) if self.corrupted > 0 => {
                    debug!("no frame inside the corrupted one: {error}");
                    self.consume(1);
                },
                Err(error) => {
                    self.consume(1);
                    self.corrupted = FRAME_SIZE - 1;
                    return Some(Err(error));
                },
            }
        }
    }

    /// Drops everything buffered so far.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.corrupted = 0;
    }

    fn consume(&mut self, count: usize) {
        self.buffer = self.buffer.split_off(count);
        self.corrupted = self.corrupted.saturating_sub(count);
    }
}
