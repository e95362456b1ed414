//! [`BoardLink`] owns the serial port: it turns the byte stream into validated
//! [`BoardSnapshot`]s and sends LED commands back.
//!
//! Corrupted frames and sequence jumps are reported as transient errors and
//! the link asks the board to retransmit. Too many of them in a row (or too
//! many read timeouts) mean that the board is gone: [`LinkError::LinkLost`].

use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use serialport::{SerialPort, SerialPortInfo, SerialPortType};

use crate::board::frame::{Frame, FrameDecoder, RESYNC_REQUEST};
use crate::board::leds::LedPattern;
use crate::board::BoardSnapshot;
use crate::chess::bitboard::Bitboard;
use crate::config::LinkSettings;

/// Sequence numbers may skip frames the host did not read in time, but
/// should never go backwards or jump too far.
const SEQUENCE_WINDOW: u8 = 16;
/// Granularity of the port reads.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("no frame received within {0:?}")]
    Timeout(Duration),
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("board link lost after {0} consecutive failures")]
    LinkLost(u32),
    #[error("no serial port found, specify one with --port")]
    NoPort,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serial(#[from] serialport::Error),
}

impl LinkError {
    /// Errors that go away by reading further.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::ProtocolViolation(_))
    }
}

/// Connection to the board over any byte stream (a serial port in production,
/// an in-memory one in tests).
pub struct BoardLink<T: Read + Write> {
    port: T,
    decoder: FrameDecoder,
    settings: LinkSettings,
    last_sequence: Option<u8>,
    consecutive_errors: u32,
    consecutive_timeouts: u32,
}

impl BoardLink<Box<dyn SerialPort>> {
    /// Opens the serial port given in the settings or the first one that looks
    /// like a board.
    ///
    /// # Errors
    ///
    /// Returns an error if no port is found or it can not be opened.
    pub fn connect(settings: &LinkSettings) -> Result<Self, LinkError> {
        let path = match &settings.port {
            Some(path) => path.clone(),
            None => detect_port()?,
        };
        info!("connecting to {path} at {} baud", settings.baud);
        let port = serialport::new(path, settings.baud)
            .timeout(POLL_INTERVAL)
            .open()?;
        Ok(Self::new(port, settings.clone()))
    }
}

/// Lists serial ports available in the system.
///
/// # Errors
///
/// Returns an error if the ports can not be enumerated.
pub fn list_ports() -> Result<Vec<SerialPortInfo>, LinkError> {
    Ok(serialport::available_ports()?)
}

fn detect_port() -> Result<String, LinkError> {
    let ports = list_ports()?;
    let is_board = |info: &&SerialPortInfo| match &info.port_type {
        SerialPortType::UsbPort(usb) => [&usb.product, &usb.manufacturer]
            .iter()
            .any(|field| field.as_deref().is_some_and(|text| text.contains("CP210"))),
        _ => false,
    };
    ports
        .iter()
        .find(is_board)
        .or_else(|| {
            ports
                .iter()
                .find(|info| !matches!(info.port_type, SerialPortType::BluetoothPort))
        })
        .map(|info| info.port_name.clone())
        .ok_or(LinkError::NoPort)
}

impl<T: Read + Write> BoardLink<T> {
    #[allow(missing_docs)]
    pub fn new(port: T, settings: LinkSettings) -> Self {
        Self {
            port,
            decoder: FrameDecoder::new(),
            settings,
            last_sequence: None,
            consecutive_errors: 0,
            consecutive_timeouts: 0,
        }
    }

    /// The underlying port.
    pub const fn get_ref(&self) -> &T {
        &self.port
    }

    /// Blocks until the next valid frame arrives or the read timeout expires.
    ///
    /// # Errors
    ///
    /// - [`LinkError::Timeout`] and [`LinkError::ProtocolViolation`] are
    ///   transient: the next call may succeed.
    /// - [`LinkError::LinkLost`] after too many consecutive failures.
    /// - I/O errors of the port.
    pub fn read_snapshot(&mut self) -> Result<BoardSnapshot, LinkError> {
        let deadline = Instant::now() + self.settings.read_timeout();
        let mut buffer = [0; 64];
        loop {
            if let Some(decoded) = self.decoder.next_frame() {
                return match decoded {
                    Ok(frame) => self.accept(frame),
                    Err(error) => Err(self.reject(error.to_string())),
                };
            }
            if Instant::now() >= deadline {
                return Err(self.timed_out());
            }
            match self.port.read(&mut buffer) {
                Ok(0) => thread::sleep(POLL_INTERVAL),
                Ok(read) => {
                    trace!("received {read} bytes");
                    self.decoder.push(&buffer[..read]);
                },
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) => {},
                Err(error) => return Err(error.into()),
            }
        }
    }

    fn accept(&mut self, frame: Frame) -> Result<BoardSnapshot, LinkError> {
        if let Some(last) = self.last_sequence {
            let step = frame.sequence.wrapping_sub(last);
            if !(1..=SEQUENCE_WINDOW).contains(&step) {
                self.last_sequence = Some(frame.sequence);
                return Err(self.reject(format!(
                    "sequence {} is out of range after {last}",
                    frame.sequence
                )));
            }
        }
        self.last_sequence = Some(frame.sequence);
        self.consecutive_errors = 0;
        self.consecutive_timeouts = 0;
        let occupancy = Bitboard::from_bits(frame.occupancy);
        Ok(BoardSnapshot {
            occupancy: if self.settings.rotate180 {
                occupancy.rotate()
            } else {
                occupancy
            },
            sequence: frame.sequence,
            timestamp: Instant::now(),
        })
    }

    fn reject(&mut self, reason: String) -> LinkError {
        self.consecutive_errors += 1;
        debug!(
            "bad frame ({}/{}): {reason}",
            self.consecutive_errors, self.settings.max_frame_errors
        );
        if let Err(error) = self.request_resync() {
            debug!("failed to request retransmission: {error}");
        }
        if self.consecutive_errors >= self.settings.max_frame_errors {
            warn!("too many corrupted frames in a row");
            return LinkError::LinkLost(self.consecutive_errors);
        }
        LinkError::ProtocolViolation(reason)
    }

    fn timed_out(&mut self) -> LinkError {
        self.consecutive_timeouts += 1;
        if self.consecutive_timeouts >= self.settings.max_timeouts {
            warn!("board stopped responding");
            return LinkError::LinkLost(self.consecutive_timeouts);
        }
        LinkError::Timeout(self.settings.read_timeout())
    }

    fn request_resync(&mut self) -> io::Result<()> {
        self.port.write_all(&[RESYNC_REQUEST])?;
        self.port.flush()
    }

    /// Lights up the squares of the pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the command can not be written to the port.
    pub fn set_leds(&mut self, pattern: LedPattern) -> Result<(), LinkError> {
        self.port.write_all(&pattern.encode(self.settings.rotate180))?;
        self.port.flush()?;
        Ok(())
    }

    /// Turns off the lights and releases the port. Dropping the link releases
    /// the port too.
    ///
    /// # Errors
    ///
    /// Returns an error if the lights can not be turned off.
    pub fn disconnect(mut self) -> Result<(), LinkError> {
        self.decoder.reset();
        self.set_leds(LedPattern::off())
    }
}

impl<T: Read + Write> Drop for BoardLink<T> {
    fn drop(&mut self) {
        info!("releasing board link");
    }
}

#[cfg(test)]
mod test {
    use std::collections::VecDeque;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::board::frame::FRAME_SIZE;

    #[derive(Default)]
    struct FakePort {
        input: VecDeque<u8>,
        written: Vec<u8>,
    }

    impl Read for FakePort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for FakePort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn link(frames: &[[u8; FRAME_SIZE]]) -> BoardLink<FakePort> {
        let settings = LinkSettings {
            read_timeout_ms: 20,
            max_timeouts: 2,
            ..LinkSettings::default()
        };
        BoardLink::new(
            FakePort {
                input: frames.iter().flatten().copied().collect(),
                written: Vec::new(),
            },
            settings,
        )
    }

    fn frame(occupancy: u64, sequence: u8) -> [u8; FRAME_SIZE] {
        Frame {
            occupancy,
            sequence,
        }
        .encode()
    }

    #[test]
    fn reads_snapshots() {
        let mut link = link(&[frame(0xFFFF, 200), frame(0xFF00, 201)]);
        let first = link.read_snapshot().unwrap();
        assert_eq!(first.occupancy, Bitboard::from_bits(0xFFFF));
        assert_eq!(first.sequence, 200);
        assert_eq!(
            link.read_snapshot().unwrap().occupancy,
            Bitboard::from_bits(0xFF00)
        );
        assert!(matches!(link.read_snapshot(), Err(LinkError::Timeout(_))));
        assert!(matches!(link.read_snapshot(), Err(LinkError::LinkLost(2))));
    }

    #[test]
    fn sequence_window() {
        // 255 -> 0 wraps around, 0 -> 0 is a repetition, 0 -> 100 is a jump.
        let mut link = link(&[frame(1, 255), frame(1, 0), frame(1, 0), frame(1, 100)]);
        assert!(link.read_snapshot().is_ok());
        assert!(link.read_snapshot().is_ok());
        assert!(matches!(
            link.read_snapshot(),
            Err(LinkError::ProtocolViolation(_))
        ));
        assert!(matches!(
            link.read_snapshot(),
            Err(LinkError::ProtocolViolation(_))
        ));
        assert_eq!(link.get_ref().written, vec![RESYNC_REQUEST; 2]);
    }

    #[test]
    fn rotated_board() {
        let mut link = link(&[frame(1, 0)]);
        link.settings.rotate180 = true;
        assert_eq!(
            link.read_snapshot().unwrap().occupancy,
            Bitboard::from_bits(1 << 63)
        );
    }

    #[test]
    fn leds() {
        let mut link = link(&[]);
        link.set_leds(LedPattern::from(Bitboard::from_bits(1 << 63)))
            .unwrap();
        assert_eq!(
            link.get_ref().written,
            vec![0x5A, 0b1000_0000, 0, 0, 0, 0, 0, 0, 0]
        );
    }
}
