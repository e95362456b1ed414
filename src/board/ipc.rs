//! The board reader runs as a separate process (`sensorboard usb`) so that a
//! stuck serial port never blocks the game. It talks to the launcher through a
//! line protocol on its standard streams:
//!
//! ```text
//! snapshot <sequence> <occupancy as 16 hex digits>    reader -> launcher
//! fault lost                                          reader -> launcher
//! leds <lit squares as 16 hex digits>                 launcher -> reader
//! ```
//!
//! [`serve`] is the reader side, [`UsbProcess`] is the launcher side: it
//! spawns the reader, debounces the snapshots and turns them into
//! [`Event`]s.

use std::fmt;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{bail, Context};
use log::{debug, info, trace, warn};

use crate::board::debounce::Debouncer;
use crate::board::leds::LedPattern;
use crate::board::link::{BoardLink, LinkError};
use crate::board::{BoardControl, BoardSnapshot};
use crate::chess::bitboard::Bitboard;
use crate::config::LinkSettings;
use crate::orchestrator::Event;

/// A line of the protocol.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message {
    Snapshot { sequence: u8, occupancy: Bitboard },
    LinkLost,
    Leds(LedPattern),
}

impl Message {
    /// Parses a single line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not a known message.
    pub fn parse(line: &str) -> anyhow::Result<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["snapshot", sequence, occupancy] => Ok(Self::Snapshot {
                sequence: sequence
                    .parse()
                    .with_context(|| format!("invalid sequence number: {sequence}"))?,
                occupancy: Bitboard::from_bits(parse_hex(occupancy)?),
            }),
            ["fault", "lost"] => Ok(Self::LinkLost),
            ["leds", squares] => Ok(Self::Leds(Bitboard::from_bits(parse_hex(squares)?).into())),
            _ => bail!("unexpected message: \"{line}\""),
        }
    }
}

fn parse_hex(input: &str) -> anyhow::Result<u64> {
    if input.len() != 16 || !input.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        bail!("expected 16 hex digits, got \"{input}\"");
    }
    Ok(u64::from_str_radix(input, 16)?)
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snapshot {
                sequence,
                occupancy,
            } => write!(f, "snapshot {sequence} {:016x}", occupancy.bits()),
            Self::LinkLost => write!(f, "fault lost"),
            Self::Leds(pattern) => write!(f, "leds {:016x}", pattern.squares().bits()),
        }
    }
}

/// Why the reader stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServeExit {
    /// The launcher closed the input.
    InputClosed,
    /// The board stopped responding.
    LinkLost,
}

impl ServeExit {
    /// Process exit code of the reader.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::InputClosed => 0,
            Self::LinkLost => 2,
        }
    }
}

/// Reads commands on a separate thread. The channel is closed when the input
/// ends.
pub fn spawn_command_reader<R: BufRead + Send + 'static>(input: R) -> Receiver<Message> {
    let (sender, receiver) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("ipc-commands".to_string())
        .spawn(move || {
            for line in input.lines() {
                let Ok(line) = line else { break };
                match Message::parse(&line) {
                    Ok(message) => {
                        if sender.send(message).is_err() {
                            break;
                        }
                    },
                    Err(error) => warn!("{error}"),
                }
            }
        });
    if let Err(error) = spawned {
        warn!("failed to spawn command reader: {error}");
    }
    receiver
}

/// Forwards snapshots from the board to `output` and LED commands to the board
/// until the commands channel is closed or the link is lost.
///
/// # Errors
///
/// Returns an error if the port or the output fail.
pub fn serve<T: Read + Write, W: Write>(
    link: &mut BoardLink<T>,
    commands: &Receiver<Message>,
    output: &mut W,
) -> anyhow::Result<ServeExit> {
    loop {
        loop {
            match commands.try_recv() {
                Ok(Message::Leds(pattern)) => link.set_leds(pattern)?,
                Ok(message) => warn!("unexpected command: {message}"),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(ServeExit::InputClosed),
            }
        }
        match link.read_snapshot() {
            Ok(snapshot) => {
                let message = Message::Snapshot {
                    sequence: snapshot.sequence,
                    occupancy: snapshot.occupancy,
                };
                trace!("{message}");
                writeln!(output, "{message}")?;
                output.flush()?;
            },
            Err(error) if error.is_transient() => debug!("{error}"),
            Err(LinkError::LinkLost(failures)) => {
                warn!("link lost after {failures} failures");
                writeln!(output, "{}", Message::LinkLost)?;
                output.flush()?;
                return Ok(ServeExit::LinkLost);
            },
            Err(error) => return Err(error.into()),
        }
    }
}

/// Debounces the reader output and emits the settled occupancy as events.
/// Returns when the reader's output ends.
pub fn forward_snapshots<R: BufRead>(
    reader: R,
    required: usize,
    events: &Sender<Event>,
    active: &AtomicBool,
) {
    let mut debouncer = Debouncer::new(required);
    let mut lost = false;
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                warn!("failed to read from the board reader: {error}");
                break;
            },
        };
        let event = match Message::parse(&line) {
            Ok(Message::Snapshot {
                sequence,
                occupancy,
            }) => {
                lost = false;
                let snapshot = BoardSnapshot {
                    occupancy,
                    sequence,
                    timestamp: Instant::now(),
                };
                match debouncer.push(&snapshot) {
                    Some(settled) => {
                        debug!("settled: {}", settled.delta);
                        Event::SnapshotSettled {
                            occupancy: settled.occupancy,
                            at: settled.at,
                        }
                    },
                    None => continue,
                }
            },
            Ok(Message::LinkLost) => {
                lost = true;
                debouncer.reset();
                Event::LinkFault
            },
            Ok(message) => {
                warn!("unexpected message from the board reader: {message}");
                continue;
            },
            Err(error) => {
                warn!("{error}");
                continue;
            },
        };
        if events.send(event).is_err() {
            return;
        }
    }
    if !lost && active.load(Ordering::SeqCst) {
        warn!("board reader exited");
        let _delivered = events.send(Event::LinkFault);
    }
}

/// Launcher side of the board reader: a child process running
/// `sensorboard usb`.
pub struct UsbProcess {
    executable: PathBuf,
    settings: LinkSettings,
    debounce: usize,
    events: Sender<Event>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    active: Arc<AtomicBool>,
}

impl UsbProcess {
    /// Starts the reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the process can not be started.
    pub fn spawn(
        executable: PathBuf,
        settings: LinkSettings,
        debounce: usize,
        events: Sender<Event>,
    ) -> anyhow::Result<Self> {
        let mut process = Self {
            executable,
            settings,
            debounce,
            events,
            child: None,
            stdin: None,
            active: Arc::new(AtomicBool::new(false)),
        };
        process.start()?;
        Ok(process)
    }

    fn start(&mut self) -> anyhow::Result<()> {
        let mut child = Command::new(&self.executable)
            .arg("usb")
            .args(self.settings.to_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("starting {} usb", self.executable.display()))?;
        let stdout = child
            .stdout
            .take()
            .context("board reader output is not captured")?;
        self.stdin = child.stdin.take();
        self.child = Some(child);

        let active = Arc::new(AtomicBool::new(true));
        self.active = Arc::clone(&active);
        let events = self.events.clone();
        let required = self.debounce;
        let _reader = thread::Builder::new()
            .name("board-reader".to_string())
            .spawn(move || forward_snapshots(BufReader::new(stdout), required, &events, &active))
            .context("spawning board reader thread")?;
        info!("board reader started");
        Ok(())
    }

    fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        // Closing the input makes the reader exit.
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            match child.wait() {
                Ok(status) => debug!("board reader exited: {status}"),
                Err(error) => warn!("failed to wait for the board reader: {error}"),
            }
        }
    }
}

impl BoardControl for UsbProcess {
    fn set_leds(&mut self, pattern: LedPattern) -> anyhow::Result<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            bail!("board reader is not running");
        };
        writeln!(stdin, "{}", Message::Leds(pattern))?;
        stdin.flush()?;
        Ok(())
    }

    fn reconnect(&mut self) -> anyhow::Result<()> {
        self.stop();
        self.start()
    }
}

impl Drop for UsbProcess {
    fn drop(&mut self) {
        self.stop();
    }
}
