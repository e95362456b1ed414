//! Runs a UCI engine as a child process.
//!
//! Commands are written to the engine input from the orchestrator thread, the
//! engine output is read by a dedicated thread that turns best moves into
//! [`Event::EngineReply`] and reports [`Event::EngineLost`] when the output
//! closes unexpectedly.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crate::chess::game::GameState;
use crate::engine::uci::{Command, Response};
use crate::engine::{Engine, EngineError, SearchBudget, SearchHandle};
use crate::orchestrator::Event;

/// Time given to the engine for each handshake step.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
/// Engines may overrun `movetime` a little before they reply by themselves.
const WATCHDOG_GRACE: Duration = Duration::from_millis(500);
/// Time given to the engine to exit after `quit`.
const QUIT_TIMEOUT: Duration = Duration::from_secs(1);

/// State shared between the session and the reader and watchdog threads.
struct Session {
    stdin: Mutex<ChildStdin>,
    /// Searches that did not receive `bestmove` yet, oldest first.
    pending: Mutex<VecDeque<u64>>,
    /// The search whose result is still wanted (0: none).
    live: AtomicU64,
    /// Set when the engine is shut down on purpose.
    closing: AtomicBool,
}

impl Session {
    fn send(&self, command: &Command) -> Result<(), EngineError> {
        trace!("> {command}");
        let mut stdin = self
            .stdin
            .lock()
            .map_err(|_| EngineError::Unavailable("engine input is poisoned".to_string()))?;
        writeln!(stdin, "{command}")?;
        stdin.flush()?;
        Ok(())
    }

    fn is_searching(&self) -> bool {
        self.pending
            .lock()
            .map(|pending| !pending.is_empty())
            .unwrap_or(false)
    }

    fn is_pending(&self, generation: u64) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.contains(&generation))
            .unwrap_or(false)
    }

    fn finish_search(&self) -> Option<u64> {
        self.pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.pop_front())
    }
}

/// [`Engine`] backed by an executable speaking UCI.
pub struct UciEngine {
    path: PathBuf,
    events: Sender<Event>,
    child: Child,
    session: Arc<Session>,
    generation: u64,
    position: Option<Command>,
    handshake_timeout: Duration,
}

impl UciEngine {
    /// Starts the engine and completes the handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the executable can not be started or does not
    /// answer the handshake in time.
    pub fn start(path: &Path, events: Sender<Event>) -> Result<Self, EngineError> {
        Self::start_with_timeout(path, events, HANDSHAKE_TIMEOUT)
    }

    /// Like [`UciEngine::start`], waits at most `handshake_timeout` for each
    /// handshake step. Restarts use the same limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the executable can not be started or does not
    /// answer the handshake in time.
    pub fn start_with_timeout(
        path: &Path,
        events: Sender<Event>,
        handshake_timeout: Duration,
    ) -> Result<Self, EngineError> {
        let (child, session) = launch(path, &events, handshake_timeout)?;
        Ok(Self {
            path: path.to_path_buf(),
            events,
            child,
            session,
            generation: 0,
            position: None,
            handshake_timeout,
        })
    }

    fn shutdown(&mut self) {
        self.session.closing.store(true, Ordering::SeqCst);
        if let Err(error) = self.session.send(&Command::Quit) {
            debug!("engine did not receive quit: {error}");
        }
        let deadline = Instant::now() + QUIT_TIMEOUT;
        while Instant::now() < deadline {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!("engine exited with {status}");
                    return;
                },
                Ok(None) => thread::sleep(Duration::from_millis(20)),
                Err(_) => break,
            }
        }
        warn!("engine did not quit in time, killing it");
        if let Err(error) = self.child.kill() {
            debug!("failed to kill the engine: {error}");
        }
        let _status = self.child.wait();
    }
}

fn launch(
    path: &Path,
    events: &Sender<Event>,
    timeout: Duration,
) -> Result<(Child, Arc<Session>), EngineError> {
    info!("starting engine {}", path.display());
    let mut child = std::process::Command::new(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|error| EngineError::Unavailable(format!("{}: {error}", path.display())))?;
    let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
        let _killed = child.kill();
        return Err(EngineError::Unavailable(
            "engine pipes are not available".to_string(),
        ));
    };
    let session = Arc::new(Session {
        stdin: Mutex::new(stdin),
        pending: Mutex::new(VecDeque::new()),
        live: AtomicU64::new(0),
        closing: AtomicBool::new(false),
    });
    let (handshake_tx, handshake_rx) = mpsc::channel();
    let reader = {
        let session = Arc::clone(&session);
        let events = events.clone();
        thread::Builder::new()
            .name("engine-reader".to_string())
            .spawn(move || read_output(stdout, &session, &events, &handshake_tx))
    };
    let started = reader
        .map_err(EngineError::from)
        .and_then(|_reader| handshake(&session, &handshake_rx, timeout));
    if let Err(error) = started {
        session.closing.store(true, Ordering::SeqCst);
        let _killed = child.kill();
        let _status = child.wait();
        return Err(error);
    }
    Ok((child, session))
}

fn handshake(
    session: &Session,
    responses: &Receiver<Response>,
    timeout: Duration,
) -> Result<(), EngineError> {
    session.send(&Command::Uci)?;
    wait_for(responses, &Response::UciOk, timeout)?;
    session.send(&Command::IsReady)?;
    wait_for(responses, &Response::ReadyOk, timeout)?;
    session.send(&Command::NewGame)?;
    debug!("engine is ready");
    Ok(())
}

fn wait_for(
    responses: &Receiver<Response>,
    expected: &Response,
    timeout: Duration,
) -> Result<(), EngineError> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match responses.recv_timeout(remaining) {
            Ok(response) if response == *expected => return Ok(()),
            Ok(_) => {},
            Err(RecvTimeoutError::Timeout) => {
                return Err(EngineError::Handshake(format!(
                    "no {expected:?} within {timeout:?}"
                )))
            },
            Err(RecvTimeoutError::Disconnected) => {
                return Err(EngineError::Handshake(
                    "engine exited during handshake".to_string(),
                ))
            },
        }
    }
}

fn read_output(
    stdout: ChildStdout,
    session: &Session,
    events: &Sender<Event>,
    handshake: &Sender<Response>,
) {
    for line in BufReader::new(stdout).lines() {
        let Ok(line) = line else { break };
        trace!("< {line}");
        match Response::parse(&line) {
            response @ (Response::UciOk | Response::ReadyOk) => {
                let _delivered = handshake.send(response);
            },
            Response::BestMove { best, .. } => {
                let Some(generation) = session.finish_search() else {
                    debug!("unexpected bestmove: {line}");
                    continue;
                };
                if session.live.load(Ordering::SeqCst) != generation {
                    debug!("dropping the result of cancelled search {generation}");
                    continue;
                }
                session.live.store(0, Ordering::SeqCst);
                match best {
                    Some(best) => info!("engine plays {best}"),
                    None => info!("engine has no moves"),
                }
                if events
                    .send(Event::EngineReply {
                        handle: SearchHandle::new(generation),
                        best,
                    })
                    .is_err()
                {
                    break;
                }
            },
            Response::Info {
                depth: Some(depth),
                score: Some(score),
                ..
            } => debug!("depth {depth} score {score}"),
            Response::Id(id) => debug!("engine {id}"),
            _ => {},
        }
    }
    if !session.closing.load(Ordering::SeqCst) {
        warn!("engine output closed");
        let _delivered = events.send(Event::EngineLost);
    }
}

impl Engine for UciEngine {
    fn set_position(&mut self, game: &GameState) -> Result<(), EngineError> {
        self.cancel()?;
        let command = Command::position(game);
        self.session.send(&command)?;
        self.position = Some(command);
        Ok(())
    }

    fn search(&mut self, budget: SearchBudget) -> Result<SearchHandle, EngineError> {
        self.generation += 1;
        let generation = self.generation;
        self.session.live.store(generation, Ordering::SeqCst);
        self.session
            .pending
            .lock()
            .map_err(|_| EngineError::Unavailable("engine state is poisoned".to_string()))?
            .push_back(generation);
        let movetime = u64::try_from(budget.movetime.as_millis()).unwrap_or(u64::MAX);
        self.session.send(&Command::Go {
            movetime: Some(movetime),
            depth: budget.depth,
        })?;
        let session = Arc::clone(&self.session);
        let deadline = budget.movetime + WATCHDOG_GRACE;
        // Makes sure the search ends even if the engine ignores movetime.
        let _watchdog = thread::Builder::new()
            .name("engine-watchdog".to_string())
            .spawn(move || {
                thread::sleep(deadline);
                if session.is_pending(generation) && !session.closing.load(Ordering::SeqCst) {
                    debug!("search {generation} overran its budget");
                    if let Err(error) = session.send(&Command::Stop) {
                        debug!("failed to stop the search: {error}");
                    }
                }
            })?;
        Ok(SearchHandle::new(generation))
    }

    fn cancel(&mut self) -> Result<(), EngineError> {
        self.session.live.store(0, Ordering::SeqCst);
        if self.session.is_searching() {
            self.session.send(&Command::Stop)?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        if self.session.is_searching() {
            self.session.send(&Command::Stop)?;
        }
        Ok(())
    }

    fn restart(&mut self) -> Result<(), EngineError> {
        warn!("restarting engine");
        self.shutdown();
        let (child, session) = launch(&self.path, &self.events, self.handshake_timeout)?;
        self.child = child;
        self.session = session;
        if let Some(position) = &self.position {
            self.session.send(position)?;
        }
        Ok(())
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
