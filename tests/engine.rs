//! The UCI session against scripted engines: shell scripts that answer the
//! handshake, log every command they receive and reply to searches in a fixed
//! way.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use sensorboard::chess::core::Move;
use sensorboard::chess::game::{GameState, Validation};
use sensorboard::engine::process::UciEngine;
use sensorboard::engine::{Engine, EngineError, SearchBudget};
use sensorboard::orchestrator::Event;

const TIMEOUT: Duration = Duration::from_secs(5);

/// What the scripted engine does.
#[derive(Clone, Copy)]
enum Behavior {
    /// Replies to `go` right away.
    Replies,
    /// Replies only when told to `stop`.
    WaitsForStop,
    /// Exits on `go`.
    CrashesOnSearch,
    /// Never answers the handshake.
    Mute,
}

fn script(behavior: Behavior, log: &Path) -> String {
    let handshake = match behavior {
        Behavior::Mute => ":",
        _ => "echo 'id name scripted'; echo 'uciok'",
    };
    let (go, stop) = match behavior {
        Behavior::Replies => ("echo 'info depth 1 score cp 20'; echo 'bestmove e7e5'", ":"),
        Behavior::WaitsForStop => (
            "searching=1",
            "if [ -n \"$searching\" ]; then searching=; echo 'bestmove e7e5'; fi",
        ),
        Behavior::CrashesOnSearch => ("exit 1", ":"),
        Behavior::Mute => (":", ":"),
    };
    format!(
        r#"#!/bin/sh
while IFS= read -r line; do
  echo "$line" >> '{log}'
  case "$line" in
    uci) {handshake} ;;
    isready) echo 'readyok' ;;
    go*) {go} ;;
    stop) {stop} ;;
    quit) exit 0 ;;
  esac
done
"#,
        log = log.display()
    )
}

/// Scripted engine executable in its own temporary directory.
struct Fixture {
    dir: PathBuf,
    executable: PathBuf,
    log: PathBuf,
}

impl Fixture {
    fn new(behavior: Behavior) -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let dir = std::env::temp_dir().join(format!(
            "sensorboard-engine-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        fs::create_dir_all(&dir).unwrap();
        let executable = dir.join("engine.sh");
        let log = dir.join("commands.log");
        fs::write(&executable, script(behavior, &log)).unwrap();
        fs::set_permissions(&executable, fs::Permissions::from_mode(0o755)).unwrap();
        Self {
            dir,
            executable,
            log,
        }
    }

    fn start(&self, events: &Sender<Event>, timeout: Duration) -> Result<UciEngine, EngineError> {
        // A script that was just written can not be executed while another
        // test thread forks with its descriptor still open.
        let mut attempts = 0;
        loop {
            match UciEngine::start_with_timeout(&self.executable, events.clone(), timeout) {
                Err(EngineError::Unavailable(reason)) if attempts < 10 && reason.contains("busy") => {
                    attempts += 1;
                    thread::sleep(Duration::from_millis(50));
                },
                result => return result,
            }
        }
    }

    fn commands(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Polls the command log until `done` holds or the timeout expires.
    fn wait_for_commands(&self, done: impl Fn(&[String]) -> bool) -> Vec<String> {
        let deadline = Instant::now() + TIMEOUT;
        loop {
            let commands = self.commands();
            if done(&commands) || Instant::now() >= deadline {
                return commands;
            }
            thread::sleep(Duration::from_millis(20));
        }
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _removed = fs::remove_dir_all(&self.dir);
    }
}

fn uci(input: &str) -> Move {
    Move::from_uci(input).unwrap()
}

fn after_e4() -> GameState {
    match GameState::new().validate(&uci("e2e4")) {
        Validation::Accepted(next) => next,
        Validation::Rejected(reason) => panic!("{reason}"),
    }
}

fn budget(movetime_ms: u64) -> SearchBudget {
    SearchBudget {
        movetime: Duration::from_millis(movetime_ms),
        depth: None,
    }
}

fn next_event(events: &Receiver<Event>) -> Event {
    events.recv_timeout(TIMEOUT).expect("engine event")
}

fn count(commands: &[String], command: &str) -> usize {
    commands.iter().filter(|line| *line == command).count()
}

#[test]
fn handshake_then_search() {
    let fixture = Fixture::new(Behavior::Replies);
    let (sender, events) = mpsc::channel();
    let mut engine = fixture.start(&sender, TIMEOUT).unwrap();
    engine.set_position(&after_e4()).unwrap();
    let handle = engine.search(budget(100)).unwrap();
    assert_eq!(
        next_event(&events),
        Event::EngineReply {
            handle,
            best: Some(uci("e7e5"))
        }
    );
    assert_eq!(
        fixture.commands(),
        vec![
            "uci",
            "isready",
            "ucinewgame",
            "position startpos moves e2e4",
            "go movetime 100"
        ]
    );

    drop(engine);
    assert_eq!(fixture.commands().last().map(String::as_str), Some("quit"));
}

#[test]
fn silent_engine_fails_the_handshake() {
    let fixture = Fixture::new(Behavior::Mute);
    let (sender, _events) = mpsc::channel();
    let started = Instant::now();
    assert!(matches!(
        fixture.start(&sender, Duration::from_millis(200)),
        Err(EngineError::Handshake(_))
    ));
    assert!(started.elapsed() < TIMEOUT);
}

#[test]
fn cancelled_searches_are_not_reported() {
    let fixture = Fixture::new(Behavior::WaitsForStop);
    let (sender, events) = mpsc::channel();
    let mut engine = fixture.start(&sender, TIMEOUT).unwrap();
    engine.set_position(&GameState::new()).unwrap();
    let first = engine.search(budget(60_000)).unwrap();
    // A new position drops the search in flight.
    engine.set_position(&after_e4()).unwrap();
    let second = engine.search(budget(60_000)).unwrap();
    engine.cancel().unwrap();
    let third = engine.search(budget(60_000)).unwrap();
    assert_ne!(first, third);
    assert_ne!(second, third);
    engine.stop().unwrap();

    assert_eq!(
        next_event(&events),
        Event::EngineReply {
            handle: third,
            best: Some(uci("e7e5"))
        }
    );
    assert!(events.recv_timeout(Duration::from_millis(300)).is_err());
    assert_eq!(count(&fixture.commands(), "stop"), 3);
}

#[test]
fn watchdog_stops_overrunning_search() {
    let fixture = Fixture::new(Behavior::WaitsForStop);
    let (sender, events) = mpsc::channel();
    let mut engine = fixture.start(&sender, TIMEOUT).unwrap();
    engine.set_position(&after_e4()).unwrap();
    let handle = engine.search(budget(100)).unwrap();
    // The engine ignores movetime and only replies after the watchdog's stop.
    assert_eq!(
        next_event(&events),
        Event::EngineReply {
            handle,
            best: Some(uci("e7e5"))
        }
    );
    assert_eq!(count(&fixture.commands(), "stop"), 1);
}

#[test]
fn lost_engine_is_restarted_with_the_position() {
    let fixture = Fixture::new(Behavior::CrashesOnSearch);
    let (sender, events) = mpsc::channel();
    let mut engine = fixture.start(&sender, TIMEOUT).unwrap();
    engine.set_position(&after_e4()).unwrap();
    let _handle = engine.search(budget(100)).unwrap();
    assert_eq!(next_event(&events), Event::EngineLost);

    engine.restart().unwrap();
    let position = "position startpos moves e2e4";
    let commands = fixture.wait_for_commands(|commands| count(commands, position) == 2);
    assert_eq!(count(&commands, "uci"), 2);
    assert_eq!(count(&commands, position), 2);
    assert_eq!(commands.last().map(String::as_str), Some(position));

    // Shutting down on purpose is not a lost engine.
    drop(engine);
    assert!(events.recv_timeout(Duration::from_millis(300)).is_err());
}
