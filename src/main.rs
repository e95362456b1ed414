//! Command line entry point.
//!
//! `play` is the launcher: it starts the engine and the board reader (this
//! executable running `usb`) as child processes and runs the game on the main
//! thread. `usb` owns the serial port and exchanges line messages with the
//! launcher over its standard input and output.

use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{error, warn};
use sensorboard::board::ipc::{serve, spawn_command_reader, UsbProcess};
use sensorboard::board::link::{list_ports, BoardLink};
use sensorboard::chess::game::{GameState, SavedGame};
use sensorboard::config::{GameSettings, LinkSettings};
use sensorboard::engine::process::UciEngine;
use sensorboard::orchestrator::prompt::{spawn_operator_input, TerminalPrompter};
use sensorboard::orchestrator::Orchestrator;

/// Exit code when the engine can not be started.
const ENGINE_FAILURE: u8 = 3;
/// Exit code when the board can not be reached.
const LINK_FAILURE: u8 = 2;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Logs everything at debug level (overrides RUST_LOG).
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plays a game on the board.
    Play {
        #[command(flatten)]
        link: LinkSettings,
        #[command(flatten)]
        game: GameSettings,
    },
    /// Reads the board: snapshots go to standard output, LED commands are
    /// read from standard input.
    Usb {
        #[command(flatten)]
        link: LinkSettings,
    },
    /// Lists serial ports.
    Ports,
    /// Replays a saved game and prints the final position and the moves.
    Replay {
        /// Game saved with --save.
        path: PathBuf,
    },
}

fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if debug {
        let _builder = builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn play(link: LinkSettings, settings: GameSettings) -> anyhow::Result<ExitCode> {
    sensorboard::print_banner();
    let (sender, receiver) = mpsc::channel();
    let engine = match &settings.engine {
        Some(path) => match UciEngine::start(path, sender.clone()) {
            Ok(engine) => Some(engine),
            Err(error) => {
                error!("{error}");
                return Ok(ExitCode::from(ENGINE_FAILURE));
            },
        },
        None => None,
    };
    let game = match &settings.resume {
        Some(path) => SavedGame::load(path)?.restore()?,
        None => GameState::new(),
    };
    let executable = std::env::current_exe().context("locating the executable")?;
    let board = UsbProcess::spawn(executable, link, settings.debounce, sender.clone())?;
    spawn_operator_input(BufReader::new(io::stdin()), sender)?;
    let prompter = TerminalPrompter::new(io::stdout());
    let mut orchestrator = Orchestrator::new(game, engine, board, prompter, settings);
    let shutdown = orchestrator.run(&receiver);
    Ok(ExitCode::from(shutdown.exit_code()))
}

fn usb(link: &LinkSettings) -> anyhow::Result<ExitCode> {
    let mut board = match BoardLink::connect(link) {
        Ok(board) => board,
        Err(error) => {
            error!("{error}");
            return Ok(ExitCode::from(LINK_FAILURE));
        },
    };
    let commands = spawn_command_reader(BufReader::new(io::stdin()));
    let exit = serve(&mut board, &commands, &mut io::stdout().lock())?;
    if let Err(error) = board.disconnect() {
        warn!("failed to turn off the lights: {error}");
    }
    Ok(ExitCode::from(exit.code()))
}

fn ports() -> anyhow::Result<ExitCode> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{}\t{:?}", port.port_name, port.port_type);
    }
    Ok(ExitCode::SUCCESS)
}

fn replay(path: &Path) -> anyhow::Result<ExitCode> {
    let game = SavedGame::load(path)?.restore()?;
    println!("{}", game.position());
    println!("{}", game.to_pgn()?);
    if let Some(outcome) = game.outcome() {
        println!("{outcome}");
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);
    let result = match cli.command {
        Command::Play { link, game } => play(link, game),
        Command::Usb { link } => usb(&link),
        Command::Ports => ports(),
        Command::Replay { path } => replay(&path),
    };
    match result {
        Ok(code) => code,
        Err(error) => {
            error!("{error:#}");
            ExitCode::FAILURE
        },
    }
}
