//! Driver for USB sensor chessboards. The board only reports which squares
//! are occupied: this crate turns the occupancy changes into moves, checks them
//! against the rules, asks a UCI engine for the reply and guides the player
//! through making it on the board.
//!
//! The pieces, leaves first:
//!
//! - [`board`]: serial link, frame decoding and debouncing of sensor readings.
//! - [`inference`]: occupancy changes to candidate moves.
//! - [`chess`]: rules, legal move generation and the game record.
//! - [`engine`]: the UCI engine session.
//! - [`orchestrator`]: the state machine tying everything together.
//!
//! Usage, operator commands and exit codes are described in `README.md`.

// Rustdoc lints.
#![warn(
    rustdoc::missing_crate_level_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::invalid_codeblock_attributes,
    rustdoc::invalid_html_tags,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::bare_urls
)]

pub mod board;
pub mod chess;
pub mod config;
pub mod engine;
pub mod inference;
pub mod orchestrator;

use shadow_rs::shadow;

shadow!(build);

/// Returns the full version that identifies how the binary was built.
#[must_use]
pub fn version() -> String {
    format!(
        "{} (commit {}, branch {})",
        build::PKG_VERSION,
        build::SHORT_COMMIT,
        build::BRANCH
    )
}

/// Prints the version and the build type when the game starts.
pub fn print_banner() {
    println!("sensorboard {}", version());
    if shadow_rs::is_debug() {
        println!("Debug build: move generation is slow");
    }
    if !shadow_rs::git_clean() {
        println!("Warning: built with uncommitted changes");
    }
    println!();
}
