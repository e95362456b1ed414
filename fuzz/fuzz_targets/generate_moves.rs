#![no_main]
use itertools::Itertools;
use libfuzzer_sys::fuzz_target;
use pretty_assertions::assert_eq;
use sensorboard::chess::position::Position;
use shakmaty::{CastlingMode, Chess, Position as _};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(position) = Position::try_from(input) else {
        return;
    };
    let setup: shakmaty::fen::Fen = input
        .parse()
        .expect("when we parsed a valid position it should be accepted by shakmaty");
    let Ok(reference) = setup.into_position::<Chess>(CastlingMode::Standard) else {
        return;
    };
    assert_eq!(
        position
            .generate_moves()
            .iter()
            .map(ToString::to_string)
            .sorted()
            .collect_vec(),
        reference
            .legal_moves()
            .iter()
            .map(|m| m.to_uci(CastlingMode::Standard).to_string())
            .sorted()
            .collect_vec()
    );
});
