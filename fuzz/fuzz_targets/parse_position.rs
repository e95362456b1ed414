#![no_main]
use libfuzzer_sys::fuzz_target;
use pretty_assertions::assert_eq;
use sensorboard::chess::position::Position;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(position) = Position::try_from(input) else {
        return;
    };
    // Printed positions parse back to the same position.
    let printed = position.to_string();
    let reparsed = Position::try_from(printed.as_str())
        .expect("printed position should be valid");
    assert_eq!(reparsed.to_string(), printed);
});
