//! Retrieves information about the version of the driver from Git and the
//! build environment and pre-calculates lookup tables used by the rules
//! implementation: leaper attacks and Zobrist keys. Everything is written to
//! the output directory and `include!`d at compile time.

use std::error::Error;
use std::fmt::Write;
use std::path::Path;
use std::{env, fs};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BOARD_WIDTH: i32 = 8;
const BOARD_SIZE: i32 = BOARD_WIDTH * BOARD_WIDTH;

const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];
const KING_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const WHITE_PAWN_OFFSETS: [(i32, i32); 2] = [(-1, 1), (1, 1)];
const BLACK_PAWN_OFFSETS: [(i32, i32); 2] = [(-1, -1), (1, -1)];

// 12 piece kinds on 64 squares, side to move, 4 castling rights and 8 en
// passant files.
const ZOBRIST_KEYS_COUNT: usize = 12 * 64 + 1 + 4 + 8;
// Fixed seed: keys have to be stable between builds so that saved repetition
// data and tests stay reproducible.
const ZOBRIST_SEED: u64 = 0x5eed_b0a2_d5e5_5042;

fn generate_file(filename: &str, contents: &str) -> Result<(), Box<dyn Error>> {
    let out_dir = env::var_os("OUT_DIR").ok_or("OUT_DIR is not set")?;
    let dest_path = Path::new(&out_dir).join(filename);
    fs::write(dest_path, contents)?;
    Ok(())
}

fn to_square(column: i32, row: i32) -> u64 {
    1 << (row * BOARD_WIDTH + column)
}

fn is_within_board(column: i32, row: i32) -> bool {
    (0..BOARD_WIDTH).contains(&column) && (0..BOARD_WIDTH).contains(&row)
}

fn serialize_bitboard_array(array: &[u64]) -> Result<String, Box<dyn Error>> {
    let mut result = String::new();
    result.push('[');
    for element in array {
        writeln!(result, "Bitboard::from_bits({element:#018x}), ")?;
    }
    result.push(']');
    Ok(result)
}

fn serialize_array(array: &[u64]) -> Result<String, Box<dyn Error>> {
    let mut result = String::new();
    result.push('[');
    for element in array {
        writeln!(result, "{element:#018x}, ")?;
    }
    result.push(']');
    Ok(result)
}

fn leaper_attacks(offsets: &[(i32, i32)]) -> Vec<u64> {
    let mut attacks = Vec::with_capacity(BOARD_SIZE as usize);
    for square in 0..BOARD_SIZE {
        let (column, row) = (square % BOARD_WIDTH, square / BOARD_WIDTH);
        let mut result = 0u64;
        for (d_column, d_row) in offsets {
            if is_within_board(column + d_column, row + d_row) {
                result |= to_square(column + d_column, row + d_row);
            }
        }
        attacks.push(result);
    }
    attacks
}

fn generate_attack_tables() -> Result<(), Box<dyn Error>> {
    for (identifier, offsets) in [
        ("knight_attacks", &KNIGHT_OFFSETS[..]),
        ("king_attacks", &KING_OFFSETS[..]),
        ("white_pawn_attacks", &WHITE_PAWN_OFFSETS[..]),
        ("black_pawn_attacks", &BLACK_PAWN_OFFSETS[..]),
    ] {
        let attacks = leaper_attacks(offsets);
        assert_eq!(attacks.len(), BOARD_SIZE as usize);
        generate_file(identifier, &serialize_bitboard_array(&attacks)?)?;
    }
    Ok(())
}

fn generate_zobrist_keys() -> Result<(), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
    let keys: Vec<u64> = (0..ZOBRIST_KEYS_COUNT).map(|_| rng.r#gen()).collect();
    generate_file("zobrist_keys", &serialize_array(&keys)?)
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=build.rs");
    generate_attack_tables()?;
    generate_zobrist_keys()?;
    shadow_rs::new()?;
    Ok(())
}
