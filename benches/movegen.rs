//! Criterion benchmarks for the work done on every settled board reading:
//! legal move generation (validation), perft as a combined performance and
//! correctness check and move inference from occupancy changes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sensorboard::board::debounce::Delta;
use sensorboard::chess::bitboard::Bitboard;
use sensorboard::chess::core::Square;
use sensorboard::chess::position::{perft, Position};
use sensorboard::inference::infer;
use shakmaty::{CastlingMode, Chess, Position as ShakmatyPosition};

const POSITIONS: [&str; 6] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
];

fn movegen_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("Move generation");
    let positions: Vec<Position> = POSITIONS
        .iter()
        .map(|fen| Position::try_from(*fen).unwrap())
        .collect();
    group.throughput(Throughput::Elements(positions.len() as u64));
    group.bench_with_input(
        BenchmarkId::new("movegen", format!("{} positions", positions.len())),
        &positions,
        |b, positions| {
            b.iter(|| {
                for position in positions {
                    std::hint::black_box(position.generate_moves());
                }
            });
        },
    );
    // Reference point: shakmaty skips the attack info computed here, so being
    // slower is fine.
    let reference: Vec<Chess> = POSITIONS
        .iter()
        .map(|fen| {
            fen.parse::<shakmaty::fen::Fen>()
                .unwrap()
                .into_position(CastlingMode::Standard)
                .unwrap()
        })
        .collect();
    group.bench_with_input(
        BenchmarkId::new("movegen_reference_shakmaty", format!("{} positions", reference.len())),
        &reference,
        |b, positions| {
            b.iter(|| {
                for position in positions {
                    std::hint::black_box(position.legal_moves());
                }
            });
        },
    );
    group.finish();
}

// This acts both as performance and correctness test.
fn perft_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("perft");
    for (fen, depth, nodes) in [
        (POSITIONS[0], 4, 197_281),
        (POSITIONS[1], 3, 97_862),
        (POSITIONS[2], 5, 674_624),
    ] {
        let position = Position::try_from(fen).unwrap();
        group.throughput(Throughput::Elements(nodes));
        group.bench_with_input(
            BenchmarkId::new("perft", format!("{position}, depth {depth}")),
            &depth,
            |b, &depth| {
                b.iter(|| {
                    assert_eq!(perft(&position, depth), nodes);
                });
            },
        );
    }
    group.finish();
}

fn inference_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("Inference");
    let position = Position::try_from(POSITIONS[1]).unwrap();
    let occupancy = position.occupancy();
    let moved = |from: Square, to: Square| {
        Delta::between(
            occupancy,
            (occupancy - Bitboard::from(from)) | Bitboard::from(to),
        )
    };
    let castled = Delta::between(
        occupancy,
        (occupancy - Bitboard::from_squares(&[Square::E1, Square::H1]))
            | Bitboard::from_squares(&[Square::G1, Square::F1]),
    );
    let deltas = [
        moved(Square::A2, Square::A3),
        moved(Square::E5, Square::F7),
        moved(Square::E1, Square::G1),
        castled,
    ];
    group.throughput(Throughput::Elements(deltas.len() as u64));
    group.bench_function("infer", |b| {
        b.iter(|| {
            for delta in &deltas {
                std::hint::black_box(infer(delta, delta.vacated, &position));
            }
        });
    });
    group.finish();
}

criterion_group! {
    name = movegen;
    config = Criterion::default().sample_size(100);
    targets = movegen_bench, inference_bench
}

criterion_group! {
    name = perft_group;
    config = Criterion::default().sample_size(10);
    targets = perft_bench
}

criterion_main!(movegen, perft_group);
