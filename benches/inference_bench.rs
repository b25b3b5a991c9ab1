use std::collections::BTreeSet;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tilewatch::board::{Board, Coord, Language, Tile};
use tilewatch::game::moves::score_word;
use tilewatch::inference::{classify, diff, reachable_candidates, Classification};

/// A plausible mid-game board: a dozen interlocking words, about 60
/// tiles around the center.
fn midgame_board() -> Board {
    let mut board = Board::new();
    let words: &[(u8, u8, bool, &str)] = &[
        (3, 7, true, "FIRNS"),
        (4, 6, false, "VITEN"),
        (0, 7, true, "SAU"),
        (7, 7, false, "SONATE"),
        (5, 9, true, "BREITEN"),
        (9, 4, false, "GERADE"),
        (6, 11, true, "MAUER"),
        (11, 6, true, "HOLE"),
        (2, 3, false, "KLEID"),
        (10, 9, true, "ZIER"),
        (1, 11, true, "DORN"),
        (12, 1, false, "WEIN"),
    ];
    for &(col, row, horizontal, word) in words {
        for (i, letter) in word.chars().enumerate() {
            let coord = if horizontal {
                Coord::new(col + i as u8, row)
            } else {
                Coord::new(col, row + i as u8)
            };
            board.insert(coord, Tile::new(letter, 85));
        }
    }
    board
}

fn observed_with_placement(previous: &Board) -> Board {
    let mut observed = previous.clone();
    for (i, letter) in "QUARZ".chars().enumerate() {
        observed.insert(Coord::new(3 + i as u8, 13), Tile::new(letter, 82));
    }
    observed
}

fn bench_diff_and_classify(c: &mut Criterion) {
    let previous = midgame_board();
    let observed = observed_with_placement(&previous);

    c.bench_function("diff_midgame", |b| {
        b.iter(|| diff(black_box(observed.clone()), black_box(&previous)))
    });

    let result = diff(observed, &previous);
    c.bench_function("classify_midgame", |b| {
        b.iter(|| classify(black_box(&result.board), black_box(&result.new_tiles)))
    });

    let Classification::Word(placement) = classify(&result.board, &result.new_tiles) else {
        panic!("benchmark placement did not classify");
    };
    c.bench_function("score_midgame", |b| {
        b.iter(|| {
            score_word(
                Language::German,
                black_box(&result.board),
                black_box(&result.new_tiles),
                black_box(&placement),
            )
        })
    });
}

fn bench_candidate_filter(c: &mut Criterion) {
    let board = midgame_board();
    let candidates: BTreeSet<Coord> = board.coords().collect();
    c.bench_function("flood_fill_midgame", |b| {
        b.iter(|| {
            reachable_candidates(
                black_box(Coord::new(7, 7)),
                black_box(&candidates),
                black_box(&BTreeSet::new()),
            )
        })
    });
}

criterion_group!(benches, bench_diff_and_classify, bench_candidate_filter);
criterion_main!(benches);
