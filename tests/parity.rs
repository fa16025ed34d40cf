use std::collections::HashSet;

use chunk_life::{BoardConfig, GameBoard};
use rand::RngCore;
use rand::SeedableRng;

fn collect_live(board: &GameBoard) -> HashSet<(i32, i32)> {
    let mut out = HashSet::new();
    board.for_each_live(|x, y| {
        out.insert((x, y));
    });
    out
}

fn seed_soup(width: i32, height: i32, density: f64, seed: u64) -> Vec<(i32, i32)> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let threshold = (u64::MAX as f64 * density) as u64;
    let mut cells = Vec::new();
    for y in -(height / 2)..=(height / 2) {
        for x in -(width / 2)..=(width / 2) {
            if rng.next_u64() <= threshold {
                cells.push((x, y));
            }
        }
    }
    cells
}

fn run(config: BoardConfig, cells: &[(i32, i32)], steps: u64) -> (u64, HashSet<(i32, i32)>) {
    let mut board = GameBoard::with_config(config).expect("valid board config");
    board.set_points_alive(cells.iter().copied());
    board.step_n(steps);
    (board.population(), collect_live(&board))
}

fn run_parity_case(width: i32, height: i32, density: f64, steps: u64, seed: u64) {
    let cells = seed_soup(width, height, density, seed);
    let reference = run(
        BoardConfig::default().chunk_size(64).thread_count(1),
        &cells,
        steps,
    );

    for size in [4, 8, 16, 37, 126] {
        for threads in [1, 4] {
            let config = BoardConfig::default().chunk_size(size).thread_count(threads);
            let (population, live) = run(config, &cells, steps);
            assert_eq!(
                population, reference.0,
                "population mismatch for size {size} threads {threads} density {density} seed {seed}"
            );
            assert_eq!(
                live, reference.1,
                "live-set mismatch for size {size} threads {threads} density {density} seed {seed}"
            );
        }
    }
}

#[test]
fn parity_sparse_mid_dense() {
    run_parity_case(96, 96, 0.10, 6, 0xA1);
    run_parity_case(96, 96, 0.42, 6, 0xB2);
    run_parity_case(96, 96, 0.83, 4, 0xC3);
}

#[test]
fn parity_multiple_seeds() {
    for seed in [11u64, 22, 33, 44] {
        run_parity_case(72, 72, 0.35, 7, seed);
    }
}

#[test]
fn parity_long_run_small_chunks() {
    // Many small chunks keep every pass on its parallel path.
    let cells = seed_soup(160, 160, 0.3, 0xD37E_A515);
    let serial = run(BoardConfig::default().chunk_size(4).thread_count(1), &cells, 40);
    let parallel = run(BoardConfig::default().chunk_size(4).thread_count(4), &cells, 40);
    assert_eq!(serial, parallel);

    let wide = run(BoardConfig::default().chunk_size(64).thread_count(2), &cells, 40);
    assert_eq!(serial, wide);
}
