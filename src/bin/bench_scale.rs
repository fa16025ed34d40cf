#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use chunk_life::{BoardConfig, GameBoard};
use rand::RngCore;
use rand::SeedableRng;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn bench_board(size: i32, chunk_size: usize, density: f64, iterations: u64) -> (f64, usize) {
    let mut board = GameBoard::with_config(BoardConfig::default().chunk_size(chunk_size))
        .expect("benchmark chunk sizes are valid");
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED_1234_ABCD_EF01);
    let threshold = (u64::MAX as f64 * density) as u64;

    for y in 0..size {
        for x in 0..size {
            if rng.next_u64() <= threshold {
                board.set_point(x, y, true);
            }
        }
    }

    let start = Instant::now();
    board.step_n(iterations);
    let duration = start.elapsed();

    (duration.as_secs_f64() * 1000.0, board.chunk_count())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let scales: &[(i32, u64)] = &[
        (128, 100), // few chunks, serial passes
        (256, 100),
        (512, 50),
        (1024, 20),
        (2048, 10),
    ];

    println!(
        "{:<10} {:>6} {:>8} {:>8} {:>12} {:>10}",
        "Grid", "K", "Chunks", "Iters", "Total(ms)", "Avg(ms)"
    );
    println!("{}", "-".repeat(60));

    for &(size, iters) in scales {
        for chunk_size in [16, 64, 126] {
            let (total_ms, chunks) = bench_board(size, chunk_size, 0.42, iters);
            let avg_ms = total_ms / iters as f64;
            println!(
                "{:<10} {:>6} {:>8} {:>8} {:>12.1} {:>10.4}",
                format!("{}x{}", size, size),
                chunk_size,
                chunks,
                iters,
                total_ms,
                avg_ms
            );
        }
    }
}
