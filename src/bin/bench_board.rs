#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use chunk_life::{BoardConfig, GameBoard, TickStats};
use rand::RngCore;
use rand::SeedableRng;
use std::env;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scenario {
    /// Random soup over a square.
    Soup,
    /// A diagonal fleet of gliders: constant chunk creation and pruning.
    Gliders,
}

#[derive(Clone, Debug)]
struct BenchConfig {
    scenario: Scenario,
    size: i32,
    chunk_size: usize,
    threads: Option<usize>,
    density: f64,
    warmup: u64,
    iters: u64,
    seed: u64,
    json: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::Soup,
            size: 1024,
            chunk_size: 64,
            threads: None,
            density: 0.42,
            warmup: 3,
            iters: 50,
            seed: 0x5EED_1234_ABCD_EF01,
            json: false,
        }
    }
}

fn parse_args() -> BenchConfig {
    let mut cfg = BenchConfig::default();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--scenario" => {
                if let Some(v) = args.next() {
                    cfg.scenario = match v.as_str() {
                        "soup" => Scenario::Soup,
                        "gliders" => Scenario::Gliders,
                        other => panic!("unknown scenario: {other} (expected soup|gliders)"),
                    };
                }
            }
            "--size" => {
                if let Some(v) = args.next() {
                    cfg.size = v.parse().expect("--size expects i32");
                }
            }
            "--chunk-size" => {
                if let Some(v) = args.next() {
                    cfg.chunk_size = v.parse().expect("--chunk-size expects usize");
                }
            }
            "--threads" => {
                if let Some(v) = args.next() {
                    cfg.threads = Some(v.parse().expect("--threads expects usize"));
                }
            }
            "--density" => {
                if let Some(v) = args.next() {
                    cfg.density = v.parse().expect("--density expects f64");
                }
            }
            "--warmup" => {
                if let Some(v) = args.next() {
                    cfg.warmup = v.parse().expect("--warmup expects u64");
                }
            }
            "--iters" => {
                if let Some(v) = args.next() {
                    cfg.iters = v.parse().expect("--iters expects u64");
                }
            }
            "--seed" => {
                if let Some(v) = args.next() {
                    cfg.seed = if let Some(hex) = v.strip_prefix("0x") {
                        u64::from_str_radix(hex, 16).expect("--seed hex parse failed")
                    } else {
                        v.parse().expect("--seed expects u64")
                    };
                }
            }
            "--json" => {
                cfg.json = true;
            }
            other => panic!("unknown arg: {other}"),
        }
    }
    cfg
}

fn seed_soup(board: &mut GameBoard, size: i32, density: f64, seed: u64) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let threshold = (u64::MAX as f64 * density) as u64;
    let mut cells = Vec::new();
    for y in 0..size {
        for x in 0..size {
            if rng.next_u64() <= threshold {
                cells.push((x, y));
            }
        }
    }
    board.set_points_alive(cells);
}

fn seed_gliders(board: &mut GameBoard, size: i32) {
    const GLIDER: [(i32, i32); 5] = [(1, 0), (2, -1), (0, -2), (1, -2), (2, -2)];
    let spacing = 24;
    for i in 0..(size / spacing).max(1) {
        let (ox, oy) = (i * spacing, i * spacing);
        board.set_points_alive(GLIDER.iter().map(|&(x, y)| (ox + x, oy + y)));
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = parse_args();
    let mut config = BoardConfig::default().chunk_size(cfg.chunk_size);
    if let Some(threads) = cfg.threads {
        config = config.thread_count(threads);
    }
    let mut board = match GameBoard::with_config(config) {
        Ok(board) => board,
        Err(err) => {
            eprintln!("bench_board: {err}");
            std::process::exit(2);
        }
    };

    match cfg.scenario {
        Scenario::Soup => seed_soup(&mut board, cfg.size, cfg.density, cfg.seed),
        Scenario::Gliders => seed_gliders(&mut board, cfg.size),
    }

    board.step_n(cfg.warmup);

    let mut churn = TickStats::default();
    let start = Instant::now();
    for _ in 0..cfg.iters {
        let stats = board.update();
        churn.pruned += stats.pruned;
        churn.spawned += stats.spawned;
        churn.chunks = stats.chunks;
    }
    let elapsed = start.elapsed();
    let total_ms = elapsed.as_secs_f64() * 1000.0;
    let avg_ms = total_ms / cfg.iters.max(1) as f64;
    let population = board.population();

    if cfg.json {
        println!(
            "{{\"scenario\":\"{:?}\",\"size\":{},\"chunk_size\":{},\"iters\":{},\"total_ms\":{:.6},\"avg_ms\":{:.6},\"population\":{},\"chunks\":{},\"spawned\":{},\"pruned\":{}}}",
            cfg.scenario, cfg.size, cfg.chunk_size, cfg.iters, total_ms, avg_ms, population,
            churn.chunks, churn.spawned, churn.pruned,
        );
    } else {
        println!(
            "scenario={:?},size={},chunk_size={},iters={},total_ms={:.6},avg_ms={:.6},population={},chunks={},spawned={},pruned={}",
            cfg.scenario, cfg.size, cfg.chunk_size, cfg.iters, total_ms, avg_ms, population,
            churn.chunks, churn.spawned, churn.pruned,
        );
    }
}
