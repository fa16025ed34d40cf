use rayon::prelude::*;
use std::sync::OnceLock;
use tracing::{debug, info};

use super::activity::{expand_frontier, prune_dead_chunks};
use super::arena::ChunkArena;
use super::chunk::{
    BorderFrame, Chunk, DEFAULT_CHUNK_SIZE, Direction, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE,
};
use super::coord::{ChunkCoord, chunk_coord_of, local_coord_of};
use super::error::{BoardError, InvariantViolation};
use super::sync::gather_border;
use super::view::ChunkView;

/// Below this many slots the border exchange and transition run serially.
const PARALLEL_MIN_CHUNKS: usize = 32;
const THREADS_ENV: &str = "CHUNK_LIFE_THREADS";

static PHYSICAL_CORES: OnceLock<usize> = OnceLock::new();

#[inline]
fn physical_core_count() -> usize {
    *PHYSICAL_CORES.get_or_init(|| num_cpus::get_physical().max(1))
}

fn threads_from_env_value(value: Option<&str>) -> Option<usize> {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
}

/// Resolve the thread count from a config, falling back to the environment and
/// then to the physical core count.
fn resolve_thread_count(config: &BoardConfig) -> usize {
    let mut threads = config
        .thread_count
        .or_else(|| threads_from_env_value(std::env::var(THREADS_ENV).ok().as_deref()))
        .unwrap_or_else(physical_core_count);
    if let Some(cap) = config.max_threads {
        threads = threads.min(cap);
    }
    threads.max(1)
}

/// Configuration for a `GameBoard`.
///
/// `BoardConfig::default()` gives 64×64 chunks and an auto-sized pool.
#[derive(Clone, Debug)]
pub struct BoardConfig {
    /// Chunk edge length K, in `MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE`.
    pub chunk_size: usize,
    /// Number of threads for the compute pool.
    /// `None` reads `CHUNK_LIFE_THREADS`, then falls back to physical cores.
    pub thread_count: Option<usize>,
    /// Hard upper bound on threads regardless of auto-detection.
    pub max_threads: Option<usize>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            thread_count: None,
            max_threads: None,
        }
    }
}

impl BoardConfig {
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set an explicit thread count for the compute pool.
    pub fn thread_count(mut self, n: usize) -> Self {
        self.thread_count = Some(n.max(1));
        self
    }

    /// Set a hard upper bound on threads.
    pub fn max_threads(mut self, n: usize) -> Self {
        self.max_threads = Some(n.max(1));
        self
    }

    pub fn validate(&self) -> Result<(), BoardError> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(BoardError::InvalidChunkSize {
                size: self.chunk_size,
                min: MIN_CHUNK_SIZE,
                max: MAX_CHUNK_SIZE,
            });
        }
        Ok(())
    }
}

/// Chunk churn of one generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    pub pruned: usize,
    pub spawned: usize,
    /// Allocated chunks after the tick.
    pub chunks: usize,
}

fn exchange_borders(arena: &mut ChunkArena) {
    let ChunkArena { chunks, frames, .. } = arena;
    let slots: &[Option<Chunk>] = chunks;
    let gather = |slot: &Option<Chunk>| slot.as_ref().map(|c| gather_border(c, slots));
    let install = |(slot, frame): (&mut Option<Chunk>, &Option<BorderFrame>)| {
        if let (Some(chunk), Some(frame)) = (slot.as_mut(), frame) {
            chunk.read_in_border(frame);
        }
    };

    if slots.len() < PARALLEL_MIN_CHUNKS {
        frames.clear();
        frames.extend(slots.iter().map(gather));
        chunks.iter_mut().zip(frames.iter()).for_each(install);
    } else {
        slots.par_iter().map(gather).collect_into_vec(frames);
        chunks.par_iter_mut().zip(frames.par_iter()).for_each(install);
    }
}

fn advance_chunks(arena: &mut ChunkArena) {
    let advance = |slot: &mut Option<Chunk>| {
        if let Some(chunk) = slot.as_mut() {
            chunk.process_next_state();
        }
    };
    if arena.chunks.len() < PARALLEL_MIN_CHUNKS {
        arena.chunks.iter_mut().for_each(advance);
    } else {
        arena.chunks.par_iter_mut().for_each(advance);
    }
}

fn tick(arena: &mut ChunkArena) -> TickStats {
    let pruned = prune_dead_chunks(arena);
    let spawned = expand_frontier(arena);
    exchange_borders(arena);
    advance_chunks(arena);
    TickStats {
        pruned,
        spawned,
        chunks: arena.len(),
    }
}

/// Sparse chunked Life board over the full `i32` plane.
pub struct GameBoard {
    arena: ChunkArena,
    generation: u64,
    chunk_size: usize,
    pool: rayon::ThreadPool,
}

impl Default for GameBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl GameBoard {
    pub fn new() -> Self {
        Self::with_config(BoardConfig::default()).expect("failed to build default game board")
    }

    /// Create a board with explicit configuration.
    pub fn with_config(config: BoardConfig) -> Result<Self, BoardError> {
        config.validate()?;
        let threads = resolve_thread_count(&config);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("chunk-life-{i}"))
            .build()?;
        info!(chunk_size = config.chunk_size, threads, "game board ready");

        Ok(Self {
            arena: ChunkArena::new(config.chunk_size),
            generation: 0,
            chunk_size: config.chunk_size,
            pool,
        })
    }

    pub fn set_point(&mut self, x: i32, y: i32, value: bool) {
        let coord = chunk_coord_of(x, y, self.chunk_size);
        let idx = if value {
            self.arena.allocate(coord)
        } else {
            match self.arena.idx_at(coord) {
                Some(existing) => existing,
                None => return,
            }
        };
        let (lx, ly) = local_coord_of(x, y, self.chunk_size);
        self.arena.chunk_mut(idx).set_cell(lx, ly, value);
    }

    /// Batch form of `set_point`.
    pub fn set_points<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (i32, i32, bool)>,
    {
        for (x, y, value) in cells {
            self.set_point(x, y, value);
        }
    }

    pub fn set_points_alive<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        self.set_points(cells.into_iter().map(|(x, y)| (x, y, true)));
    }

    /// Never allocates. Cells outside every chunk are dead.
    pub fn get_point(&self, x: i32, y: i32) -> bool {
        let Some(idx) = self.arena.idx_at(chunk_coord_of(x, y, self.chunk_size)) else {
            return false;
        };
        let (lx, ly) = local_coord_of(x, y, self.chunk_size);
        self.arena.chunk(idx).get_cell(lx, ly)
    }

    /// Advance one generation: prune, expand, exchange borders, transition.
    pub fn update(&mut self) -> TickStats {
        let Self { arena, pool, .. } = self;
        let stats = pool.install(|| tick(arena));
        self.generation += 1;
        debug!(
            generation = self.generation,
            pruned = stats.pruned,
            spawned = stats.spawned,
            chunks = stats.chunks,
            "tick"
        );

        if cfg!(debug_assertions) {
            if let Err(violation) = self.check_invariants() {
                panic!("generation {}: {violation}", self.generation);
            }
        }
        stats
    }

    pub fn step_n(&mut self, n: u64) {
        for _ in 0..n {
            self.update();
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_count(&self) -> usize {
        self.arena.len()
    }

    pub fn contains_chunk(&self, coord: ChunkCoord) -> bool {
        self.arena.coord_to_idx.contains(coord)
    }

    /// Snapshot views of every allocated chunk, in storage order.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkView<'_>> + '_ {
        self.arena
            .iter()
            .map(|(idx, chunk)| ChunkView::new(self.arena.coord(idx), chunk))
    }

    /// `(min_cx, min_cy, max_cx, max_cy)` over allocated chunks.
    pub fn chunk_bounds(&self) -> Option<(i32, i32, i32, i32)> {
        self.arena
            .iter()
            .map(|(idx, _)| self.arena.coord(idx))
            .fold(None, |acc, (cx, cy)| match acc {
                None => Some((cx, cy, cx, cy)),
                Some((x0, y0, x1, y1)) => Some((x0.min(cx), y0.min(cy), x1.max(cx), y1.max(cy))),
            })
    }

    pub fn population(&self) -> u64 {
        self.arena
            .iter()
            .map(|(_, chunk)| chunk.population() as u64)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.iter().all(|(_, chunk)| !chunk.has_live_cells())
    }

    pub fn bounds(&self) -> Option<(i32, i32, i32, i32)> {
        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;
        let mut seen = false;

        self.for_each_live(|x, y| {
            seen = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        });

        seen.then_some((min_x, min_y, max_x, max_y))
    }

    pub fn for_each_live<F: FnMut(i32, i32)>(&self, mut f: F) {
        for view in self.chunks() {
            view.for_each_live(&mut f);
        }
    }

    /// Walk the whole mesh and report the first broken invariant.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let arena = &self.arena;

        for (coord, idx) in arena.coord_to_idx.iter() {
            if arena.get(idx).is_none() || arena.coord(idx) != coord {
                return Err(InvariantViolation::MapMismatch { chunk: coord });
            }
        }

        for (idx, chunk) in arena.iter() {
            let coord = arena.coord(idx);
            if arena.idx_at(coord) != Some(idx) {
                return Err(InvariantViolation::MapMismatch { chunk: coord });
            }
            if !arena.in_plane(coord) {
                return Err(InvariantViolation::OutsidePlane { chunk: coord });
            }
            if chunk.is_empty() && chunk.has_live_cells() {
                return Err(InvariantViolation::StaleEmptyFlag { chunk: coord });
            }

            for direction in Direction::ALL {
                let (dx, dy) = direction.offset();
                let adjacent = (coord.0 + dx, coord.1 + dy);
                match chunk.neighbor(direction) {
                    Some(n) => {
                        let Some(neighbor) = arena.get(n) else {
                            return Err(InvariantViolation::DanglingLink {
                                chunk: coord,
                                direction,
                            });
                        };
                        let neighbor_coord = arena.coord(n);
                        if neighbor_coord != adjacent {
                            return Err(InvariantViolation::MisplacedLink {
                                chunk: coord,
                                neighbor: neighbor_coord,
                                direction,
                            });
                        }
                        if neighbor.neighbor(direction.reverse()) != Some(idx) {
                            return Err(InvariantViolation::AsymmetricLink {
                                chunk: coord,
                                neighbor: neighbor_coord,
                                direction,
                            });
                        }
                    }
                    None => {
                        if arena.idx_at(adjacent).is_some() {
                            return Err(InvariantViolation::UnlinkedNeighbor {
                                chunk: coord,
                                neighbor: adjacent,
                                direction,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use super::{
        BoardConfig, GameBoard, TickStats, physical_core_count, threads_from_env_value,
    };
    use crate::chunklife::chunk::{ChunkFlags, Direction};
    use crate::chunklife::error::{BoardError, InvariantViolation};

    fn board(chunk_size: usize) -> GameBoard {
        GameBoard::with_config(BoardConfig::default().chunk_size(chunk_size).thread_count(2))
            .expect("valid config")
    }

    fn origin_flags(board: &GameBoard) -> Option<ChunkFlags> {
        board
            .arena
            .idx_at((0, 0))
            .map(|idx| board.arena.chunk(idx).flags())
    }

    #[test]
    fn default_pool_uses_physical_cores_without_override() {
        if std::env::var("CHUNK_LIFE_THREADS").is_ok() {
            return;
        }
        let board = GameBoard::new();
        assert_eq!(board.pool.current_num_threads(), physical_core_count());
        assert_eq!(board.chunk_size(), 64);
    }

    #[test]
    fn max_threads_caps_explicit_count() {
        let board = GameBoard::with_config(BoardConfig::default().thread_count(8).max_threads(3))
            .expect("valid config");
        assert_eq!(board.pool.current_num_threads(), 3);
    }

    #[test]
    fn env_thread_values_must_be_positive_integers() {
        assert_eq!(threads_from_env_value(Some("6")), Some(6));
        assert_eq!(threads_from_env_value(Some(" 2 ")), Some(2));
        assert_eq!(threads_from_env_value(Some("0")), None);
        assert_eq!(threads_from_env_value(Some("many")), None);
        assert_eq!(threads_from_env_value(None), None);
    }

    #[test]
    fn invalid_chunk_sizes_are_rejected() {
        for size in [0, 3, 127, 1024] {
            match GameBoard::with_config(BoardConfig::default().chunk_size(size)) {
                Err(BoardError::InvalidChunkSize { size: got, min, max }) => {
                    assert_eq!((got, min, max), (size, 4, 126));
                }
                Err(other) => panic!("unexpected error {other}"),
                Ok(_) => panic!("chunk size {size} accepted"),
            }
        }
    }

    #[test]
    fn empty_board_advances_generation() {
        let mut board = board(8);
        assert_eq!(board.generation(), 0);
        assert_eq!(board.update(), TickStats::default());
        assert_eq!(board.generation(), 1);
        assert_eq!(board.population(), 0);
        assert!(board.is_empty());
    }

    #[test]
    fn is_empty_ignores_allocated_dead_chunks() {
        let mut board = board(8);
        assert!(board.is_empty());
        board.set_point(3, 3, true);
        assert!(!board.is_empty());
        board.set_point(3, 3, false);
        assert_eq!(board.chunk_count(), 1);
        assert!(board.is_empty());
    }

    #[test]
    fn dead_write_into_unallocated_territory_allocates_nothing() {
        let mut board = board(8);
        board.set_point(100, -100, false);
        assert_eq!(board.chunk_count(), 0);
        assert!(!board.get_point(100, -100));
        assert_eq!(board.chunk_count(), 0);
    }

    #[test]
    fn live_write_links_existing_neighbors() {
        let mut board = board(8);
        board.set_point(0, 0, true);
        board.set_point(8, 8, true);
        let centre = board.arena.idx_at((0, 0)).expect("allocated");
        let corner = board.arena.idx_at((1, 1)).expect("allocated");
        assert_eq!(board.arena.chunk(centre).neighbor(Direction::UpRight), Some(corner));
        assert_eq!(board.arena.chunk(corner).neighbor(Direction::DownLeft), Some(centre));
        board.check_invariants().expect("mesh is consistent");
    }

    #[test]
    fn first_tick_grows_ring_around_live_chunk() {
        let mut board = board(16);
        board.set_point(5, 5, true);
        let stats = board.update();
        assert_eq!(stats.spawned, 8);
        assert_eq!(stats.pruned, 0);
        assert_eq!(stats.chunks, 9);
    }

    #[test]
    fn dead_board_converges_to_zero_chunks() {
        let mut board = board(8);
        board.set_points_alive([(0, 0), (100, 100), (-50, 30)]);
        for _ in 0..8 {
            board.update();
        }
        assert_eq!(board.chunk_count(), 0);
        assert_eq!(board.chunk_bounds(), None);
        for _ in 0..4 {
            assert_eq!(board.update().chunks, 0);
        }
    }

    #[test]
    fn glider_vacates_and_prunes_origin_chunk() {
        let mut board = board(8);
        board.set_points_alive([(1, 2), (2, 1), (0, 0), (1, 0), (2, 0)]);

        let mut observed = false;
        for _ in 0..200 {
            board.update();
            let Some(flags) = origin_flags(&board) else {
                continue;
            };
            if flags.contains(ChunkFlags::EMPTY | ChunkFlags::ALL_BORDERS_EMPTY) {
                observed = true;
                let stats = board.update();
                assert!(stats.pruned >= 1);
                assert!(!board.contains_chunk((0, 0)));
                break;
            }
        }
        assert!(observed, "origin chunk never became prunable");
        assert_eq!(board.population(), 5);
    }

    #[test]
    fn tick_pipeline_keeps_invariants_on_random_soup() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed_c0de);
        let mut board = board(8);
        for _ in 0..600 {
            let x = rng.random_range(-40..40);
            let y = rng.random_range(-40..40);
            board.set_point(x, y, true);
        }
        for _ in 0..30 {
            board.update();
            board.check_invariants().expect("mesh is consistent");
        }
    }

    #[test]
    fn corrupted_link_is_reported() {
        let mut board = board(8);
        board.set_point(0, 0, true);
        board.set_point(8, 0, true);
        let left = board.arena.idx_at((0, 0)).expect("allocated");
        board.arena.chunk_mut(left).neighbors[Direction::Right.index()] = None;
        assert_eq!(
            board.check_invariants(),
            Err(InvariantViolation::UnlinkedNeighbor {
                chunk: (0, 0),
                neighbor: (1, 0),
                direction: Direction::Right,
            })
        );
    }

    #[test]
    fn bounds_track_live_cells_not_chunks() {
        let mut board = board(16);
        board.set_points_alive([(-3, 7), (20, -1)]);
        assert_eq!(board.bounds(), Some((-3, -1, 20, 7)));
        assert_eq!(board.chunk_bounds(), Some((-1, -1, 1, 0)));
        board.set_point(-3, 7, false);
        assert_eq!(board.bounds(), Some((20, -1, 20, -1)));
        assert_eq!(board.chunk_bounds(), Some((-1, -1, 1, 0)));
    }
}
