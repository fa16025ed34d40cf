use thiserror::Error;

use super::chunk::Direction;
use super::coord::ChunkCoord;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("chunk size {size} outside supported range {min}..={max}")]
    InvalidChunkSize { size: usize, min: usize, max: usize },
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A broken mesh or flag invariant. Always a bug in the board itself.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("chunk {chunk:?} links {direction:?} to a released slot")]
    DanglingLink {
        chunk: ChunkCoord,
        direction: Direction,
    },
    #[error("chunk {chunk:?} links {direction:?} to {neighbor:?}, which does not link back")]
    AsymmetricLink {
        chunk: ChunkCoord,
        neighbor: ChunkCoord,
        direction: Direction,
    },
    #[error("chunk {chunk:?} links {direction:?} to non-adjacent chunk {neighbor:?}")]
    MisplacedLink {
        chunk: ChunkCoord,
        neighbor: ChunkCoord,
        direction: Direction,
    },
    #[error("chunk {chunk:?} has no {direction:?} link although {neighbor:?} exists")]
    UnlinkedNeighbor {
        chunk: ChunkCoord,
        neighbor: ChunkCoord,
        direction: Direction,
    },
    #[error("chunk {chunk:?} is flagged EMPTY but has live cells")]
    StaleEmptyFlag { chunk: ChunkCoord },
    #[error("chunk {chunk:?} lies outside the i32 plane")]
    OutsidePlane { chunk: ChunkCoord },
    #[error("chunk map and slot storage disagree at {chunk:?}")]
    MapMismatch { chunk: ChunkCoord },
}
