//! Sparse chunked Conway's Game of Life engine (B3/S23).
//!
//! Chunk internals are not part of the API:
//!
//! ```compile_fail
//! use chunk_life::chunklife::Chunk;
//! ```

mod chunklife;

pub use chunklife::{
    BoardConfig, BoardError, ChunkCoord, ChunkView, DEFAULT_CHUNK_SIZE, Direction, GameBoard,
    InvariantViolation, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE, Row, TickStats,
};
