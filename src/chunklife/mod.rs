//! Chunked Life engine internals and public API.
//!
//! Only the board-level types leave this module. Chunks, the arena, border
//! frames and the rule table stay crate-private.

mod activity;
mod arena;
mod chunk;
mod chunkmap;
mod coord;
mod engine;
mod error;
mod rules;
mod sync;
mod view;

pub use chunk::{DEFAULT_CHUNK_SIZE, Direction, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE, Row};
pub use coord::ChunkCoord;
pub use engine::{BoardConfig, GameBoard, TickStats};
pub use error::{BoardError, InvariantViolation};
pub use view::ChunkView;
