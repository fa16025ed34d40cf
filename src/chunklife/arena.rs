//! Chunk arena: slot storage, coordinate index, and the neighbor mesh.
//!
//! Chunks live in `Vec<Option<Chunk>>` slots addressed by `ChunkIdx`. Released
//! slots go on a free list and are reused. All link mutation happens here:
//! `allocate_absent` links a new chunk both ways to every present neighbor and
//! `release` severs all 8 links before the slot is freed.
//!
//! Chunks are only created inside the `i32` plane. Edge chunks get clipped so
//! cells past the plane stay dead.

use std::ops::RangeInclusive;

use tracing::trace;

use super::chunk::{BorderFrame, Chunk, ChunkIdx, Direction};
use super::chunkmap::ChunkMap;
use super::coord::{ChunkCoord, plane_chunk_range, plane_clip};

const INITIAL_CHUNK_CAPACITY: usize = 64;

pub struct ChunkArena {
    size: usize,
    plane: RangeInclusive<i32>,
    pub chunks: Vec<Option<Chunk>>,
    pub coords: Vec<ChunkCoord>,
    pub coord_to_idx: ChunkMap,
    pub free_list: Vec<ChunkIdx>,
    /// Per-slot border frames for the current tick.
    pub frames: Vec<Option<BorderFrame>>,
    pub prune_buf: Vec<ChunkIdx>,
    pub expand_buf: Vec<ChunkCoord>,
}

impl ChunkArena {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            plane: plane_chunk_range(size),
            chunks: Vec::with_capacity(INITIAL_CHUNK_CAPACITY),
            coords: Vec::with_capacity(INITIAL_CHUNK_CAPACITY),
            coord_to_idx: ChunkMap::with_capacity(INITIAL_CHUNK_CAPACITY),
            free_list: Vec::new(),
            frames: Vec::new(),
            prune_buf: Vec::new(),
            expand_buf: Vec::new(),
        }
    }

    /// Number of live chunks.
    #[inline]
    pub fn len(&self) -> usize {
        self.coord_to_idx.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coord_to_idx.is_empty()
    }

    /// Whether a chunk at `coord` would hold any `i32` cell.
    #[inline]
    pub fn in_plane(&self, coord: ChunkCoord) -> bool {
        self.plane.contains(&coord.0) && self.plane.contains(&coord.1)
    }

    #[inline]
    pub fn idx_at(&self, coord: ChunkCoord) -> Option<ChunkIdx> {
        self.coord_to_idx.get(coord)
    }

    #[inline]
    pub fn get(&self, idx: ChunkIdx) -> Option<&Chunk> {
        self.chunks.get(idx.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, idx: ChunkIdx) -> Option<&mut Chunk> {
        self.chunks.get_mut(idx.index()).and_then(Option::as_mut)
    }

    #[inline]
    pub fn coord(&self, idx: ChunkIdx) -> ChunkCoord {
        self.coords[idx.index()]
    }

    /// The chunk behind a handle the arena itself handed out.
    ///
    /// Panics on a released slot: a stale handle means the mesh is corrupt.
    #[inline]
    pub fn chunk(&self, idx: ChunkIdx) -> &Chunk {
        self.get(idx)
            .unwrap_or_else(|| panic!("chunk handle {idx:?} points at a released slot"))
    }

    #[inline]
    pub fn chunk_mut(&mut self, idx: ChunkIdx) -> &mut Chunk {
        self.get_mut(idx)
            .unwrap_or_else(|| panic!("chunk handle {idx:?} points at a released slot"))
    }

    /// Live chunks with their handles, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ChunkIdx, &Chunk)> + '_ {
        self.chunks
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|c| (ChunkIdx(i as u32), c)))
    }

    fn allocate_slot(&mut self, coord: ChunkCoord) -> ChunkIdx {
        let mut chunk = Chunk::new(self.size);
        if let Some((columns, rows)) = plane_clip(coord, self.size) {
            chunk.clip_to(columns, rows);
        }
        if let Some(recycled) = self.free_list.pop() {
            let i = recycled.index();
            debug_assert!(self.chunks[i].is_none());
            self.chunks[i] = Some(chunk);
            self.coords[i] = coord;
            recycled
        } else {
            let idx = ChunkIdx(
                u32::try_from(self.chunks.len()).expect("chunk arena exceeded u32 slots"),
            );
            self.chunks.push(Some(chunk));
            self.coords.push(coord);
            idx
        }
    }

    fn link_neighbors(&mut self, idx: ChunkIdx, coord: ChunkCoord) {
        for dir in Direction::ALL {
            let (dx, dy) = dir.offset();
            let Some(neighbor) = self.coord_to_idx.get((coord.0 + dx, coord.1 + dy)) else {
                continue;
            };
            self.chunk_mut(idx).neighbors[dir.index()] = Some(neighbor);
            self.chunk_mut(neighbor).neighbors[dir.reverse().index()] = Some(idx);
        }
    }

    /// Create a chunk at a coordinate known to be free and wire it into the mesh.
    pub fn allocate_absent(&mut self, coord: ChunkCoord) -> ChunkIdx {
        debug_assert!(self.coord_to_idx.get(coord).is_none());
        assert!(self.in_plane(coord), "chunk {coord:?} lies outside the i32 plane");
        let idx = self.allocate_slot(coord);
        self.coord_to_idx.insert(coord, idx);
        self.link_neighbors(idx, coord);
        trace!(cx = coord.0, cy = coord.1, slot = idx.0, "chunk created");
        idx
    }

    /// Idempotent get-or-create.
    pub fn allocate(&mut self, coord: ChunkCoord) -> ChunkIdx {
        match self.idx_at(coord) {
            Some(existing) => existing,
            None => self.allocate_absent(coord),
        }
    }

    /// Sever every link of `idx`, then drop the chunk and free its slot.
    pub fn release(&mut self, idx: ChunkIdx) {
        let Some(chunk) = self.chunks.get_mut(idx.index()).and_then(Option::take) else {
            return;
        };
        for dir in Direction::ALL {
            if let Some(neighbor) = chunk.neighbors[dir.index()] {
                self.chunk_mut(neighbor).neighbors[dir.reverse().index()] = None;
            }
        }
        let coord = self.coords[idx.index()];
        self.coord_to_idx.remove(coord);
        self.free_list.push(idx);
        trace!(cx = coord.0, cy = coord.1, slot = idx.0, "chunk released");
    }
}
