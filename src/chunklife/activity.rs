//! Prune and frontier-expansion passes.
//!
//! Both passes read flags written by the previous tick's border exchange and
//! transition. Candidate scans are read-only and go parallel for large
//! arenas; every release/create afterwards is serial, since those mutate the
//! coordinate map and the links of up to 8 other chunks.

use rayon::prelude::*;

use super::arena::ChunkArena;
use super::chunk::{Chunk, ChunkIdx, Direction};
use super::coord::ChunkCoord;

/// Below this many slots the candidate scans run serially.
const PARALLEL_SCAN_THRESHOLD: usize = 256;
const SCAN_CHUNK: usize = 256;

#[inline]
fn is_dead_region(chunk: &Chunk) -> bool {
    chunk.is_empty() && chunk.all_borders_empty()
}

#[inline]
fn is_frontier(chunk: &Chunk) -> bool {
    !chunk.is_empty() && chunk.has_missing_border()
}

fn scan_prune(slots: &[Option<Chunk>], base: usize, prune: &mut Vec<ChunkIdx>) {
    for (offset, slot) in slots.iter().enumerate() {
        if slot.as_ref().is_some_and(is_dead_region) {
            prune.push(ChunkIdx((base + offset) as u32));
        }
    }
}

fn scan_expand(
    slots: &[Option<Chunk>],
    coords: &[ChunkCoord],
    expand: &mut Vec<ChunkCoord>,
) {
    for (slot, &(cx, cy)) in slots.iter().zip(coords) {
        let Some(chunk) = slot.as_ref().filter(|c| is_frontier(c)) else {
            continue;
        };
        for dir in Direction::ALL {
            if chunk.neighbor(dir).is_none() {
                let (dx, dy) = dir.offset();
                expand.push((cx + dx, cy + dy));
            }
        }
    }
}

/// Remove every chunk flagged EMPTY and ALL_BORDERS_EMPTY. Returns the number
/// of chunks released.
pub fn prune_dead_chunks(arena: &mut ChunkArena) -> usize {
    arena.prune_buf.clear();

    if arena.chunks.len() < PARALLEL_SCAN_THRESHOLD {
        scan_prune(&arena.chunks, 0, &mut arena.prune_buf);
    } else {
        let results: Vec<Vec<ChunkIdx>> = arena
            .chunks
            .par_chunks(SCAN_CHUNK)
            .enumerate()
            .map(|(block, slots)| {
                let mut prune = Vec::new();
                scan_prune(slots, block * SCAN_CHUNK, &mut prune);
                prune
            })
            .collect();
        for prune in results {
            arena.prune_buf.extend(prune);
        }
    }

    for i in 0..arena.prune_buf.len() {
        let idx = arena.prune_buf[i];
        arena.release(idx);
    }
    arena.prune_buf.len()
}

/// Create every absent neighbor of every live chunk that reported a missing
/// border. Neighbors past the edge of the `i32` plane are never created.
/// Returns the number of chunks created.
pub fn expand_frontier(arena: &mut ChunkArena) -> usize {
    arena.expand_buf.clear();

    if arena.chunks.len() < PARALLEL_SCAN_THRESHOLD {
        scan_expand(&arena.chunks, &arena.coords, &mut arena.expand_buf);
    } else {
        let results: Vec<Vec<ChunkCoord>> = arena
            .chunks
            .par_chunks(SCAN_CHUNK)
            .zip(arena.coords.par_chunks(SCAN_CHUNK))
            .map(|(slots, coords)| {
                let mut expand = Vec::new();
                scan_expand(slots, coords, &mut expand);
                expand
            })
            .collect();
        for expand in results {
            arena.expand_buf.extend(expand);
        }
    }

    arena.expand_buf.sort_unstable();
    arena.expand_buf.dedup();
    arena.coord_to_idx.reserve(arena.expand_buf.len());

    let mut spawned = 0;
    for i in 0..arena.expand_buf.len() {
        let coord = arena.expand_buf[i];
        if !arena.in_plane(coord) || arena.idx_at(coord).is_some() {
            continue;
        }
        arena.allocate_absent(coord);
        spawned += 1;
    }
    spawned
}
