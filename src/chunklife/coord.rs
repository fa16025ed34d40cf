//! Mapping between board cell coordinates and chunk/local coordinates.
//!
//! Uses floor division so negative coordinates map continuously: with a chunk
//! size of 8, `x = -1` lands in chunk `-1` at local column `7`.
//!
//! The `i32` plane has a hard edge. Chunks exist only where they hold at least
//! one `i32` cell, and cells of an edge chunk that fall past `i32::MIN` or
//! `i32::MAX` are clipped and stay dead.

use std::ops::RangeInclusive;

/// Chunk coordinate `(cx, cy)`.
pub type ChunkCoord = (i32, i32);

#[inline(always)]
fn size_i32(size: usize) -> i32 {
    assert!(
        size > 0 && size <= i32::MAX as usize,
        "chunk size must be positive and fit in i32 (got {size})"
    );
    size as i32
}

/// The chunk containing cell `(x, y)`.
#[inline]
pub fn chunk_coord_of(x: i32, y: i32, size: usize) -> ChunkCoord {
    let k = size_i32(size);
    (x.div_euclid(k), y.div_euclid(k))
}

/// The position of cell `(x, y)` inside its chunk, each axis in `[0, size)`.
#[inline]
pub fn local_coord_of(x: i32, y: i32, size: usize) -> (usize, usize) {
    let k = size_i32(size);
    (x.rem_euclid(k) as usize, y.rem_euclid(k) as usize)
}

/// Inverse of the two functions above.
///
/// Only meaningful for pairs inside the plane (see `plane_clip`). Clipped cells
/// never come alive, so every live cell maps back without wrapping.
#[inline]
pub fn cell_coord_of(chunk: ChunkCoord, local: (usize, usize), size: usize) -> (i32, i32) {
    let k = size as i64;
    let x = chunk.0 as i64 * k + local.0 as i64;
    let y = chunk.1 as i64 * k + local.1 as i64;
    debug_assert!(
        i32::try_from(x).is_ok() && i32::try_from(y).is_ok(),
        "cell ({x}, {y}) of chunk {chunk:?} lies outside the i32 plane"
    );
    (x as i32, y as i32)
}

/// Chunk coordinates, per axis, of the chunks that hold at least one `i32` cell.
#[inline]
pub fn plane_chunk_range(size: usize) -> RangeInclusive<i32> {
    let k = size_i32(size);
    i32::MIN.div_euclid(k)..=i32::MAX.div_euclid(k)
}

/// Local indices along one axis of chunk `c` whose cells fit in `i32`.
fn axis_span(c: i32, size: usize) -> RangeInclusive<usize> {
    let k = size as i64;
    let base = c as i64 * k;
    let lo = (i32::MIN as i64 - base).clamp(0, k - 1);
    let hi = (i32::MAX as i64 - base).clamp(0, k - 1);
    lo as usize..=hi as usize
}

/// Local `(columns, rows)` an edge chunk may hold, or `None` when every cell
/// of the chunk lies inside the plane.
pub fn plane_clip(
    chunk: ChunkCoord,
    size: usize,
) -> Option<(RangeInclusive<usize>, RangeInclusive<usize>)> {
    let full = 0..=size - 1;
    let columns = axis_span(chunk.0, size);
    let rows = axis_span(chunk.1, size);
    (columns != full || rows != full).then_some((columns, rows))
}
