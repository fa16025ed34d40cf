//! Read-only chunk snapshots for renderers and inspection.

use super::chunk::{Chunk, Row};
use super::coord::{ChunkCoord, cell_coord_of};

/// Borrowed view of one allocated chunk. Exposes interior cells only.
#[derive(Clone, Copy)]
pub struct ChunkView<'a> {
    coord: ChunkCoord,
    chunk: &'a Chunk,
}

impl<'a> ChunkView<'a> {
    pub(crate) fn new(coord: ChunkCoord, chunk: &'a Chunk) -> Self {
        Self { coord, chunk }
    }

    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.chunk.size()
    }

    /// Cell at local `(x, y)`. Panics outside `0..size`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.chunk.get_cell(x, y)
    }

    /// Interior of local row `y` with column `x` at bit `x`.
    pub fn row_bits(&self, y: usize) -> Row {
        let size = self.size();
        assert!(y < size, "row {y} outside chunk of size {size}");
        let interior = self.chunk.data_row(y) >> 1;
        interior.reverse_bits() >> (Row::BITS as usize - size)
    }

    #[inline]
    pub fn population(&self) -> u32 {
        self.chunk.population()
    }

    /// Calls `f(x, y)` with board coordinates for every live cell.
    pub fn for_each_live<F: FnMut(i32, i32)>(&self, mut f: F) {
        let size = self.size();
        for y in 0..size {
            let mut bits = self.row_bits(y);
            while bits != 0 {
                let x = bits.trailing_zeros() as usize;
                let (bx, by) = cell_coord_of(self.coord, (x, y), size);
                f(bx, by);
                bits &= bits - 1;
            }
        }
    }
}

impl std::fmt::Debug for ChunkView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkView")
            .field("coord", &self.coord)
            .field("size", &self.size())
            .field("population", &self.population())
            .finish()
    }
}
