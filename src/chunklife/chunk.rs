//! Chunk storage and the per-chunk generation kernel.
//!
//! A chunk of size K keeps K+2 row words:
//! - `rows[0]` / `rows[K + 1]`: bottom / top border rows, refilled every tick
//! - `rows[1..=K]`: data rows, `rows[y + 1]` holds local row `y`
//!
//! Within a word, bit `K + 1` is the left-border bit, bit `0` the right-border
//! bit, and local column `x` sits at bit `K - x`.

use std::ops::RangeInclusive;

use bitflags::bitflags;

use super::rules::TRANSITIONS;

/// Row word. Wide enough for `MAX_CHUNK_SIZE` interior bits plus two borders.
pub type Row = u128;

pub const MIN_CHUNK_SIZE: usize = 4;
pub const MAX_CHUNK_SIZE: usize = Row::BITS as usize - 2;
pub const DEFAULT_CHUNK_SIZE: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkIdx(pub u32);

impl ChunkIdx {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The 8 neighbor directions. `Up` is `+y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    Up        = 0, // (cx, cy+1)
    Down      = 1, // (cx, cy-1)
    Left      = 2, // (cx-1, cy)
    Right     = 3, // (cx+1, cy)
    UpLeft    = 4, // (cx-1, cy+1)
    UpRight   = 5, // (cx+1, cy+1)
    DownLeft  = 6, // (cx-1, cy-1)
    DownRight = 7, // (cx+1, cy-1)
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Up,       Direction::Down,
        Direction::Left,     Direction::Right,
        Direction::UpLeft,   Direction::UpRight,
        Direction::DownLeft, Direction::DownRight,
    ];

    #[inline]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up        => (0, 1),
            Direction::Down      => (0, -1),
            Direction::Left      => (-1, 0),
            Direction::Right     => (1, 0),
            Direction::UpLeft    => (-1, 1),
            Direction::UpRight   => (1, 1),
            Direction::DownLeft  => (-1, -1),
            Direction::DownRight => (1, -1),
        }
    }

    #[inline]
    pub const fn reverse(self) -> Direction {
        match self {
            Direction::Up        => Direction::Down,
            Direction::Down      => Direction::Up,
            Direction::Left      => Direction::Right,
            Direction::Right     => Direction::Left,
            Direction::UpLeft    => Direction::DownRight,
            Direction::UpRight   => Direction::DownLeft,
            Direction::DownLeft  => Direction::UpRight,
            Direction::DownRight => Direction::UpLeft,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Neighbor handles indexed by `Direction`.
pub type Neighbors = [Option<ChunkIdx>; 8];

pub const NO_NEIGHBORS: Neighbors = [None; 8];

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ChunkFlags: u8 {
        /// No interior cell is alive.
        const EMPTY = 1;
        /// At least one of the 8 neighbor slots is unlinked.
        const MISSING_BORDER_CHUNK = 1 << 1;
        /// Every linked neighbor is EMPTY (vacuously true with none linked).
        const ALL_BORDERS_EMPTY = 1 << 2;
    }
}

/// Bit masks derived from the chunk size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub size: usize,
    pub data_bits: Row,
    pub left_border_bit: Row,
    pub right_border_bit: Row,
}

impl Geometry {
    pub fn new(size: usize) -> Self {
        assert!(
            (MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&size),
            "chunk size {size} outside {MIN_CHUNK_SIZE}..={MAX_CHUNK_SIZE}"
        );
        Self {
            size,
            data_bits: ((1 << size) - 1) << 1,
            left_border_bit: 1 << (size + 1),
            right_border_bit: 1,
        }
    }

    #[inline(always)]
    pub fn top_border(&self) -> usize {
        self.size + 1
    }

    #[inline(always)]
    pub fn column_bit(&self, x: usize) -> Row {
        1 << (self.size - x)
    }
}

/// Edge data gathered from the 8 neighbors of one chunk.
///
/// `top` and `bottom` are complete border rows (corner bits included);
/// `left` and `right` carry one bit per data row, bit `y` for local row `y`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BorderFrame {
    pub top: Row,
    pub bottom: Row,
    pub left: Row,
    pub right: Row,
    pub linked: u8,
    pub all_empty: bool,
}

/// Interior cells an edge-of-plane chunk may hold. Everything else is forced
/// dead after each transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Clip {
    columns: Row,
    rows: (usize, usize),
}

#[derive(Clone, Debug)]
pub struct Chunk {
    geometry: Geometry,
    rows: Box<[Row]>,
    flags: ChunkFlags,
    clip: Option<Clip>,
    /// Only the arena writes these.
    pub(crate) neighbors: Neighbors,
}

impl Chunk {
    pub fn new(size: usize) -> Self {
        let geometry = Geometry::new(size);
        Self {
            geometry,
            rows: vec![0; size + 2].into_boxed_slice(),
            flags: ChunkFlags::EMPTY,
            clip: None,
            neighbors: NO_NEIGHBORS,
        }
    }

    /// Restrict live cells to the given local columns and rows.
    pub fn clip_to(&mut self, columns: RangeInclusive<usize>, rows: RangeInclusive<usize>) {
        let g = self.geometry;
        assert!(
            *columns.end() < g.size && *rows.end() < g.size,
            "clip {columns:?} x {rows:?} outside chunk of size {}",
            g.size
        );
        let mask = columns.fold(0, |acc, x| acc | g.column_bit(x));
        self.clip = Some(Clip {
            columns: mask,
            rows: (*rows.start(), *rows.end()),
        });
        self.apply_clip();
        self.process_empty();
    }

    fn apply_clip(&mut self) {
        let Some(clip) = self.clip else {
            return;
        };
        let (lo, hi) = clip.rows;
        for y in 0..self.geometry.size {
            let keep = if (lo..=hi).contains(&y) { clip.columns } else { 0 };
            self.rows[y + 1] &= keep | !self.geometry.data_bits;
        }
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.geometry.size
    }

    #[inline(always)]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[cfg(test)]
    pub fn flags(&self) -> ChunkFlags {
        self.flags
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.flags.contains(ChunkFlags::EMPTY)
    }

    #[inline(always)]
    pub fn has_missing_border(&self) -> bool {
        self.flags.contains(ChunkFlags::MISSING_BORDER_CHUNK)
    }

    #[inline(always)]
    pub fn all_borders_empty(&self) -> bool {
        self.flags.contains(ChunkFlags::ALL_BORDERS_EMPTY)
    }

    #[inline(always)]
    pub fn neighbor(&self, dir: Direction) -> Option<ChunkIdx> {
        self.neighbors[dir.index()]
    }

    /// Raw row word including border bits.
    #[inline(always)]
    pub(crate) fn row(&self, index: usize) -> Row {
        self.rows[index]
    }

    /// Interior bits of data row `y`, in storage order.
    #[inline(always)]
    pub(crate) fn data_row(&self, y: usize) -> Row {
        self.rows[y + 1] & self.geometry.data_bits
    }

    #[inline(always)]
    fn check_local(&self, x: usize, y: usize) {
        let size = self.geometry.size;
        assert!(
            x < size && y < size,
            "local coordinate ({x}, {y}) outside chunk of size {size}"
        );
    }

    #[inline]
    pub fn get_cell(&self, x: usize, y: usize) -> bool {
        self.check_local(x, y);
        self.rows[y + 1] & self.geometry.column_bit(x) != 0
    }

    /// A live write marks the chunk non-empty and assumes a missing neighbor so
    /// the next tick expands around it. A dead write leaves flags alone; the
    /// next transition recomputes emptiness.
    pub fn set_cell(&mut self, x: usize, y: usize, alive: bool) {
        self.check_local(x, y);
        let mask = self.geometry.column_bit(x);
        if alive {
            self.flags.remove(ChunkFlags::EMPTY);
            self.flags.insert(ChunkFlags::MISSING_BORDER_CHUNK);
            self.rows[y + 1] |= mask;
        } else {
            self.rows[y + 1] &= !mask;
        }
    }

    /// Install a freshly gathered border frame, replacing last tick's borders.
    pub fn read_in_border(&mut self, frame: &BorderFrame) {
        let g = self.geometry;
        let top = g.top_border();

        self.rows[0] = frame.bottom;
        self.rows[top] = frame.top;
        for y in 0..g.size {
            let mut row = self.rows[y + 1] & g.data_bits;
            if (frame.left >> y) & 1 != 0 {
                row |= g.left_border_bit;
            }
            if (frame.right >> y) & 1 != 0 {
                row |= g.right_border_bit;
            }
            self.rows[y + 1] = row;
        }

        self.flags
            .set(ChunkFlags::MISSING_BORDER_CHUNK, frame.linked != 8);
        self.flags.set(ChunkFlags::ALL_BORDERS_EMPTY, frame.all_empty);
    }

    /// Advance the interior one generation using the current border rows.
    pub fn process_next_state(&mut self) {
        let size = self.geometry.size;
        let mut next = [0 as Row; MAX_CHUNK_SIZE];

        for r in 1..=size {
            let above = self.rows[r + 1];
            let current = self.rows[r];
            let below = self.rows[r - 1];
            let mut new_row: Row = 0;
            for col in 0..size {
                let pattern = ((((above >> col) & 0b111) as usize) << 6)
                    | ((((current >> col) & 0b111) as usize) << 3)
                    | ((below >> col) & 0b111) as usize;
                if TRANSITIONS.next_state(pattern) {
                    new_row |= 1 << (col + 1);
                }
            }
            next[r - 1] = new_row;
        }

        self.rows[1..=size].copy_from_slice(&next[..size]);
        self.apply_clip();
        self.process_empty();
    }

    fn process_empty(&mut self) {
        let data_bits = self.geometry.data_bits;
        let any = self.rows[1..=self.geometry.size]
            .iter()
            .fold(0, |acc, &row| acc | (row & data_bits));
        self.flags.set(ChunkFlags::EMPTY, any == 0);
    }

    /// Whether any interior bit is set, ignoring the EMPTY flag.
    pub fn has_live_cells(&self) -> bool {
        (0..self.geometry.size).any(|y| self.data_row(y) != 0)
    }

    pub fn population(&self) -> u32 {
        (0..self.geometry.size)
            .map(|y| self.data_row(y).count_ones())
            .sum()
    }
}
