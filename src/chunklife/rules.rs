//! Transition table for B3/S23 over a 3×3 neighborhood.
//!
//! Index layout (bit 8 is the most significant):
//! - bits 8..6: row above, left to right
//! - bits 5..3: the cell's own row, bit 4 is the centre cell
//! - bits 2..0: row below, left to right

/// Number of distinct 3×3 neighborhoods.
pub const NEIGHBORHOODS: usize = 512;

const CENTER_BIT: u16 = 0b000_010_000;
const NEIGHBOR_BITS: u16 = 0b111_101_111;

pub struct TransitionTable {
    table: [bool; NEIGHBORHOODS],
}

impl TransitionTable {
    pub const fn new() -> Self {
        let mut table = [false; NEIGHBORHOODS];
        let mut pattern = 0u16;
        while (pattern as usize) < NEIGHBORHOODS {
            table[pattern as usize] = next_state_for(pattern);
            pattern += 1;
        }
        Self { table }
    }

    #[inline(always)]
    pub fn next_state(&self, pattern: usize) -> bool {
        self.table[pattern & (NEIGHBORHOODS - 1)]
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide table, evaluated at compile time.
pub static TRANSITIONS: TransitionTable = TransitionTable::new();

const fn next_state_for(pattern: u16) -> bool {
    let neighbors = (pattern & NEIGHBOR_BITS).count_ones();
    let alive = pattern & CENTER_BIT != 0;
    neighbors == 3 || (neighbors == 2 && alive)
}

#[cfg(test)]
mod tests {
    use super::{NEIGHBORHOODS, TRANSITIONS, TransitionTable};

    fn cell_at(pattern: usize, x: usize, y: usize) -> usize {
        // y = 0 is the row above, x = 0 the left column.
        let bit = 8 - (y * 3 + x);
        (pattern >> bit) & 1
    }

    fn expected_next(pattern: usize) -> bool {
        let mut neighbors = 0;
        for y in 0..3 {
            for x in 0..3 {
                if x == 1 && y == 1 {
                    continue;
                }
                neighbors += cell_at(pattern, x, y);
            }
        }
        let alive = cell_at(pattern, 1, 1) == 1;
        if alive {
            neighbors == 2 || neighbors == 3
        } else {
            neighbors == 3
        }
    }

    #[test]
    fn table_matches_brute_force_count() {
        let table = TransitionTable::new();
        for pattern in 0..NEIGHBORHOODS {
            assert_eq!(
                table.next_state(pattern),
                expected_next(pattern),
                "pattern {pattern:09b}"
            );
        }
    }

    #[test]
    fn static_table_equals_runtime_build() {
        let table = TransitionTable::default();
        for pattern in 0..NEIGHBORHOODS {
            assert_eq!(TRANSITIONS.next_state(pattern), table.next_state(pattern));
        }
    }

    #[test]
    fn three_neighbors_always_live() {
        // Top row full, centre toggled.
        assert!(TRANSITIONS.next_state(0b111_000_000));
        assert!(TRANSITIONS.next_state(0b111_010_000));
    }

    #[test]
    fn two_neighbors_only_survive() {
        assert!(!TRANSITIONS.next_state(0b101_000_000));
        assert!(TRANSITIONS.next_state(0b101_010_000));
    }

    #[test]
    fn crowded_and_lonely_cells_die() {
        assert!(!TRANSITIONS.next_state(0b111_111_000));
        assert!(!TRANSITIONS.next_state(0b000_010_000));
        assert!(!TRANSITIONS.next_state(0b100_010_000));
        assert!(!TRANSITIONS.next_state(0b111_111_111));
    }
}
