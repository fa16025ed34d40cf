//! Border synchronization.
//!
//! Gather is read-only over the whole slot vector so it can run for every
//! chunk in parallel; the resulting frames are installed afterwards with
//! `Chunk::read_in_border`, each chunk writing only itself.

use super::chunk::{BorderFrame, Chunk, Direction, Row};

#[inline(always)]
fn linked<'a>(chunks: &'a [Option<Chunk>], chunk: &Chunk, dir: Direction) -> Option<&'a Chunk> {
    chunk.neighbor(dir).map(|n| {
        chunks
            .get(n.index())
            .and_then(Option::as_ref)
            .unwrap_or_else(|| panic!("{dir:?} link to released slot {}", n.0))
    })
}

/// Collect the edge rows, edge columns and corner bits of every linked
/// neighbor of `chunk`, plus the link count and the AND of their EMPTY flags.
pub fn gather_border(chunk: &Chunk, chunks: &[Option<Chunk>]) -> BorderFrame {
    let g = *chunk.geometry();
    let size = g.size;
    let bottom_row = 1;
    let top_row = size;

    let mut frame = BorderFrame {
        all_empty: true,
        ..BorderFrame::default()
    };

    for dir in Direction::ALL {
        let Some(n) = linked(chunks, chunk, dir) else {
            continue;
        };
        frame.linked += 1;
        frame.all_empty &= n.is_empty();

        match dir {
            Direction::Up => frame.top |= n.row(bottom_row) & g.data_bits,
            Direction::Down => frame.bottom |= n.row(top_row) & g.data_bits,
            Direction::UpLeft => frame.top |= (n.row(bottom_row) << size) & g.left_border_bit,
            Direction::UpRight => frame.top |= (n.row(bottom_row) >> size) & g.right_border_bit,
            Direction::DownLeft => frame.bottom |= (n.row(top_row) << size) & g.left_border_bit,
            Direction::DownRight => {
                frame.bottom |= (n.row(top_row) >> size) & g.right_border_bit
            }
            Direction::Left => {
                // Rightmost column of the left neighbor.
                frame.left = column_bits(n, size, 1);
            }
            Direction::Right => {
                // Leftmost column of the right neighbor.
                frame.right = column_bits(n, size, size);
            }
        }
    }

    frame
}

#[inline]
fn column_bits(chunk: &Chunk, size: usize, bit: usize) -> Row {
    let mut column: Row = 0;
    for y in 0..size {
        column |= ((chunk.row(y + 1) >> bit) & 1) << y;
    }
    column
}
