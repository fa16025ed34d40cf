//! `ChunkMap`: open-addressing hashmap for `(i32, i32) → ChunkIdx`.
//!
//! - Both coordinates are packed into a single `u64` key.
//! - Robin Hood probing with backward-shift deletion (no tombstones).
//! - A short fingerprint in the control word skips most key comparisons.

use super::chunk::ChunkIdx;
use super::coord::ChunkCoord;

// Distinct odd multipliers per axis so grid-aligned keys don't collide.
const MX: u64 = 0x9e37_79b9_7f4a_7c15;
const MY: u64 = 0xc2b2_ae3d_27d4_eb4f;

#[inline(always)]
fn pack(coord: ChunkCoord) -> u64 {
    ((coord.0 as u32 as u64) << 32) | coord.1 as u32 as u64
}

#[inline(always)]
fn unpack(key: u64) -> ChunkCoord {
    ((key >> 32) as u32 as i32, key as u32 as i32)
}

#[inline(always)]
pub(crate) fn chunk_hash(coord: ChunkCoord) -> u64 {
    let x = (coord.0 as u32 as u64).wrapping_mul(MX);
    let y = (coord.1 as u32 as u64).wrapping_mul(MY).rotate_right(29);
    let h = x ^ y;
    h ^ (h >> 32)
}

const EMPTY: u32 = 0;
const OCCUPIED_BIT: u32 = 0x8000_0000;
const DIST_SHIFT: u32 = 8;
const DIST_MASK: u32 = 0x7fff_ff00;
const FP_MASK: u32 = 0x0000_00ff;
const MATCH_MASK: u32 = OCCUPIED_BIT | FP_MASK;
const MAX_DIST: usize = (DIST_MASK >> DIST_SHIFT) as usize;

/// Control word: bit 31 occupied, bits 8..30 probe distance, bits 0..7
/// fingerprint. `0` means empty.
#[derive(Clone, Copy)]
struct Slot {
    key: u64,
    value: u32,
    ctrl: u32,
}

impl Slot {
    const EMPTY: Self = Self {
        key: 0,
        value: 0,
        ctrl: EMPTY,
    };

    #[inline(always)]
    fn is_empty(self) -> bool {
        self.ctrl == EMPTY
    }

    #[inline(always)]
    fn distance(self) -> usize {
        ((self.ctrl & DIST_MASK) >> DIST_SHIFT) as usize
    }

    #[inline(always)]
    fn set_distance(&mut self, distance: usize) {
        assert!(
            distance <= MAX_DIST,
            "ChunkMap probe distance overflow (distance={distance}, max={MAX_DIST})"
        );
        self.ctrl = (self.ctrl & !DIST_MASK) | ((distance as u32) << DIST_SHIFT);
    }

    #[inline(always)]
    fn matches(self, key: u64, ctrl: u32) -> bool {
        self.ctrl & MATCH_MASK == ctrl && self.key == key
    }
}

#[inline(always)]
fn fingerprint_of(hash: u64) -> u32 {
    // Low bits pick the bucket; take the fingerprint from the top. Never zero.
    ((hash >> 56) as u32 & FP_MASK) | 1
}

#[inline(always)]
fn match_ctrl_of(hash: u64) -> u32 {
    OCCUPIED_BIT | fingerprint_of(hash)
}

/// Load factor 1/2.
const LOAD_NUM: usize = 1;
const LOAD_DEN: usize = 2;
const MIN_SLOTS: usize = 16;

pub struct ChunkMap {
    slots: Vec<Slot>,
    len: usize,
    /// `capacity - 1`; capacity is a power of two.
    mask: usize,
}

impl ChunkMap {
    pub fn with_capacity(cap: usize) -> Self {
        let slots = Self::slots_for(cap);
        Self {
            slots: vec![Slot::EMPTY; slots],
            len: 0,
            mask: slots - 1,
        }
    }

    fn slots_for(entries: usize) -> usize {
        entries
            .saturating_mul(LOAD_DEN)
            .div_ceil(LOAD_NUM)
            .next_power_of_two()
            .max(MIN_SLOTS)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn reserve(&mut self, additional: usize) {
        let slots = Self::slots_for(self.len.saturating_add(additional));
        if slots > self.slots.len() {
            self.resize(slots);
        }
    }

    /// Lookup with Robin Hood early exit: once a resident sits closer to its
    /// home than we are to ours, the key is absent.
    #[inline]
    pub fn get(&self, coord: ChunkCoord) -> Option<ChunkIdx> {
        let hash = chunk_hash(coord);
        let key = pack(coord);
        let ctrl = match_ctrl_of(hash);
        let mut pos = hash as usize & self.mask;
        let mut dist = 0usize;
        loop {
            let slot = self.slots[pos];
            if slot.is_empty() || dist > slot.distance() {
                return None;
            }
            if slot.matches(key, ctrl) {
                return Some(ChunkIdx(slot.value));
            }
            pos = (pos + 1) & self.mask;
            dist += 1;
        }
    }

    #[inline]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.get(coord).is_some()
    }

    /// Returns the previous value if the key was present.
    pub fn insert(&mut self, coord: ChunkCoord, value: ChunkIdx) -> Option<ChunkIdx> {
        if (self.len + 1) * LOAD_DEN > self.slots.len() * LOAD_NUM {
            self.resize(self.slots.len() * 2);
        }
        let hash = chunk_hash(coord);
        let key = pack(coord);
        let ctrl = match_ctrl_of(hash);
        let mut pos = hash as usize & self.mask;
        let mut ins = Slot {
            key,
            value: value.0,
            ctrl,
        };

        loop {
            let slot = &mut self.slots[pos];
            if slot.is_empty() {
                *slot = ins;
                self.len += 1;
                return None;
            }
            if slot.matches(key, ctrl) {
                let old = ChunkIdx(slot.value);
                slot.value = value.0;
                return Some(old);
            }
            // Steal from the richer resident.
            if ins.distance() > slot.distance() {
                std::mem::swap(slot, &mut ins);
            }
            ins.set_distance(ins.distance() + 1);
            pos = (pos + 1) & self.mask;
        }
    }

    /// Reinsert a slot known to be absent, recomputing its home.
    fn insert_rehash(&mut self, mut ins: Slot) {
        let mut pos = chunk_hash(unpack(ins.key)) as usize & self.mask;
        ins.set_distance(0);
        loop {
            let slot = &mut self.slots[pos];
            if slot.is_empty() {
                *slot = ins;
                self.len += 1;
                return;
            }
            if ins.distance() > slot.distance() {
                std::mem::swap(slot, &mut ins);
            }
            ins.set_distance(ins.distance() + 1);
            pos = (pos + 1) & self.mask;
        }
    }

    pub fn remove(&mut self, coord: ChunkCoord) -> Option<ChunkIdx> {
        let hash = chunk_hash(coord);
        let key = pack(coord);
        let ctrl = match_ctrl_of(hash);
        let mut pos = hash as usize & self.mask;
        let mut dist = 0usize;
        loop {
            let slot = self.slots[pos];
            if slot.is_empty() || dist > slot.distance() {
                return None;
            }
            if slot.matches(key, ctrl) {
                self.backward_shift_delete(pos);
                self.len -= 1;
                return Some(ChunkIdx(slot.value));
            }
            pos = (pos + 1) & self.mask;
            dist += 1;
        }
    }

    fn backward_shift_delete(&mut self, removed: usize) {
        let mut gap = removed;
        loop {
            let next = (gap + 1) & self.mask;
            let mut candidate = self.slots[next];
            // Empty or at home: the chain ends here.
            if candidate.is_empty() || candidate.distance() == 0 {
                self.slots[gap] = Slot::EMPTY;
                return;
            }
            candidate.set_distance(candidate.distance() - 1);
            self.slots[gap] = candidate;
            gap = next;
        }
    }

    fn resize(&mut self, new_cap: usize) {
        debug_assert!(new_cap.is_power_of_two());
        let old = std::mem::replace(&mut self.slots, vec![Slot::EMPTY; new_cap]);
        self.mask = new_cap - 1;
        self.len = 0;
        for slot in old {
            if !slot.is_empty() {
                self.insert_rehash(slot);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkCoord, ChunkIdx)> + '_ {
        self.slots
            .iter()
            .filter(|slot| !slot.is_empty())
            .map(|slot| (unpack(slot.key), ChunkIdx(slot.value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut m = ChunkMap::with_capacity(64);
        assert!(m.get((10, 20)).is_none());
        assert!(m.is_empty());

        assert_eq!(m.insert((10, 20), ChunkIdx(42)), None);
        assert_eq!(m.get((10, 20)), Some(ChunkIdx(42)));
        assert_eq!(m.len(), 1);

        assert_eq!(m.insert((10, 20), ChunkIdx(99)), Some(ChunkIdx(42)));
        assert_eq!(m.get((10, 20)), Some(ChunkIdx(99)));
        assert_eq!(m.len(), 1);

        assert_eq!(m.remove((10, 20)), Some(ChunkIdx(99)));
        assert!(m.get((10, 20)).is_none());
        assert_eq!(m.remove((10, 20)), None);
        assert_eq!(m.len(), 0);
    }

    #[test]
    fn pack_round_trips_extremes() {
        for coord in [(0, 0), (-1, -1), (i32::MIN, i32::MAX), (i32::MAX, i32::MIN), (-5, 7)] {
            assert_eq!(unpack(pack(coord)), coord);
        }
    }

    #[test]
    fn negative_coords_do_not_alias() {
        let mut m = ChunkMap::with_capacity(16);
        m.insert((-1, 0), ChunkIdx(1));
        m.insert((0, -1), ChunkIdx(2));
        m.insert((-1, -1), ChunkIdx(3));
        m.insert((i32::MIN, i32::MAX), ChunkIdx(4));

        assert_eq!(m.get((-1, 0)), Some(ChunkIdx(1)));
        assert_eq!(m.get((0, -1)), Some(ChunkIdx(2)));
        assert_eq!(m.get((-1, -1)), Some(ChunkIdx(3)));
        assert_eq!(m.get((i32::MIN, i32::MAX)), Some(ChunkIdx(4)));
        assert!(!m.contains((0, 0)));
        assert_eq!(m.len(), 4);
    }

    #[test]
    fn grows_under_pressure() {
        let mut m = ChunkMap::with_capacity(4);
        for i in 0..2000i32 {
            m.insert((i, -3 * i), ChunkIdx(i as u32));
        }
        assert_eq!(m.len(), 2000);
        for i in 0..2000i32 {
            assert_eq!(m.get((i, -3 * i)), Some(ChunkIdx(i as u32)));
        }
    }

    #[test]
    fn reserve_keeps_entries() {
        let mut m = ChunkMap::with_capacity(4);
        for i in 0..10 {
            m.insert((i, i), ChunkIdx(i as u32));
        }
        m.reserve(5000);
        for i in 0..10 {
            assert_eq!(m.get((i, i)), Some(ChunkIdx(i as u32)));
        }
    }

    #[test]
    fn remove_keeps_probe_chains_intact() {
        let mut m = ChunkMap::with_capacity(64);
        for x in -10..10 {
            for y in -10..10 {
                m.insert((x, y), ChunkIdx(((x + 10) * 20 + y + 10) as u32));
            }
        }
        for x in -10..10 {
            for y in (-10..10).step_by(2) {
                assert!(m.remove((x, y)).is_some());
            }
        }
        for x in -10..10 {
            for y in -10..10 {
                let expected = (y + 10) % 2 == 1;
                assert_eq!(m.contains((x, y)), expected, "({x},{y})");
            }
        }
        assert_eq!(m.len(), 200);
    }

    #[test]
    fn iter_yields_all_entries() {
        let mut m = ChunkMap::with_capacity(32);
        for i in 0..50i32 {
            m.insert((i, -i), ChunkIdx(i as u32));
        }
        let mut collected: Vec<_> = m.iter().collect();
        collected.sort_by_key(|&(_, idx)| idx);
        assert_eq!(collected.len(), 50);
        for (i, &((x, y), idx)) in collected.iter().enumerate() {
            assert_eq!((x, y), (i as i32, -(i as i32)));
            assert_eq!(idx, ChunkIdx(i as u32));
        }
    }

    #[test]
    fn hash_spreads_neighboring_chunks() {
        let mut buckets = std::collections::BTreeSet::new();
        let mask = (1u64 << 12) - 1;
        for x in -32..32 {
            for y in -32..32 {
                buckets.insert(chunk_hash((x, y)) & mask);
            }
        }
        assert!(buckets.len() >= 1_500, "bucket spread regressed: {}", buckets.len());
    }

    #[test]
    #[should_panic(expected = "ChunkMap probe distance overflow")]
    fn slot_distance_overflow_panics() {
        let mut slot = Slot {
            key: 0,
            value: 0,
            ctrl: OCCUPIED_BIT | 1,
        };
        slot.set_distance(MAX_DIST + 1);
    }
}
