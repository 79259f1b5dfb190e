//! Displacement tables: per-slot probe offsets.
//!
//! For every occupied slot the table records how far forward of its initial
//! address the entry ended up.  Three encodings with different space/time
//! trade-offs:
//!
//! * [`NaiveDisplacement`] — a packed integer vector, widened when a value
//!   overflows the current element width;
//! * [`LayeredDisplacement`] — a fixed 4-bit layer with an elastic spill map
//!   for the rare large offsets;
//! * [`EliasGammaDisplacement`] — γ-coded blocks, rewritten on update.

use std::collections::HashMap;

use crate::ds::int_vector::IntVector;

/// Per-slot displacement values, dense over the table capacity.
pub trait Displacement {
    fn with_capacity(capacity: usize) -> Self;
    fn get(&self, i: usize) -> u64;
    fn set(&mut self, i: usize, v: u64);
    fn heap_bytes(&self) -> usize;
}

// ─────────────────────────────────────────────────────────────────────────────
// Naive
// ─────────────────────────────────────────────────────────────────────────────

/// Packed integer vector, starting at 4 bits per slot.
pub struct NaiveDisplacement {
    table: IntVector,
}

impl NaiveDisplacement {
    const INITIAL_WIDTH: u32 = 4;
}

impl Displacement for NaiveDisplacement {
    fn with_capacity(capacity: usize) -> Self {
        NaiveDisplacement { table: IntVector::with_len(Self::INITIAL_WIDTH, capacity) }
    }

    fn get(&self, i: usize) -> u64 {
        self.table.get(i)
    }

    fn set(&mut self, i: usize, v: u64) {
        let needed = IntVector::width_for(v);
        if needed > self.table.width() {
            let mut wider = IntVector::with_len(needed, self.table.len());
            for (j, x) in self.table.iter().enumerate() {
                wider.set(j, x);
            }
            self.table = wider;
        }
        self.table.set(i, v);
    }

    fn heap_bytes(&self) -> usize {
        self.table.heap_bytes()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Layered
// ─────────────────────────────────────────────────────────────────────────────

/// 4-bit fixed layer; the all-ones value marks an entry in the spill map.
pub struct LayeredDisplacement {
    fixed: IntVector,
    spill: HashMap<usize, u64>,
}

impl LayeredDisplacement {
    const FIXED_WIDTH: u32 = 4;
    const SPILL_MARK: u64 = (1 << Self::FIXED_WIDTH) - 1;
}

impl Displacement for LayeredDisplacement {
    fn with_capacity(capacity: usize) -> Self {
        LayeredDisplacement {
            fixed: IntVector::with_len(Self::FIXED_WIDTH, capacity),
            spill: HashMap::new(),
        }
    }

    fn get(&self, i: usize) -> u64 {
        let v = self.fixed.get(i);
        if v == Self::SPILL_MARK {
            self.spill[&i]
        } else {
            v
        }
    }

    fn set(&mut self, i: usize, v: u64) {
        if v < Self::SPILL_MARK {
            if self.fixed.get(i) == Self::SPILL_MARK {
                self.spill.remove(&i);
            }
            self.fixed.set(i, v);
        } else {
            self.fixed.set(i, Self::SPILL_MARK);
            self.spill.insert(i, v);
        }
    }

    fn heap_bytes(&self) -> usize {
        let entry = std::mem::size_of::<usize>() + std::mem::size_of::<u64>();
        self.fixed.heap_bytes() + self.spill.capacity() * entry
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Elias-γ blocks
// ─────────────────────────────────────────────────────────────────────────────

/// γ-coded displacement values in blocks of 64 slots.
///
/// A value `v` is stored as γ(v+1): `⌊log2(v+1)⌋` zero bits, then `v+1`
/// MSB-first.  Reads scan the block; writes re-encode it, which is fine since
/// displacement updates happen once per insertion.
pub struct EliasGammaDisplacement {
    blocks: Vec<GammaBlock>,
    capacity: usize,
}

const BLOCK_SLOTS: usize = 64;

struct GammaBlock {
    bits: Vec<u8>,
    /// Bit length of the encoded payload.
    bit_len: usize,
}

impl GammaBlock {
    fn new() -> Self {
        // an empty block decodes as all zeros
        GammaBlock { bits: Vec::new(), bit_len: 0 }
    }

    fn read_bit(&self, pos: usize) -> bool {
        self.bits[pos / 8] >> (7 - pos % 8) & 1 != 0
    }

    /// Decodes the γ value starting at `*pos`, advancing it.
    fn read_gamma(&self, pos: &mut usize) -> u64 {
        let mut zeros = 0u32;
        while !self.read_bit(*pos) {
            zeros += 1;
            *pos += 1;
        }
        let mut v = 1u64;
        *pos += 1;
        for _ in 0..zeros {
            v = (v << 1) | self.read_bit(*pos) as u64;
            *pos += 1;
        }
        v - 1
    }

    fn decode(&self, slots: usize) -> Vec<u64> {
        let mut out = vec![0u64; slots];
        if self.bit_len == 0 {
            return out;
        }
        let mut pos = 0;
        for slot in out.iter_mut() {
            *slot = self.read_gamma(&mut pos);
        }
        debug_assert_eq!(pos, self.bit_len);
        out
    }

    fn encode(values: &[u64]) -> Self {
        let mut bits: Vec<u8> = Vec::new();
        let mut acc = 0u8;
        let mut fill = 0u32;
        let mut bit_len = 0usize;
        let mut push_bit = |b: bool| {
            acc = (acc << 1) | b as u8;
            fill += 1;
            bit_len += 1;
            if fill == 8 {
                bits.push(acc);
                acc = 0;
                fill = 0;
            }
        };
        for &v in values {
            let g = v + 1;
            let top = 63 - g.leading_zeros();
            for _ in 0..top {
                push_bit(false);
            }
            for i in (0..=top).rev() {
                push_bit(g >> i & 1 != 0);
            }
        }
        drop(push_bit);
        if fill > 0 {
            bits.push(acc << (8 - fill));
        }
        GammaBlock { bits, bit_len }
    }
}

impl Displacement for EliasGammaDisplacement {
    fn with_capacity(capacity: usize) -> Self {
        let n_blocks = capacity.div_ceil(BLOCK_SLOTS).max(1);
        EliasGammaDisplacement {
            blocks: (0..n_blocks).map(|_| GammaBlock::new()).collect(),
            capacity,
        }
    }

    fn get(&self, i: usize) -> u64 {
        assert!(i < self.capacity);
        let block = &self.blocks[i / BLOCK_SLOTS];
        if block.bit_len == 0 {
            return 0;
        }
        let mut pos = 0;
        let mut v = 0;
        for _ in 0..=(i % BLOCK_SLOTS) {
            v = block.read_gamma(&mut pos);
        }
        v
    }

    fn set(&mut self, i: usize, v: u64) {
        assert!(i < self.capacity);
        let b = i / BLOCK_SLOTS;
        let slots = BLOCK_SLOTS.min(self.capacity - b * BLOCK_SLOTS);
        let mut values = self.blocks[b].decode(slots);
        values[i % BLOCK_SLOTS] = v;
        self.blocks[b] = GammaBlock::encode(&values);
    }

    fn heap_bytes(&self) -> usize {
        self.blocks.iter().map(|b| b.bits.capacity()).sum()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise<D: Displacement>() {
        let mut d = D::with_capacity(150);
        for i in 0..150 {
            assert_eq!(d.get(i), 0, "fresh table must read zero");
        }
        // small values, spill values, overwrites
        d.set(0, 3);
        d.set(149, 7);
        d.set(70, 1000);
        d.set(71, 2);
        d.set(70, 999);
        assert_eq!(d.get(0), 3);
        assert_eq!(d.get(149), 7);
        assert_eq!(d.get(70), 999);
        assert_eq!(d.get(71), 2);
        assert_eq!(d.get(1), 0);
        // shrinking an entry back below the spill threshold
        d.set(70, 1);
        assert_eq!(d.get(70), 1);
    }

    #[test]
    fn naive() {
        exercise::<NaiveDisplacement>();
    }

    #[test]
    fn layered() {
        exercise::<LayeredDisplacement>();
    }

    #[test]
    fn elias_gamma() {
        exercise::<EliasGammaDisplacement>();
    }

    #[test]
    fn gamma_block_roundtrip() {
        let values: Vec<u64> = (0..64).map(|i| (i * i * 7) % 513).collect();
        let block = GammaBlock::encode(&values);
        assert_eq!(block.decode(64), values);
    }
}
