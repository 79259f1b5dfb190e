//! Compact quotient hashing.
//!
//! Keys of width `W` are mixed by a bijective hash, then split into an
//! *initial address* (implicit in the slot position, `log2(capacity)` bits)
//! and a *quotient* stored explicitly in the slot.  Collisions probe linearly
//! forward; a displacement structure records, per occupied slot, how far the
//! entry sits from its initial address, which is what makes the implicit
//! address recoverable.
//!
//! The table family is generic over the hash mixer ([`hash_fn::KeyHash`]),
//! the slot storage ([`storage::SlotStorage`]) and the displacement encoding
//! ([`displacement::Displacement`]).

pub mod displacement;
pub mod hash_fn;
pub mod map;
pub mod set;
pub mod storage;

pub use displacement::{Displacement, EliasGammaDisplacement, LayeredDisplacement, NaiveDisplacement};
pub use hash_fn::{KeyHash, PoplarXorShiftHash, XorShiftHash};
pub use map::CompactHashMap;
pub use set::CompactHashSet;
pub use storage::{PlainStorage, SlotStorage, SparseBucketStorage};

/// Default maximum load factor.
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.5;

/// A key split into its implicit and explicit parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecomposedKey {
    pub initial_address: usize,
    pub quotient: u64,
}

/// Capacity, live size, and the growth policy.
///
/// Capacity is always a power of two so the initial address is a simple mask.
#[derive(Clone, Debug)]
pub struct SizeManager {
    capacity: usize,
    size: usize,
    max_load_factor: f64,
}

impl SizeManager {
    pub const MIN_CAPACITY: usize = 4;

    pub fn new(initial_capacity: usize) -> Self {
        let capacity = initial_capacity.max(Self::MIN_CAPACITY).next_power_of_two();
        SizeManager { capacity, size: 0, max_load_factor: DEFAULT_MAX_LOAD_FACTOR }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn capacity_log2(&self) -> u32 {
        self.capacity.trailing_zeros()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    /// Expects `0.0 < z <= 1.0`.
    pub fn set_max_load_factor(&mut self, z: f64) {
        assert!(z > 0.0 && z <= 1.0, "load factor must be in (0, 1]");
        self.max_load_factor = z;
    }

    pub fn needs_to_grow(&self, capacity: usize, new_size: usize) -> bool {
        new_size as f64 > capacity as f64 * self.max_load_factor
    }

    /// Smallest power-of-two capacity satisfying the load factor for
    /// `new_size` elements.
    pub fn grown_capacity(&self, new_size: usize) -> usize {
        let mut capacity = self.capacity;
        while self.needs_to_grow(capacity, new_size) {
            capacity *= 2;
        }
        capacity
    }

    /// Splits a hashed value into initial address and quotient.
    #[inline]
    pub fn decompose(&self, hashed: u64) -> DecomposedKey {
        DecomposedKey {
            initial_address: (hashed & (self.capacity as u64 - 1)) as usize,
            quotient: hashed >> self.capacity_log2(),
        }
    }

    /// Inverse of [`SizeManager::decompose`].
    #[inline]
    pub fn compose(&self, initial_address: usize, quotient: u64) -> u64 {
        (quotient << self.capacity_log2()) | initial_address as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_rounds_to_power_of_two() {
        assert_eq!(SizeManager::new(0).capacity(), 4);
        assert_eq!(SizeManager::new(5).capacity(), 8);
        assert_eq!(SizeManager::new(64).capacity(), 64);
    }

    #[test]
    fn decompose_compose_roundtrip() {
        let sm = SizeManager::new(64);
        for h in [0u64, 1, 63, 64, 12345, u64::MAX >> 1] {
            let d = sm.decompose(h);
            assert_eq!(sm.compose(d.initial_address, d.quotient), h);
            assert!(d.initial_address < 64);
        }
    }

    #[test]
    fn growth_respects_load_factor() {
        let mut sm = SizeManager::new(4);
        sm.set_max_load_factor(0.5);
        assert!(!sm.needs_to_grow(4, 2));
        assert!(sm.needs_to_grow(4, 3));
        assert_eq!(sm.grown_capacity(3), 8);
        assert_eq!(sm.grown_capacity(100), 256);
    }
}
