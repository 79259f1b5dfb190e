//! Compact hash map: the set's probing scheme plus packed satellite values.

use super::displacement::Displacement;
use super::hash_fn::KeyHash;
use super::set::{NoResizeObserver, ResizeObserver};
use super::storage::SlotStorage;
use super::{DecomposedKey, SizeManager};

/// Result of a map lookup or insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapEntry {
    pub id: u64,
    pub value: u64,
    pub existed: bool,
}

enum Probe {
    Found(usize),
    Free { slot: usize, steps: u64 },
    Exhausted,
}

pub struct CompactHashMap<H: KeyHash, D: Displacement, S: SlotStorage> {
    sizing: SizeManager,
    key_width: u32,
    val_width: u32,
    hash: H,
    storage: S,
    displacement: D,
}

impl<H: KeyHash, D: Displacement, S: SlotStorage> CompactHashMap<H, D, S> {
    pub fn new(initial_capacity: usize, key_width: u32, val_width: u32) -> Self {
        let sizing = SizeManager::new(initial_capacity);
        let key_width = key_width.max(1);
        let val_width = val_width.max(1);
        let real_width = Self::real_width_for(&sizing, key_width);
        let quot_width = real_width - sizing.capacity_log2();
        CompactHashMap {
            hash: H::new(real_width),
            storage: S::with_capacity(sizing.capacity(), quot_width, val_width),
            displacement: D::with_capacity(sizing.capacity()),
            sizing,
            key_width,
            val_width,
        }
    }

    fn real_width_for(sizing: &SizeManager, key_width: u32) -> u32 {
        (sizing.capacity_log2() + 1).max(key_width)
    }

    pub fn size(&self) -> usize {
        self.sizing.size()
    }

    pub fn table_size(&self) -> usize {
        self.sizing.capacity()
    }

    pub fn key_width(&self) -> u32 {
        self.key_width
    }

    pub fn value_width(&self) -> u32 {
        self.val_width
    }

    pub fn max_load_factor(&self) -> f64 {
        self.sizing.max_load_factor()
    }

    pub fn set_max_load_factor(&mut self, z: f64) {
        self.sizing.set_max_load_factor(z);
    }

    #[inline]
    fn fits_key_width(&self, key: u64) -> bool {
        self.key_width == 64 || key < (1u64 << self.key_width)
    }

    #[inline]
    fn decompose(&self, key: u64) -> DecomposedKey {
        debug_assert!(self.fits_key_width(key), "key {key} wider than declared {} bits", self.key_width);
        self.sizing.decompose(self.hash.hash(key))
    }

    fn compose_slot(&self, slot: usize) -> u64 {
        let m = self.sizing.capacity();
        let disp = self.displacement.get(slot) as usize;
        let ia = (slot + m - disp % m) % m;
        self.hash.hash_inv(self.sizing.compose(ia, self.storage.quot(slot)))
    }

    fn probe(&self, dkey: DecomposedKey) -> Probe {
        let m = self.sizing.capacity();
        let mut j = 0u64;
        while (j as usize) < m {
            let slot = (dkey.initial_address + j as usize) & (m - 1);
            if !self.storage.is_occupied(slot) {
                return Probe::Free { slot, steps: j };
            }
            if self.displacement.get(slot) == j && self.storage.quot(slot) == dkey.quotient {
                return Probe::Found(slot);
            }
            j += 1;
        }
        Probe::Exhausted
    }

    /// Value lookup without mutation.
    pub fn get(&self, key: u64) -> Option<u64> {
        if !self.fits_key_width(key) {
            return None;
        }
        match self.probe(self.decompose(key)) {
            Probe::Found(slot) => Some(self.storage.val(slot)),
            _ => None,
        }
    }

    pub fn contains(&self, key: u64) -> bool {
        self.get(key).is_some()
    }

    /// Inserts `key -> value` unless present; either way returns the entry
    /// currently stored under the key.
    pub fn insert(&mut self, key: u64, value: u64, observer: &mut impl ResizeObserver) -> MapEntry {
        self.insert_kv_width(key, value, self.key_width, self.val_width, observer)
    }

    /// Insertion that also grows the key and value widths as needed.
    pub fn insert_kv_width(
        &mut self,
        key: u64,
        value: u64,
        key_width: u32,
        val_width: u32,
        observer: &mut impl ResizeObserver,
    ) -> MapEntry {
        let key_width = key_width.max(self.key_width);
        let val_width = val_width.max(self.val_width);
        self.grow_if_needed(self.size() + 1, key_width, val_width, observer);

        let dkey = self.decompose(key);
        match self.probe(dkey) {
            Probe::Found(slot) => MapEntry {
                id: slot as u64,
                value: self.storage.val(slot),
                existed: true,
            },
            Probe::Free { slot, steps } => {
                self.storage.occupy(slot, dkey.quotient, value);
                self.displacement.set(slot, steps);
                self.sizing.set_size(self.sizing.size() + 1);
                MapEntry { id: slot as u64, value, existed: false }
            }
            Probe::Exhausted => unreachable!("insert into a full table"),
        }
    }

    /// Overwrites the value of an existing key; the key must be present.
    pub fn update(&mut self, key: u64, value: u64) {
        match self.probe(self.decompose(key)) {
            Probe::Found(slot) => self.storage.set_val(slot, value),
            _ => panic!("update of an absent key"),
        }
    }

    /// `map[key]` with insert-on-absence: returns the stored value, inserting
    /// `default` first when the key is new.
    pub fn get_or_insert_with_default(
        &mut self,
        key: u64,
        default: u64,
        observer: &mut impl ResizeObserver,
    ) -> u64 {
        self.insert(key, default, observer).value
    }

    pub fn grow_key_width(&mut self, key_width: u32, observer: &mut impl ResizeObserver) {
        let key_width = key_width.max(self.key_width);
        self.grow_if_needed(self.size(), key_width, self.val_width, observer);
    }

    fn needs_to_realloc(&self, new_size: usize, new_key_width: u32, new_val_width: u32) -> bool {
        self.sizing.needs_to_grow(self.sizing.capacity(), new_size)
            || new_key_width != self.key_width
            || new_val_width != self.val_width
    }

    fn grow_if_needed(
        &mut self,
        new_size: usize,
        new_key_width: u32,
        new_val_width: u32,
        observer: &mut impl ResizeObserver,
    ) {
        if !self.needs_to_realloc(new_size, new_key_width, new_val_width) {
            return;
        }
        let new_capacity = self.sizing.grown_capacity(new_size);
        let mut grown = Self::new(new_capacity, new_key_width, new_val_width);
        grown.sizing.set_max_load_factor(self.sizing.max_load_factor());

        observer.on_resize(grown.table_size());
        self.move_into(&mut grown, observer);
        *self = grown;
    }

    /// Drains every `(key, value)` pair into `other`; the source is empty
    /// afterwards.
    pub fn move_into(&mut self, other: &mut Self, observer: &mut impl ResizeObserver) {
        for slot in 0..self.storage.capacity() {
            if !self.storage.is_occupied(slot) {
                continue;
            }
            let key = self.compose_slot(slot);
            let value = self.storage.val(slot);
            let entry = other.insert(key, value, &mut NoResizeObserver);
            debug_assert!(!entry.existed);
            observer.on_reinsert(key, entry.id);
        }
        self.sizing.set_size(0);
        let real_width = Self::real_width_for(&self.sizing, self.key_width);
        self.storage = S::with_capacity(
            self.sizing.capacity(),
            real_width - self.sizing.capacity_log2(),
            self.val_width,
        );
        self.displacement = D::with_capacity(self.sizing.capacity());
    }

    pub fn heap_bytes(&self) -> usize {
        self.storage.heap_bytes() + self.displacement.heap_bytes()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::super::displacement::{EliasGammaDisplacement, LayeredDisplacement, NaiveDisplacement};
    use super::super::hash_fn::{PoplarXorShiftHash, XorShiftHash};
    use super::super::storage::{PlainStorage, SparseBucketStorage};
    use super::*;

    type Map = CompactHashMap<XorShiftHash, NaiveDisplacement, PlainStorage>;

    #[test]
    fn insert_get_update() {
        let mut m = Map::new(0, 16, 8);
        assert_eq!(m.get(7), None);
        let e = m.insert(7, 200, &mut NoResizeObserver);
        assert!(!e.existed);
        assert_eq!(m.get(7), Some(200));
        // second insert does not overwrite
        let e = m.insert(7, 99, &mut NoResizeObserver);
        assert!(e.existed);
        assert_eq!(e.value, 200);
        m.update(7, 99);
        assert_eq!(m.get(7), Some(99));
    }

    #[test]
    fn kv_width_growth_preserves_entries() {
        let mut m = Map::new(0, 4, 4);
        m.insert(3, 5, &mut NoResizeObserver);
        // both widths must grow to take this pair
        m.insert_kv_width(1000, 70000, 10, 17, &mut NoResizeObserver);
        assert_eq!(m.get(3), Some(5));
        assert_eq!(m.get(1000), Some(70000));
        assert!(m.key_width() >= 10);
        assert!(m.value_width() >= 17);
    }

    #[test]
    fn get_or_insert_behaves_like_index() {
        let mut m = Map::new(0, 8, 8);
        assert_eq!(m.get_or_insert_with_default(5, 42, &mut NoResizeObserver), 42);
        m.update(5, 43);
        assert_eq!(m.get_or_insert_with_default(5, 42, &mut NoResizeObserver), 43);
    }

    fn stress<H: KeyHash, D: Displacement, S: SlotStorage>() {
        let mut m = CompactHashMap::<H, D, S>::new(0, 20, 20);
        for i in 0..2000u64 {
            m.insert(i * 17 % 1_000_000, i, &mut NoResizeObserver);
        }
        for i in 0..2000u64 {
            let got = m.get(i * 17 % 1_000_000).unwrap();
            // first writer wins for duplicated keys
            assert_eq!(got % 17, i % 17);
        }
    }

    #[test]
    fn stress_all_displacements_and_storages() {
        stress::<XorShiftHash, NaiveDisplacement, PlainStorage>();
        stress::<XorShiftHash, LayeredDisplacement, SparseBucketStorage>();
        stress::<PoplarXorShiftHash, EliasGammaDisplacement, PlainStorage>();
        stress::<PoplarXorShiftHash, NaiveDisplacement, SparseBucketStorage>();
    }
}
