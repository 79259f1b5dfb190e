//! Compact hash set.
//!
//! Stores `W`-bit keys in quotient form.  An entry's *id* is its slot index;
//! ids are stable until the next resize, at which point the `on_reinsert`
//! callback reports the new id of every live element so external structures
//! that embed ids can be rebuilt.

use super::displacement::Displacement;
use super::hash_fn::KeyHash;
use super::storage::SlotStorage;
use super::{DecomposedKey, SizeManager};

/// Result of a lookup or insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Slot index; unique per element for a given table size.
    pub id: u64,
    /// Whether the key was already present before this call.
    pub existed: bool,
}

enum Probe {
    Found(usize),
    Free { slot: usize, steps: u64 },
    Exhausted,
}

/// Observer for resize events.
///
/// `on_resize` fires once with the new capacity before any element moves;
/// `on_reinsert` fires once per live element with its key and new id.
pub trait ResizeObserver {
    fn on_resize(&mut self, _new_capacity: usize) {}
    fn on_reinsert(&mut self, _key: u64, _new_id: u64) {}
}

/// The default observer ignores everything.
pub struct NoResizeObserver;
impl ResizeObserver for NoResizeObserver {}

pub struct CompactHashSet<H: KeyHash, D: Displacement, S: SlotStorage> {
    sizing: SizeManager,
    key_width: u32,
    hash: H,
    storage: S,
    displacement: D,
}

impl<H: KeyHash, D: Displacement, S: SlotStorage> CompactHashSet<H, D, S> {
    pub const DEFAULT_KEY_WIDTH: u32 = 1;

    pub fn new(initial_capacity: usize, key_width: u32) -> Self {
        let sizing = SizeManager::new(initial_capacity);
        let key_width = key_width.max(Self::DEFAULT_KEY_WIDTH);
        let real_width = Self::real_width_for(&sizing, key_width);
        let quot_width = real_width - sizing.capacity_log2();
        CompactHashSet {
            hash: H::new(real_width),
            storage: S::with_capacity(sizing.capacity(), quot_width, 0),
            displacement: D::with_capacity(sizing.capacity()),
            sizing,
            key_width,
        }
    }

    fn real_width_for(sizing: &SizeManager, key_width: u32) -> u32 {
        // one padding bit keeps the quotient width positive even when the
        // whole key fits into the initial address
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

    pub fn quotient_width(&self) -> u32 {
        Self::real_width_for(&self.sizing, self.key_width) - self.sizing.capacity_log2()
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

    #[inline]
    fn compose_slot(&self, slot: usize) -> u64 {
        let m = self.sizing.capacity();
        let disp = self.displacement.get(slot) as usize;
        let ia = (slot + m - disp % m) % m;
        self.hash.hash_inv(self.sizing.compose(ia, self.storage.quot(slot)))
    }

    /// Probes forward from the initial address until the key, the first empty
    /// slot of the run, or (on a completely full table) the whole capacity
    /// has been walked.
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

    /// Searches for `key` without mutating the table.
    pub fn lookup(&self, key: u64) -> Option<Entry> {
        if !self.fits_key_width(key) {
            return None;
        }
        match self.probe(self.decompose(key)) {
            Probe::Found(slot) => Some(Entry { id: slot as u64, existed: true }),
            _ => None,
        }
    }

    pub fn contains(&self, key: u64) -> bool {
        self.lookup(key).is_some()
    }

    /// STL-style occurrence count (0 or 1).
    pub fn count(&self, key: u64) -> usize {
        self.contains(key) as usize
    }

    /// STL-style find: the key back if present, `None` otherwise.
    pub fn find(&self, key: u64) -> Option<u64> {
        self.contains(key).then_some(key)
    }

    /// Looks up `key`, inserting it if absent.
    pub fn lookup_insert(&mut self, key: u64, observer: &mut impl ResizeObserver) -> Entry {
        self.lookup_insert_key_width(key, self.key_width, observer)
    }

    /// Like [`CompactHashSet::lookup_insert`], also growing the key width to
    /// at least `key_width` bits first.
    pub fn lookup_insert_key_width(
        &mut self,
        key: u64,
        key_width: u32,
        observer: &mut impl ResizeObserver,
    ) -> Entry {
        let key_width = key_width.max(self.key_width);
        self.grow_if_needed(self.size() + 1, key_width, observer);

        let dkey = self.decompose(key);
        match self.probe(dkey) {
            Probe::Found(slot) => Entry { id: slot as u64, existed: true },
            Probe::Free { slot, steps } => {
                self.storage.occupy(slot, dkey.quotient, 0);
                self.displacement.set(slot, steps);
                self.sizing.set_size(self.sizing.size() + 1);
                Entry { id: slot as u64, existed: false }
            }
            // growth above guarantees room for one more element
            Probe::Exhausted => unreachable!("insert into a full table"),
        }
    }

    /// Explicitly widens the keys without inserting.
    pub fn grow_key_width(&mut self, key_width: u32, observer: &mut impl ResizeObserver) {
        let key_width = key_width.max(self.key_width);
        self.grow_if_needed(self.size(), key_width, observer);
    }

    fn needs_to_realloc(&self, new_size: usize, new_key_width: u32) -> bool {
        self.sizing.needs_to_grow(self.sizing.capacity(), new_size)
            || new_key_width != self.key_width
    }

    fn grow_if_needed(
        &mut self,
        new_size: usize,
        new_key_width: u32,
        observer: &mut impl ResizeObserver,
    ) {
        if !self.needs_to_realloc(new_size, new_key_width) {
            return;
        }
        let new_capacity = self.sizing.grown_capacity(new_size);
        let mut grown = Self::new(new_capacity, new_key_width);
        grown.sizing.set_max_load_factor(self.sizing.max_load_factor());

        observer.on_resize(grown.table_size());
        self.move_into(&mut grown, observer);
        *self = grown;
    }

    /// Drains every element into `other`, reporting each move through
    /// `on_reinsert`.  The source is empty afterwards.
    pub fn move_into(&mut self, other: &mut Self, observer: &mut impl ResizeObserver) {
        for slot in 0..self.storage.capacity() {
            if !self.storage.is_occupied(slot) {
                continue;
            }
            let key = self.compose_slot(slot);
            let entry = other.lookup_insert(key, &mut NoResizeObserver);
            debug_assert!(!entry.existed);
            observer.on_reinsert(key, entry.id);
        }
        self.sizing.set_size(0);
        self.storage = S::with_capacity(
            self.sizing.capacity(),
            self.quotient_width(),
            0,
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
    use super::super::displacement::NaiveDisplacement;
    use super::super::hash_fn::XorShiftHash;
    use super::super::storage::PlainStorage;
    use super::*;

    type Set = CompactHashSet<XorShiftHash, NaiveDisplacement, PlainStorage>;

    #[test]
    fn insert_then_lookup() {
        let mut set = Set::new(0, 16);
        let a = set.lookup_insert(1234, &mut NoResizeObserver);
        assert!(!a.existed);
        let b = set.lookup_insert(1234, &mut NoResizeObserver);
        assert!(b.existed);
        assert_eq!(a.id, b.id);
        assert_eq!(set.size(), 1);
        assert!(set.contains(1234));
        assert!(!set.contains(4321));
    }

    #[test]
    fn lookup_does_not_mutate() {
        let mut set = Set::new(0, 16);
        set.lookup_insert(99, &mut NoResizeObserver);
        assert_eq!(set.lookup(12345), None);
        assert_eq!(set.size(), 1);
    }

    #[test]
    fn composed_keys_roundtrip_after_growth() {
        let mut set = Set::new(0, 8);
        for key in 0..200u64 {
            set.lookup_insert_key_width(key, 8, &mut NoResizeObserver);
        }
        assert_eq!(set.size(), 200);
        for key in 0..200u64 {
            assert!(set.contains(key), "lost key {key}");
        }
        assert!(!set.contains(200));
    }

    struct CountingObserver {
        resizes: usize,
        reinserts: usize,
    }

    impl ResizeObserver for CountingObserver {
        fn on_resize(&mut self, _c: usize) {
            self.resizes += 1;
        }
        fn on_reinsert(&mut self, _k: u64, _id: u64) {
            self.reinserts += 1;
        }
    }

    #[test]
    fn resize_reports_every_live_element() {
        let mut set = Set::new(4, 12);
        let mut obs = CountingObserver { resizes: 0, reinserts: 0 };
        let mut live = 0;
        for key in (0..100u64).map(|i| i * 7 % 4096) {
            let e = set.lookup_insert(key, &mut obs);
            if !e.existed {
                live += 1;
            }
        }
        assert!(obs.resizes > 0);
        assert_eq!(set.size(), live);
        // every resize re-reported the elements alive at that moment;
        // at minimum the final live count passed through once
        assert!(obs.reinserts >= live);
    }

    #[test]
    fn load_factor_bound_holds() {
        for z in [0.25, 0.5, 0.9, 1.0] {
            let mut set = Set::new(0, 16);
            set.set_max_load_factor(z);
            for key in 0..500u64 {
                set.lookup_insert(key * 3, &mut NoResizeObserver);
                assert!(
                    set.size() as f64 <= set.table_size() as f64 * z + f64::EPSILON,
                    "z={z}"
                );
            }
        }
    }

    #[test]
    fn move_into_empties_the_source() {
        let mut a = Set::new(0, 10);
        for key in 0..50u64 {
            a.lookup_insert(key, &mut NoResizeObserver);
        }
        let mut b = Set::new(128, 10);
        a.move_into(&mut b, &mut NoResizeObserver);
        assert_eq!(a.size(), 0);
        assert_eq!(b.size(), 50);
        for key in 0..50u64 {
            assert!(b.contains(key));
            assert!(!a.contains(key));
        }
    }
}
