// e2e/compact_hash.rs — compact hash set/map stress across configurations.

use tdc::hash::displacement::{
    Displacement, EliasGammaDisplacement, LayeredDisplacement, NaiveDisplacement,
};
use tdc::hash::hash_fn::{KeyHash, PoplarXorShiftHash, XorShiftHash};
use tdc::hash::map::CompactHashMap;
use tdc::hash::set::{CompactHashSet, NoResizeObserver, ResizeObserver};
use tdc::hash::storage::{PlainStorage, SlotStorage, SparseBucketStorage};

const KEY_COUNT: u64 = 10_000;
const KEY_WIDTH: u32 = 18; // 9999 * 13 = 129_987 < 2^18

fn stress_set<H, D, S>(load_factor: f64)
where
    H: KeyHash,
    D: Displacement,
    S: SlotStorage,
{
    let mut set: CompactHashSet<H, D, S> = CompactHashSet::new(0, KEY_WIDTH);
    set.set_max_load_factor(load_factor);

    for i in 1..KEY_COUNT {
        let entry = set.lookup_insert(i * 13, &mut NoResizeObserver);
        assert!(!entry.existed, "key {} inserted twice", i * 13);
        assert!(
            set.size() as f64 <= set.table_size() as f64 * load_factor + f64::EPSILON,
            "load factor bound violated at size {}",
            set.size()
        );
    }
    assert_eq!(set.size() as u64, KEY_COUNT - 1);

    for i in 1..KEY_COUNT {
        let entry = set.lookup(i * 13);
        assert!(entry.is_some(), "key {} lost", i * 13);
        assert_eq!(set.count(i * 13), 1);
    }
    assert!(set.lookup(KEY_COUNT * 13).is_none());
    assert_eq!(set.count(KEY_COUNT * 13), 0);
}

#[test]
fn set_stress_across_load_factors() {
    for tenth in 1..=10 {
        let z = tenth as f64 / 10.0;
        stress_set::<XorShiftHash, NaiveDisplacement, PlainStorage>(z);
    }
}

#[test]
fn set_stress_other_configurations() {
    stress_set::<PoplarXorShiftHash, NaiveDisplacement, PlainStorage>(0.5);
    stress_set::<XorShiftHash, LayeredDisplacement, PlainStorage>(0.5);
    stress_set::<XorShiftHash, EliasGammaDisplacement, PlainStorage>(0.5);
    stress_set::<XorShiftHash, NaiveDisplacement, SparseBucketStorage>(0.5);
    stress_set::<PoplarXorShiftHash, LayeredDisplacement, SparseBucketStorage>(0.9);
}

// ─────────────────────────────────────────────────────────────────────────────
// Resize observer accounting
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    resizes: Vec<usize>,
    reinserted: Vec<u64>,
    live_at_resize: Vec<usize>,
    current_live: usize,
}

impl ResizeObserver for Recorder {
    fn on_resize(&mut self, new_capacity: usize) {
        self.resizes.push(new_capacity);
        self.live_at_resize.push(self.current_live);
        self.reinserted.clear();
    }
    fn on_reinsert(&mut self, key: u64, _new_id: u64) {
        self.reinserted.push(key);
    }
}

#[test]
fn every_live_element_is_reinserted_once_per_resize() {
    let mut set: CompactHashSet<XorShiftHash, NaiveDisplacement, PlainStorage> =
        CompactHashSet::new(4, 16);
    let mut rec = Recorder::default();

    for i in 0..500u64 {
        let entry = set.lookup_insert(i * 31 % 65_536, &mut rec);
        if !entry.existed {
            rec.current_live += 1;
        }
    }

    assert!(!rec.resizes.is_empty());
    // capacities grow monotonically
    for w in rec.resizes.windows(2) {
        assert!(w[0] < w[1]);
    }
    // the last resize re-reported exactly the elements alive at that point
    let last_live = *rec.live_at_resize.last().unwrap();
    assert_eq!(rec.reinserted.len(), last_live);
    let mut unique = rec.reinserted.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), last_live, "duplicate reinsert callbacks");
}

#[test]
fn ids_are_stable_between_resizes() {
    let mut set: CompactHashSet<XorShiftHash, NaiveDisplacement, PlainStorage> =
        CompactHashSet::new(1024, 16);
    set.set_max_load_factor(0.5);

    let a = set.lookup_insert(100, &mut NoResizeObserver);
    let b = set.lookup_insert(200, &mut NoResizeObserver);
    // well under the load limit: no resize can have happened
    for filler in 0..100u64 {
        set.lookup_insert(1000 + filler, &mut NoResizeObserver);
    }
    assert_eq!(set.lookup(100).unwrap().id, a.id);
    assert_eq!(set.lookup(200).unwrap().id, b.id);
}

#[test]
fn explicit_key_width_growth() {
    let mut set: CompactHashSet<XorShiftHash, NaiveDisplacement, PlainStorage> =
        CompactHashSet::new(0, 4);
    for k in 0..16u64 {
        set.lookup_insert(k, &mut NoResizeObserver);
    }
    set.grow_key_width(20, &mut NoResizeObserver);
    assert!(set.key_width() >= 20);
    for k in 0..16u64 {
        assert!(set.contains(k), "key {k} lost across widening");
    }
    set.lookup_insert(1 << 19, &mut NoResizeObserver);
    assert!(set.contains(1 << 19));
}

#[test]
fn move_into_drains_the_source() {
    let mut a: CompactHashSet<XorShiftHash, NaiveDisplacement, PlainStorage> =
        CompactHashSet::new(0, 14);
    for k in 0..300u64 {
        a.lookup_insert(k * 37 % 16_384, &mut NoResizeObserver);
    }
    let live = a.size();

    let mut b: CompactHashSet<XorShiftHash, NaiveDisplacement, PlainStorage> =
        CompactHashSet::new(2048, 14);
    let mut rec = Recorder { current_live: live, ..Default::default() };
    a.move_into(&mut b, &mut rec);

    assert_eq!(a.size(), 0);
    assert_eq!(b.size(), live);
    assert_eq!(rec.reinserted.len(), live);
}

// ─────────────────────────────────────────────────────────────────────────────
// Map
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn map_stress_with_value_growth() {
    let mut map: CompactHashMap<PoplarXorShiftHash, NaiveDisplacement, PlainStorage> =
        CompactHashMap::new(0, 8, 4);

    for i in 0..5_000u64 {
        let key = i * 13 % 1_048_576;
        let kw = 64 - key.leading_zeros().min(63);
        let vw = 64 - i.leading_zeros().min(63);
        map.insert_kv_width(key, i, kw.max(1), vw.max(1), &mut NoResizeObserver);
    }

    // first writer wins; keys repeat with period 1_048_576 / 13 > 5_000, so
    // every key is unique here
    for i in 0..5_000u64 {
        let key = i * 13 % 1_048_576;
        assert_eq!(map.get(key), Some(i), "value for key {key}");
    }
    assert_eq!(map.get(999_999), None);
}

#[test]
fn map_update_and_default_insert() {
    let mut map: CompactHashMap<XorShiftHash, LayeredDisplacement, PlainStorage> =
        CompactHashMap::new(0, 12, 12);
    assert_eq!(map.get_or_insert_with_default(77, 5, &mut NoResizeObserver), 5);
    map.update(77, 6);
    assert_eq!(map.get_or_insert_with_default(77, 5, &mut NoResizeObserver), 6);
    assert_eq!(map.get(77), Some(6));
}
