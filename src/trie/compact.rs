//! Trie over the compact hash map.
//!
//! Each trie edge is one `lookup_insert` on a [`CompactHashMap`] keyed by
//! `(parent_id << 8) | symbol`; the child id is the stored value, so ids
//! survive table resizes without any external rebuild.  The displacement
//! strategy of the underlying table is the type parameter — one registered
//! trie per encoding.

use crate::ds::int_vector::IntVector;
use crate::hash::displacement::{
    Displacement, EliasGammaDisplacement, LayeredDisplacement, NaiveDisplacement,
};
use crate::hash::hash_fn::PoplarXorShiftHash;
use crate::hash::map::CompactHashMap;
use crate::hash::set::NoResizeObserver;
use crate::hash::storage::PlainStorage;
use crate::meta::config::Config;
use crate::meta::meta_builder::{Algorithm, Meta};

use super::{lz_trie_type, LzTrie, TrieNode};

/// Names the registered trie for a displacement encoding.
pub trait DisplacementStrategy {
    type Table: Displacement;
    const NAME: &'static str;
    const DESC: &'static str;
}

pub struct NaiveDisplacementStrategy;
impl DisplacementStrategy for NaiveDisplacementStrategy {
    type Table = NaiveDisplacement;
    const NAME: &'static str = "compact_hash";
    const DESC: &'static str = "compact hash trie, plain displacement table";
}

pub struct LayeredDisplacementStrategy;
impl DisplacementStrategy for LayeredDisplacementStrategy {
    type Table = LayeredDisplacement;
    const NAME: &'static str = "compact_hash_layered";
    const DESC: &'static str = "compact hash trie, layered fixed/elastic displacement";
}

pub struct EliasDisplacement;
impl DisplacementStrategy for EliasDisplacement {
    type Table = EliasGammaDisplacement;
    const NAME: &'static str = "compact_hash_elias";
    const DESC: &'static str = "compact hash trie, Elias-gamma coded displacement";
}

pub struct CompactHashTrie<D: DisplacementStrategy> {
    map: CompactHashMap<PoplarXorShiftHash, D::Table, PlainStorage>,
    size: usize,
}

impl<D: DisplacementStrategy> CompactHashTrie<D> {
    /// Key width needed for edges out of the current id space.
    fn edge_key_width(&self) -> u32 {
        IntVector::width_for(((self.size as u64) << 8) | 0xff)
    }

    fn id_width(&self) -> u32 {
        IntVector::width_for(self.size as u64)
    }
}

impl<D: DisplacementStrategy> Algorithm for CompactHashTrie<D> {
    fn meta() -> Meta {
        Meta::new(lz_trie_type(), D::NAME, D::DESC)
    }
}

impl<D: DisplacementStrategy> LzTrie for CompactHashTrie<D> {
    fn with_config(_cfg: &Config, _n: usize, reserve: usize) -> anyhow::Result<Self> {
        Ok(CompactHashTrie { map: CompactHashMap::new(reserve, 9, 1), size: 0 })
    }

    fn add_rootnode(&mut self, root_id: u64) -> TrieNode {
        debug_assert_eq!(root_id as usize, self.size);
        self.size += 1;
        TrieNode::new(root_id, false)
    }

    fn get_rootnode(&self, root_id: u64) -> TrieNode {
        TrieNode::new(root_id, false)
    }

    fn find_or_insert(&mut self, parent: TrieNode, symbol: u8) -> TrieNode {
        let key = (parent.id() << 8) | symbol as u64;
        let child = self.size as u64;
        let entry = self.map.insert_kv_width(
            key,
            child,
            self.edge_key_width(),
            self.id_width(),
            &mut NoResizeObserver,
        );
        if entry.existed {
            TrieNode::new(entry.value, false)
        } else {
            self.size += 1;
            TrieNode::new(child, true)
        }
    }

    fn size(&self) -> usize {
        self.size
    }

    fn clear(&mut self) {
        self.map = CompactHashMap::new(0, 9, 1);
        self.size = 0;
    }
}
