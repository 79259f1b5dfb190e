//! Hash-backed tries.
//!
//! [`HashTrie`] keys a map by `(parent_id << 8) | symbol` and stores the
//! child id as the value.  [`RollingTrie`] instead looks edges up under a
//! rolling xxh64 over the root-to-node symbol path: every node carries the
//! hash of its path, a child's hash is the parent's hash rolled forward by
//! one symbol, and that value is the table key.  Distinct paths may collide,
//! so a bucket holds its edges verbatim and matches them exactly.

use std::collections::HashMap;

use xxhash_rust::xxh64::{xxh64, Xxh64Builder};

use crate::meta::config::Config;
use crate::meta::meta_builder::{Algorithm, Meta};

use super::{lz_trie_type, LzTrie, TrieNode};

#[inline]
fn edge_key(parent: u64, symbol: u8) -> u64 {
    (parent << 8) | symbol as u64
}

// ─────────────────────────────────────────────────────────────────────────────
// HashTrie
// ─────────────────────────────────────────────────────────────────────────────

pub struct HashTrie {
    edges: HashMap<u64, u64>,
    size: usize,
}

impl Algorithm for HashTrie {
    fn meta() -> Meta {
        Meta::new(lz_trie_type(), "hash", "hash map over (parent, symbol) edges")
    }
}

impl LzTrie for HashTrie {
    fn with_config(_cfg: &Config, _n: usize, reserve: usize) -> anyhow::Result<Self> {
        Ok(HashTrie { edges: HashMap::with_capacity(reserve), size: 0 })
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
        let key = edge_key(parent.id(), symbol);
        if let Some(&child) = self.edges.get(&key) {
            return TrieNode::new(child, false);
        }
        let child = self.size as u64;
        self.edges.insert(key, child);
        self.size += 1;
        TrieNode::new(child, true)
    }

    fn size(&self) -> usize {
        self.size
    }

    fn clear(&mut self) {
        self.edges.clear();
        self.size = 0;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RollingTrie
// ─────────────────────────────────────────────────────────────────────────────

/// Seed of the per-root path hashes.
const ROLLING_SEED: u64 = 0x5851_f42d_4c95_7f2d;

/// One edge of the trie, stored verbatim inside its hash bucket.
struct RollingEdge {
    parent: u64,
    symbol: u8,
    child: u64,
}

pub struct RollingTrie {
    /// Rolling hash of the root-to-node symbol path, indexed by node id.
    path_hash: Vec<u64>,
    /// Rolled path hash of the child -> edges that hashed there.
    buckets: HashMap<u64, Vec<RollingEdge>, Xxh64Builder>,
}

impl RollingTrie {
    /// Advances a path hash by one consumed symbol.
    #[inline]
    fn roll(hash: u64, symbol: u8) -> u64 {
        xxh64(&[symbol], hash)
    }
}

impl Algorithm for RollingTrie {
    fn meta() -> Meta {
        Meta::new(lz_trie_type(), "rolling", "trie keyed by a rolling xxh64 over the symbol path")
    }
}

impl LzTrie for RollingTrie {
    fn with_config(_cfg: &Config, _n: usize, reserve: usize) -> anyhow::Result<Self> {
        Ok(RollingTrie {
            path_hash: Vec::with_capacity(reserve),
            buckets: HashMap::with_capacity_and_hasher(reserve, Xxh64Builder::new(0)),
        })
    }

    fn add_rootnode(&mut self, root_id: u64) -> TrieNode {
        debug_assert_eq!(root_id as usize, self.path_hash.len());
        // multi-root tries need distinct path hashes per root
        self.path_hash.push(xxh64(&root_id.to_le_bytes(), ROLLING_SEED));
        TrieNode::new(root_id, false)
    }

    fn get_rootnode(&self, root_id: u64) -> TrieNode {
        debug_assert!((root_id as usize) < self.path_hash.len());
        TrieNode::new(root_id, false)
    }

    fn find_or_insert(&mut self, parent: TrieNode, symbol: u8) -> TrieNode {
        let rolled = Self::roll(self.path_hash[parent.id() as usize], symbol);
        let bucket = self.buckets.entry(rolled).or_default();
        if let Some(edge) =
            bucket.iter().find(|e| e.parent == parent.id() && e.symbol == symbol)
        {
            return TrieNode::new(edge.child, false);
        }
        let child = self.path_hash.len() as u64;
        bucket.push(RollingEdge { parent: parent.id(), symbol, child });
        self.path_hash.push(rolled);
        TrieNode::new(child, true)
    }

    fn size(&self) -> usize {
        self.path_hash.len()
    }

    fn clear(&mut self) {
        self.path_hash.clear();
        self.buckets.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn build<T: LzTrie>() -> T {
        let meta = T::meta();
        let mut lib = meta.known().clone();
        lib.insert(meta.decl()).unwrap();
        let cfg = Config::resolve(
            meta.decl(),
            &crate::meta::parser::parse(meta.name()).unwrap(),
            &lib,
        )
        .unwrap();
        T::with_config(&cfg, 64, 16).unwrap()
    }

    #[test]
    fn rolling_hash_advances_along_the_path() {
        let mut trie: RollingTrie = build();
        trie.add_rootnode(0);
        let root = trie.get_rootnode(0);

        let a = trie.find_or_insert(root, b'a');
        let ab = trie.find_or_insert(a, b'b');
        assert_eq!(trie.path_hash[a.id() as usize], RollingTrie::roll(trie.path_hash[0], b'a'));
        assert_eq!(
            trie.path_hash[ab.id() as usize],
            RollingTrie::roll(trie.path_hash[a.id() as usize], b'b')
        );
        // same prefix, different branch: different rolled key
        let ac = trie.find_or_insert(a, b'c');
        assert_ne!(trie.path_hash[ab.id() as usize], trie.path_hash[ac.id() as usize]);
    }

    #[test]
    fn rolling_and_plain_agree_on_ids() {
        let input = b"abcdebcdeabcabcde";
        let mut rolling: RollingTrie = build();
        let mut plain: HashTrie = build();
        rolling.add_rootnode(0);
        plain.add_rootnode(0);

        let mut rn = rolling.get_rootnode(0);
        let mut pn = plain.get_rootnode(0);
        for &c in input {
            let rc = rolling.find_or_insert(rn, c);
            let pc = plain.find_or_insert(pn, c);
            assert_eq!(rc.id(), pc.id());
            assert_eq!(rc.is_new(), pc.is_new());
            if rc.is_new() {
                rn = rolling.get_rootnode(0);
                pn = plain.get_rootnode(0);
            } else {
                rn = rc;
                pn = pc;
            }
        }
        assert_eq!(rolling.size(), plain.size());
    }
}
