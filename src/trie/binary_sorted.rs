//! Trie with per-node sorted child arrays and binary search.

use crate::meta::config::Config;
use crate::meta::meta_builder::{Algorithm, Meta};

use super::{lz_trie_type, LzTrie, TrieNode};

struct Node {
    /// `(symbol, child_id)` sorted by symbol.
    children: Vec<(u8, u32)>,
}

pub struct BinarySortedTrie {
    nodes: Vec<Node>,
}

impl Algorithm for BinarySortedTrie {
    fn meta() -> Meta {
        Meta::new(lz_trie_type(), "binary_sorted", "trie with sorted child arrays")
    }
}

impl LzTrie for BinarySortedTrie {
    fn with_config(_cfg: &Config, _n: usize, reserve: usize) -> anyhow::Result<Self> {
        Ok(BinarySortedTrie { nodes: Vec::with_capacity(reserve) })
    }

    fn add_rootnode(&mut self, root_id: u64) -> TrieNode {
        debug_assert_eq!(root_id as usize, self.nodes.len());
        self.nodes.push(Node { children: Vec::new() });
        TrieNode::new(root_id, false)
    }

    fn get_rootnode(&self, root_id: u64) -> TrieNode {
        debug_assert!((root_id as usize) < self.nodes.len());
        TrieNode::new(root_id, false)
    }

    fn find_or_insert(&mut self, parent: TrieNode, symbol: u8) -> TrieNode {
        let parent_idx = parent.id() as usize;
        match self.nodes[parent_idx].children.binary_search_by_key(&symbol, |&(s, _)| s) {
            Ok(pos) => {
                let id = self.nodes[parent_idx].children[pos].1;
                TrieNode::new(id as u64, false)
            }
            Err(pos) => {
                let id = self.nodes.len() as u32;
                self.nodes.push(Node { children: Vec::new() });
                self.nodes[parent_idx].children.insert(pos, (symbol, id));
                TrieNode::new(id as u64, true)
            }
        }
    }

    fn size(&self) -> usize {
        self.nodes.len()
    }

    fn clear(&mut self) {
        self.nodes.clear();
    }
}
