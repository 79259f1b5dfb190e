//! First-child / next-sibling trie.
//!
//! Each node stores the head of an unsorted child list; `find_or_insert`
//! walks the sibling chain.  Smallest constant factors for small alphabets,
//! degrades on wide nodes.

use crate::meta::config::Config;
use crate::meta::meta_builder::{Algorithm, Meta};

use super::{lz_trie_type, LzTrie, TrieNode};

const NONE: u32 = u32::MAX;

struct Node {
    symbol: u8,
    first_child: u32,
    next_sibling: u32,
}

pub struct BinaryTrie {
    nodes: Vec<Node>,
}

impl Algorithm for BinaryTrie {
    fn meta() -> Meta {
        Meta::new(lz_trie_type(), "binary", "first-child/next-sibling trie")
    }
}

impl LzTrie for BinaryTrie {
    fn with_config(_cfg: &Config, _n: usize, reserve: usize) -> anyhow::Result<Self> {
        Ok(BinaryTrie { nodes: Vec::with_capacity(reserve) })
    }

    fn add_rootnode(&mut self, root_id: u64) -> TrieNode {
        debug_assert_eq!(root_id as usize, self.nodes.len());
        self.nodes.push(Node { symbol: 0, first_child: NONE, next_sibling: NONE });
        TrieNode::new(root_id, false)
    }

    fn get_rootnode(&self, root_id: u64) -> TrieNode {
        debug_assert!((root_id as usize) < self.nodes.len());
        TrieNode::new(root_id, false)
    }

    fn find_or_insert(&mut self, parent: TrieNode, symbol: u8) -> TrieNode {
        let parent_idx = parent.id() as usize;
        let mut cursor = self.nodes[parent_idx].first_child;
        let mut last = NONE;
        while cursor != NONE {
            let node = &self.nodes[cursor as usize];
            if node.symbol == symbol {
                return TrieNode::new(cursor as u64, false);
            }
            last = cursor;
            cursor = node.next_sibling;
        }

        let id = self.nodes.len() as u32;
        self.nodes.push(Node { symbol, first_child: NONE, next_sibling: NONE });
        if last == NONE {
            self.nodes[parent_idx].first_child = id;
        } else {
            self.nodes[last as usize].next_sibling = id;
        }
        TrieNode::new(id as u64, true)
    }

    fn size(&self) -> usize {
        self.nodes.len()
    }

    fn clear(&mut self) {
        self.nodes.clear();
    }
}
