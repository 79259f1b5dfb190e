//! Ternary search trie.
//!
//! The children of each trie node form a binary search tree over symbols;
//! trie nodes and BST nodes share an arena, linked by indices.  The default
//! dictionary of the LZ78 family.

use crate::meta::config::Config;
use crate::meta::meta_builder::{Algorithm, Meta};

use super::{lz_trie_type, LzTrie, TrieNode};

const NONE: u32 = u32::MAX;

/// One BST node; `child` is the trie node id reached through `symbol`.
struct SearchNode {
    symbol: u8,
    lo: u32,
    hi: u32,
    child: u32,
}

pub struct TernaryTrie {
    /// Per trie node: the root of its child BST.
    bst_roots: Vec<u32>,
    arena: Vec<SearchNode>,
}

impl Algorithm for TernaryTrie {
    fn meta() -> Meta {
        Meta::new(lz_trie_type(), "ternary", "ternary search trie")
    }
}

impl LzTrie for TernaryTrie {
    fn with_config(_cfg: &Config, _n: usize, reserve: usize) -> anyhow::Result<Self> {
        Ok(TernaryTrie {
            bst_roots: Vec::with_capacity(reserve),
            arena: Vec::with_capacity(reserve),
        })
    }

    fn add_rootnode(&mut self, root_id: u64) -> TrieNode {
        debug_assert_eq!(root_id as usize, self.bst_roots.len());
        self.bst_roots.push(NONE);
        TrieNode::new(root_id, false)
    }

    fn get_rootnode(&self, root_id: u64) -> TrieNode {
        debug_assert!((root_id as usize) < self.bst_roots.len());
        TrieNode::new(root_id, false)
    }

    fn find_or_insert(&mut self, parent: TrieNode, symbol: u8) -> TrieNode {
        let parent_idx = parent.id() as usize;

        // descend the BST, remembering where to hang a new leaf
        let mut slot_is_root = true;
        let mut slot_node = 0u32;
        let mut slot_is_lo = false;
        let mut cursor = self.bst_roots[parent_idx];

        while cursor != NONE {
            let node = &self.arena[cursor as usize];
            if symbol == node.symbol {
                return TrieNode::new(node.child as u64, false);
            }
            slot_is_root = false;
            slot_node = cursor;
            slot_is_lo = symbol < node.symbol;
            cursor = if slot_is_lo { node.lo } else { node.hi };
        }

        let child_id = self.bst_roots.len() as u32;
        self.bst_roots.push(NONE);

        let bst_idx = self.arena.len() as u32;
        self.arena.push(SearchNode { symbol, lo: NONE, hi: NONE, child: child_id });

        if slot_is_root {
            self.bst_roots[parent_idx] = bst_idx;
        } else if slot_is_lo {
            self.arena[slot_node as usize].lo = bst_idx;
        } else {
            self.arena[slot_node as usize].hi = bst_idx;
        }

        TrieNode::new(child_id as u64, true)
    }

    fn size(&self) -> usize {
        self.bst_roots.len()
    }

    fn clear(&mut self) {
        self.bst_roots.clear();
        self.arena.clear();
    }
}
