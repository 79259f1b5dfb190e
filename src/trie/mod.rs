//! LZ78 dictionary tries.
//!
//! A trie maps factor prefixes to integer ids.  Ids are assigned in
//! insertion order (the root of a single-root trie gets id 0, the `k`-th
//! inserted child gets id `k`), and that order is exactly the LZ78 factor
//! emission order, which the factor coders rely on.
//!
//! Every backing stores child ids explicitly, so ids stay stable across any
//! internal reorganisation (hash table resizes included).

pub mod binary;
pub mod binary_sorted;
pub mod compact;
pub mod hash;
pub mod ternary;

pub use binary::BinaryTrie;
pub use binary_sorted::BinarySortedTrie;
pub use compact::{CompactHashTrie, EliasDisplacement, LayeredDisplacementStrategy, NaiveDisplacementStrategy};
pub use hash::{HashTrie, RollingTrie};
pub use ternary::TernaryTrie;

use crate::meta::config::Config;
use crate::meta::decl::TypeDesc;
use crate::meta::meta_builder::Algorithm;

/// The algorithm type of trie strategies.
pub fn lz_trie_type() -> TypeDesc {
    TypeDesc::new("lz_trie")
}

/// Opaque handle to a trie node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrieNode {
    id: u64,
    is_new: bool,
}

impl TrieNode {
    pub fn new(id: u64, is_new: bool) -> Self {
        TrieNode { id, is_new }
    }

    /// Insertion-order id; 0 is the first root.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True iff the last `find_or_insert` created this node.
    pub fn is_new(&self) -> bool {
        self.is_new
    }
}

/// Dictionary trie used by the LZ78/LZW factorisers.
pub trait LzTrie: Algorithm {
    /// Constructs a trie for an input of `n` bytes, reserving room for about
    /// `reserve` nodes.
    fn with_config(cfg: &Config, n: usize, reserve: usize) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Adds a root; roots must be added with consecutive ids starting at 0.
    fn add_rootnode(&mut self, root_id: u64) -> TrieNode;

    fn get_rootnode(&self, root_id: u64) -> TrieNode;

    /// Finds the child of `parent` under `symbol`, inserting it if absent.
    /// A freshly created child has `id() == size() - 1` and `is_new()`.
    fn find_or_insert(&mut self, parent: TrieNode, symbol: u8) -> TrieNode;

    /// Number of nodes including roots.
    fn size(&self) -> usize;

    /// Resets to an empty trie with no roots.
    fn clear(&mut self);

    /// Advisory hook for tries that track state per consumed input symbol.
    fn signal_character_read(&mut self) {}
}
