// e2e/trie.rs — LZ78 trie structure and id-assignment fixtures.
//
// Feeds fixture strings byte by byte through the trie interface, mirrors the
// insertions in a reference tree, and checks both the final shape and the
// exact ids.  Ids are assigned in insertion order across every backing, so
// the full check (including `id()` values seen during traversal) applies to
// all of them.

use tdc::meta::config::Config;
use tdc::meta::meta_builder::Algorithm;
use tdc::trie::{
    BinarySortedTrie, BinaryTrie, CompactHashTrie, EliasDisplacement, HashTrie,
    LayeredDisplacementStrategy, LzTrie, NaiveDisplacementStrategy, RollingTrie, TernaryTrie,
};

// ─────────────────────────────────────────────────────────────────────────────
// Reference tree
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
struct TestTrieElement {
    chr: u8,
    id: u64,
    children: Vec<TestTrieElement>,
}

fn t(chr: u8, id: u64, children: Vec<TestTrieElement>) -> TestTrieElement {
    TestTrieElement { chr, id, children }
}

impl TestTrieElement {
    fn add(&mut self, chr: u8, id: u64) {
        self.children.push(t(chr, id, vec![]));
        self.children.sort_by_key(|e| e.chr);
    }

    fn find(&mut self, chr: u8) -> Option<&mut TestTrieElement> {
        self.children.iter_mut().find(|e| e.chr == chr)
    }
}

struct TestTrie {
    input: &'static [u8],
    root: TestTrieElement,
}

fn trie_test_single<T: LzTrie>(test: &TestTrie) {
    let mut is_trie = t(0, 0, vec![]);
    let mut is_trie_size: u64 = 1;

    let remaining = test.input.len();
    let mut trie = build_trie::<T>(remaining);
    trie.add_rootnode(0);

    let mut path: Vec<u8> = Vec::new();
    let mut node = trie.get_rootnode(0);

    for &c in test.input {
        trie.signal_character_read();
        let child = trie.find_or_insert(node, c);

        if child.is_new() {
            // mirror the insertion and verify the fresh id
            {
                let cursor = walk(&mut is_trie, &path);
                cursor.add(c, is_trie_size);
            }
            assert_eq!(child.id(), is_trie_size, "fresh child id");
            is_trie_size += 1;
            path.clear();
            node = trie.get_rootnode(0);
        } else {
            path.push(c);
            let expected_id = walk(&mut is_trie, &path).id;
            assert_eq!(child.id(), expected_id, "id of existing node on path {path:?}");
            node = child;
        }
    }

    assert_eq!(test.root, is_trie, "tree shape for input {:?}", test.input);
    assert_eq!(is_trie_size, trie.size() as u64, "node count");
}

/// Walks the reference tree along `path` from the root.
fn walk<'a>(root: &'a mut TestTrieElement, path: &[u8]) -> &'a mut TestTrieElement {
    let mut cur = root;
    for &c in path {
        cur = cur.find(c).expect("path must exist in the reference tree");
    }
    cur
}

fn build_trie<T: LzTrie>(n: usize) -> T {
    let meta = T::meta();
    let mut lib = meta.known().clone();
    lib.insert(meta.decl()).unwrap();
    let cfg = Config::resolve(
        meta.decl(),
        &tdc::meta::parser::parse(meta.name()).unwrap(),
        &lib,
    )
    .unwrap();
    T::with_config(&cfg, n, n).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

fn fixtures() -> Vec<TestTrie> {
    vec![
        TestTrie {
            input: b"abcdebcdeabc",
            root: t(0, 0, vec![
                t(b'a', 1, vec![t(b'b', 8, vec![])]),
                t(b'b', 2, vec![t(b'c', 6, vec![])]),
                t(b'c', 3, vec![]),
                t(b'd', 4, vec![t(b'e', 7, vec![])]),
                t(b'e', 5, vec![]),
            ]),
        },
        TestTrie {
            input: b"a",
            root: t(0, 0, vec![t(b'a', 1, vec![])]),
        },
        TestTrie {
            input: b"aaabbbab",
            root: t(0, 0, vec![
                t(b'a', 1, vec![t(b'a', 2, vec![]), t(b'b', 5, vec![])]),
                t(b'b', 3, vec![t(b'b', 4, vec![])]),
            ]),
        },
        TestTrie {
            input: b"abcdefgh#defgh_abcde",
            root: t(0, 0, vec![
                t(b'#', 9, vec![]),
                t(b'a', 1, vec![t(b'b', 13, vec![])]),
                t(b'b', 2, vec![]),
                t(b'c', 3, vec![t(b'd', 14, vec![])]),
                t(b'd', 4, vec![t(b'e', 10, vec![])]),
                t(b'e', 5, vec![]),
                t(b'f', 6, vec![t(b'g', 11, vec![])]),
                t(b'g', 7, vec![]),
                t(b'h', 8, vec![t(b'_', 12, vec![])]),
            ]),
        },
        TestTrie {
            input: "ประเทศไทย中华Việt Nam".as_bytes(),
            root: t(0, 0, vec![
                t(32, 25, vec![]),
                t(78, 26, vec![]),
                t(86, 19, vec![]),
                t(97, 27, vec![]),
                t(105, 20, vec![]),
                t(109, 28, vec![]),
                t(116, 24, vec![]),
                t(128, 8, vec![]),
                t(135, 23, vec![]),
                t(141, 17, vec![]),
                t(142, 18, vec![]),
                t(155, 3, vec![]),
                t(163, 5, vec![]),
                t(184, 2, vec![t(162, 13, vec![]), t(173, 15, vec![])]),
                t(187, 22, vec![]),
                t(224, 1, vec![
                    t(184, 4, vec![
                        t(151, 9, vec![t(224, 12, vec![])]),
                        t(168, 10, vec![]),
                        t(176, 6, vec![]),
                    ]),
                    t(185, 7, vec![t(132, 11, vec![])]),
                ]),
                t(225, 21, vec![]),
                t(228, 14, vec![]),
                t(229, 16, vec![]),
            ]),
        },
        TestTrie {
            input: b"0\t100009425\t0.1661:0.1661\t#businessfo",
            root: t(0, 0, vec![
                t(9, 2, vec![t(b'0', 9, vec![])]),
                t(b'#', 17, vec![]),
                t(b'.', 10, vec![]),
                t(b'0', 1, vec![
                    t(b'.', 14, vec![]),
                    t(b'0', 4, vec![t(b'9', 5, vec![])]),
                ]),
                t(b'1', 3, vec![
                    t(9, 16, vec![]),
                    t(b'6', 11, vec![t(b'6', 15, vec![])]),
                    t(b':', 13, vec![]),
                ]),
                t(b'2', 7, vec![]),
                t(b'4', 6, vec![]),
                t(b'5', 8, vec![]),
                t(b'6', 12, vec![]),
                t(b'b', 18, vec![]),
                t(b'e', 23, vec![]),
                t(b'f', 25, vec![]),
                t(b'i', 21, vec![]),
                t(b'n', 22, vec![]),
                t(b'o', 26, vec![]),
                t(b's', 20, vec![t(b's', 24, vec![])]),
                t(b'u', 19, vec![]),
            ]),
        },
    ]
}

fn trie_test<T: LzTrie>() {
    for fixture in fixtures() {
        trie_test_single::<T>(&fixture);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// One test per backing
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn binary_trie() {
    trie_test::<BinaryTrie>();
}

#[test]
fn binary_sorted_trie() {
    trie_test::<BinarySortedTrie>();
}

#[test]
fn ternary_trie() {
    trie_test::<TernaryTrie>();
}

#[test]
fn hash_trie() {
    trie_test::<HashTrie>();
}

#[test]
fn rolling_trie() {
    trie_test::<RollingTrie>();
}

#[test]
fn compact_hash_trie() {
    trie_test::<CompactHashTrie<NaiveDisplacementStrategy>>();
}

#[test]
fn compact_hash_trie_layered() {
    trie_test::<CompactHashTrie<LayeredDisplacementStrategy>>();
}

#[test]
fn compact_hash_trie_elias() {
    trie_test::<CompactHashTrie<EliasDisplacement>>();
}

// ─────────────────────────────────────────────────────────────────────────────
// Multi-root surface (LZW)
// ─────────────────────────────────────────────────────────────────────────────

fn multiroot_test<T: LzTrie>() {
    let mut trie = build_trie::<T>(64);
    for b in 0u64..=255 {
        let root = trie.add_rootnode(b);
        assert_eq!(root.id(), b);
    }
    assert_eq!(trie.size(), 256);

    let a = trie.get_rootnode(b'a' as u64);
    let child = trie.find_or_insert(a, b'b');
    assert!(child.is_new());
    assert_eq!(child.id(), 256);

    // same edge again: found, same id
    let again = trie.find_or_insert(a, b'b');
    assert!(!again.is_new());
    assert_eq!(again.id(), 256);

    // clear drops the roots too
    trie.clear();
    assert_eq!(trie.size(), 0);
}

#[test]
fn multiroot_surface() {
    multiroot_test::<BinaryTrie>();
    multiroot_test::<BinarySortedTrie>();
    multiroot_test::<TernaryTrie>();
    multiroot_test::<HashTrie>();
    multiroot_test::<RollingTrie>();
    multiroot_test::<CompactHashTrie<NaiveDisplacementStrategy>>();
}
