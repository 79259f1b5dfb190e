// benches/trie.rs — trie insertion throughput across backings.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use tdc::meta::config::Config;
use tdc::meta::meta_builder::Algorithm;
use tdc::trie::{
    BinarySortedTrie, BinaryTrie, CompactHashTrie, HashTrie, LzTrie, NaiveDisplacementStrategy,
    TernaryTrie,
};

fn text(len: usize) -> Vec<u8> {
    let mut x = 0x9e3779b97f4a7c15u64;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            (x % 16) as u8 + b'a'
        })
        .collect()
}

fn build<T: LzTrie>(n: usize) -> T {
    let meta = T::meta();
    let mut lib = meta.known().clone();
    lib.insert(meta.decl()).unwrap();
    let cfg = Config::resolve(
        meta.decl(),
        &tdc::meta::parser::parse(meta.name()).unwrap(),
        &lib,
    )
    .unwrap();
    T::with_config(&cfg, n, n / 4).unwrap()
}

fn factorise<T: LzTrie>(input: &[u8]) -> usize {
    let mut trie = build::<T>(input.len());
    trie.add_rootnode(0);
    let mut node = trie.get_rootnode(0);
    let mut factors = 0usize;
    for &c in input {
        let child = trie.find_or_insert(node, c);
        if child.is_new() {
            factors += 1;
            node = trie.get_rootnode(0);
        } else {
            node = child;
        }
    }
    factors
}

fn bench_tries(c: &mut Criterion) {
    let input = text(64 * 1024);
    let mut group = c.benchmark_group("lz78_trie_insert");
    group.bench_function("binary", |b| b.iter(|| factorise::<BinaryTrie>(black_box(&input))));
    group.bench_function("binary_sorted", |b| {
        b.iter(|| factorise::<BinarySortedTrie>(black_box(&input)))
    });
    group.bench_function("ternary", |b| b.iter(|| factorise::<TernaryTrie>(black_box(&input))));
    group.bench_function("hash", |b| b.iter(|| factorise::<HashTrie>(black_box(&input))));
    group.bench_function("compact_hash", |b| {
        b.iter(|| factorise::<CompactHashTrie<NaiveDisplacementStrategy>>(black_box(&input)))
    });
    group.finish();
}

criterion_group!(benches, bench_tries);
criterion_main!(benches);
