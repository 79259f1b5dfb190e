// benches/bits.rs — bit stream write/read throughput.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use tdc::io::bits::{BitReader, BitWriter};

fn bench_bits(c: &mut Criterion) {
    let mut group = c.benchmark_group("bit_stream");

    group.bench_function("write_int_mixed_widths", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(64 * 1024);
            let mut w = BitWriter::new(&mut buf);
            for i in 0..10_000u64 {
                w.write_int(black_box(i & 0x1ff), 9).unwrap();
                w.write_bit(i % 3 == 0).unwrap();
            }
            w.flush().unwrap();
            buf
        })
    });

    group.bench_function("compressed_int_roundtrip", |b| {
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf);
            for i in 0..10_000u64 {
                w.write_compressed_int(i * i).unwrap();
            }
            w.flush().unwrap();
        }
        b.iter(|| {
            let mut r = BitReader::new(black_box(&buf[..]));
            let mut sum = 0u64;
            while let Some(v) = r.read_compressed_int().unwrap() {
                sum = sum.wrapping_add(v);
            }
            sum
        })
    });

    group.finish();
}

criterion_group!(benches, bench_bits);
criterion_main!(benches);
