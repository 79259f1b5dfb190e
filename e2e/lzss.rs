// e2e/lzss.rs — LZSS factorisation and the two decompressors.

use tdc::catalogue::compressor_registry;
use tdc::io::input::Input;
use tdc::io::output::RestrictedOutput;
use tdc::lzss::{factorize, LzssFactor};

// ─────────────────────────────────────────────────────────────────────────────
// Factoriser contract
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn abracadabra_has_the_expected_factor() {
    let factors = factorize(b"abracadabra\x00", 3);
    assert!(
        factors.contains(&LzssFactor { pos: 7, src: 0, len: 4 }),
        "expected (7, 0, 4) for 'abra', got {factors:?}"
    );
}

#[test]
fn factor_bounds_hold() {
    let texts: Vec<Vec<u8>> = vec![
        b"abracadabra\x00".to_vec(),
        b"mississippi\x00".to_vec(),
        {
            let mut v = b"abcabcabc".repeat(20);
            v.push(0);
            v
        },
        {
            let mut v = vec![b'z'; 300];
            v.push(0);
            v
        },
    ];
    for text in &texts {
        let n = text.len() as u64;
        for threshold in [1u64, 2, 3, 8] {
            for f in factorize(text, threshold) {
                assert!(f.src < f.pos, "{f:?}");
                assert!(f.len >= threshold, "{f:?} under threshold {threshold}");
                // factors never cover the sentinel
                assert!(f.pos + f.len <= n - 1, "{f:?} crosses the sentinel");
            }
        }
    }
}

#[test]
fn factors_reproduce_the_text() {
    let mut text = b"how much wood would a woodchuck chuck if a woodchuck could chuck wood"
        .to_vec();
    text.push(0);
    let factors = factorize(&text, 3);

    let mut out: Vec<u8> = Vec::with_capacity(text.len());
    let mut fi = 0;
    while out.len() < text.len() {
        if fi < factors.len() && factors[fi].pos == out.len() as u64 {
            let f = factors[fi];
            for k in 0..f.len {
                let b = out[(f.src + k) as usize];
                out.push(b);
            }
            fi += 1;
        } else {
            out.push(text[out.len()]);
        }
    }
    assert_eq!(out, text);
}

// ─────────────────────────────────────────────────────────────────────────────
// Scan vs EM decompressor equivalence
// ─────────────────────────────────────────────────────────────────────────────

fn roundtrip(spec: &str, data: &[u8]) -> Vec<u8> {
    let registry = compressor_registry();
    let sel = registry.select(spec).unwrap();
    let restrictions = sel.restrictions().clone();

    let input = Input::from_bytes(data).restricted(&restrictions).unwrap();
    let mut packed = Vec::new();
    sel.instance().compress(&input, &mut packed).unwrap();

    let mut unpacked = Vec::new();
    {
        let mut sink = RestrictedOutput::new(&mut unpacked, &restrictions);
        sel.instance().decompress(&Input::from_bytes(&packed), &mut sink).unwrap();
        sink.finish().unwrap();
    }
    unpacked
}

#[test]
fn scan_and_em_agree() {
    let inputs: Vec<Vec<u8>> = vec![
        b"".to_vec(),
        b"abracadabra".to_vec(),
        b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_vec(),
        b"interchangeability notwithstanding, interchangeability persists".to_vec(),
        b"lorem ipsum dolor sit amet ".repeat(100),
    ];
    for data in &inputs {
        let scan = roundtrip("lzss_lcp", data);
        let em = roundtrip("lzss_lcp(decomp=em, mem=1)", data);
        assert_eq!(&scan, data, "scan decoder");
        assert_eq!(&em, data, "em decoder");
    }
}

#[test]
fn long_chains_resolve_out_of_core() {
    // long periodic text creates reference chains several links deep
    let mut data = Vec::new();
    for i in 0..2000u32 {
        data.extend_from_slice(format!("token{} ", i % 17).as_bytes());
    }
    let em = roundtrip("lzss_lcp(decomp=em, mem=1)", &data);
    assert_eq!(em, data);
}

#[test]
fn inputs_with_zero_bytes_are_escaped_through() {
    // the sentinel restriction forbids 0; escaping must hide these
    let data = b"zero\x00bytes\x00inside".to_vec();
    assert_eq!(roundtrip("lzss_lcp", &data), data);
    assert_eq!(roundtrip("lzss_lcp(decomp=em, mem=1)", &data), data);
}
