// e2e/matrix.rs — roundtrip matrix over the whole registry.
//
// Every registered compressor must reproduce every test input exactly.  The
// environment variables MATRIX_EXCLUDE, MATRIX_ADDITIONAL, MATRIX_PATTERN,
// MATRIX_EARLY_ERROR and FAST_MATRIX tune the run (semicolon-separated
// lists where applicable).

use tdc::catalogue::compressor_registry;
use tdc::io::input::Input;
use tdc::io::output::RestrictedOutput;

/// The algorithm specifications the matrix enumerates.
fn matrix_specs() -> Vec<String> {
    let mut specs = vec![
        "noop".to_owned(),
        "lz78".to_owned(),
        "lz78(coder=ascii)".to_owned(),
        "lz78(lz_trie=binary)".to_owned(),
        "lz78(lz_trie=binary_sorted)".to_owned(),
        "lz78(lz_trie=hash)".to_owned(),
        "lz78(lz_trie=rolling)".to_owned(),
        "lz78(lz_trie=compact_hash)".to_owned(),
        "lz78(lz_trie=compact_hash_layered)".to_owned(),
        "lz78(lz_trie=compact_hash_elias)".to_owned(),
        "lz78(dict_size=64)".to_owned(),
        "lz78_pj(jump_width=1)".to_owned(),
        "lz78_pj(jump_width=4)".to_owned(),
        "lz78_pj(jump_width=17)".to_owned(),
        "lz78_pj(coder=ascii, lz_trie=hash, jump_width=3)".to_owned(),
        "lz78_pj(dict_size=100, jump_width=4)".to_owned(),
        "lzw".to_owned(),
        "lzw(coder=ascii)".to_owned(),
        "lzw(lz_trie=hash)".to_owned(),
        "lzss_lcp".to_owned(),
        "lzss_lcp(coder=ascii)".to_owned(),
        "lzss_lcp(threshold=1)".to_owned(),
        "lzss_lcp(threshold=6)".to_owned(),
        "lzss_lcp(decomp=em, mem=1)".to_owned(),
    ];

    if let Ok(extra) = std::env::var("MATRIX_ADDITIONAL") {
        specs.extend(extra.split(';').filter(|s| !s.is_empty()).map(str::to_owned));
    }
    if let Ok(excludes) = std::env::var("MATRIX_EXCLUDE") {
        let excludes: Vec<&str> = excludes.split(';').filter(|s| !s.is_empty()).collect();
        specs.retain(|s| !excludes.iter().any(|e| s.contains(e)));
    }
    if let Ok(pattern) = std::env::var("MATRIX_PATTERN") {
        if !pattern.is_empty() {
            specs.retain(|s| s.contains(&pattern));
        }
    }
    specs
}

fn matrix_inputs() -> Vec<Vec<u8>> {
    let mut inputs: Vec<Vec<u8>> = vec![
        b"".to_vec(),
        b"a".to_vec(),
        b"aa".to_vec(),
        b"abcdebcdeabc".to_vec(),
        b"abcdefgh#defgh_abcde".to_vec(),
        b"abababababab".to_vec(),
        b"to be or not to be that is the question".to_vec(),
        "ประเทศไทย中华Việt Nam".as_bytes().to_vec(),
        (0u8..=255).collect(),
        vec![0u8; 100],
        vec![0xff; 77],
        b"a\x00b\x00c\x00".to_vec(),
    ];

    // deterministic fuzz strings
    let mut x = 0x243f6a8885a308d3u64;
    let sizes: &[usize] = if std::env::var("FAST_MATRIX").is_ok() {
        &[64, 257]
    } else {
        &[64, 257, 1024, 4096]
    };
    for &len in sizes {
        let mut noise = Vec::with_capacity(len);
        let mut texty = Vec::with_capacity(len);
        for _ in 0..len {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            noise.push(x as u8);
            texty.push((x % 4) as u8 + b'a');
        }
        inputs.push(noise);
        inputs.push(texty);
    }
    inputs
}

fn roundtrip(spec: &str, data: &[u8]) -> Result<Vec<u8>, String> {
    let registry = compressor_registry();
    let sel = registry.select(spec).map_err(|e| e.to_string())?;
    let restrictions = sel.restrictions().clone();

    let input = Input::from_bytes(data)
        .restricted(&restrictions)
        .map_err(|e| e.to_string())?;

    let mut packed = Vec::new();
    sel.instance()
        .compress(&input, &mut packed)
        .map_err(|e| format!("compress: {e}"))?;

    let mut unpacked = Vec::new();
    {
        let mut sink = RestrictedOutput::new(&mut unpacked, &restrictions);
        sel.instance()
            .decompress(&Input::from_bytes(&packed), &mut sink)
            .map_err(|e| format!("decompress: {e}"))?;
        sink.finish().map_err(|e| e.to_string())?;
    }
    Ok(unpacked)
}

#[test]
fn roundtrip_matrix() {
    let early_error = std::env::var("MATRIX_EARLY_ERROR").is_ok();
    let mut failures = Vec::new();

    for spec in matrix_specs() {
        for (idx, data) in matrix_inputs().iter().enumerate() {
            match roundtrip(&spec, data) {
                Ok(out) if out == *data => {}
                Ok(out) => {
                    let msg = format!(
                        "{spec} / input #{idx} ({} bytes): got {} bytes, differs",
                        data.len(),
                        out.len()
                    );
                    if early_error {
                        panic!("{msg}");
                    }
                    failures.push(msg);
                }
                Err(e) => {
                    let msg = format!("{spec} / input #{idx}: {e}");
                    if early_error {
                        panic!("{msg}");
                    }
                    failures.push(msg);
                }
            }
        }
    }

    assert!(failures.is_empty(), "matrix failures:\n{}", failures.join("\n"));
}

#[test]
fn empty_input_roundtrips_everywhere() {
    for spec in matrix_specs() {
        let out = roundtrip(&spec, b"").unwrap_or_else(|e| panic!("{spec}: {e}"));
        assert!(out.is_empty(), "{spec} produced bytes from nothing");
    }
}

#[test]
fn single_byte_through_lz78_ascii() {
    assert_eq!(roundtrip("lz78(coder=ascii)", b"a").unwrap(), b"a");
}
