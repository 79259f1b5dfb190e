// e2e/io.rs — restricted I/O across sources, slicing, and the output side.

use std::io::Write;

use tdc::io::input::Input;
use tdc::io::output::RestrictedOutput;
use tdc::io::restrict::{escape, unescape, InputRestrictions};

const ORIGINAL: &[u8] = b"test\x00\x00\xff\xfeabcd";

// ─────────────────────────────────────────────────────────────────────────────
// Escape bijection table
// ─────────────────────────────────────────────────────────────────────────────

struct Case {
    input: &'static [u8],
    escaped: &'static [u8],
    restrictions: InputRestrictions,
}

fn cases() -> Vec<Case> {
    vec![
        Case {
            input: b"yasdvat\x00rav\xffsds\xfevvssca",
            escaped: b"yasdvat\x00rav\xffsds\xfevvssca",
            restrictions: InputRestrictions::none(),
        },
        Case {
            input: b"yasdvat\x00rav\xffsds\xfevvssca",
            escaped: b"yasdvat\x00rav\xffsds\xfevvssca\x00",
            restrictions: InputRestrictions::new([], true),
        },
        Case {
            // forbidden {0}: escape byte 0xff, code(0) = 0
            input: b"yasdvat\x00rav\xffsds\xfevvssca",
            escaped: b"yasdvat\xff\x00rav\xff\xffsds\xfevvssca\x00",
            restrictions: InputRestrictions::new([0], true),
        },
        Case {
            // forbidden {0, 0xff}: escape byte 0xfe, codes 0 and 1
            input: b"yasdvat\x00rav\xffsds\xfevvssca",
            escaped: b"yasdvat\xfe\x00rav\xfe\x01sds\xfe\xfevvssca\x00",
            restrictions: InputRestrictions::new([0, 0xff], true),
        },
        Case {
            input: ORIGINAL,
            escaped: b"test\xfe\x00\xfe\x00\xfe\x01\xfe\xfeabcd",
            restrictions: InputRestrictions::new([0, 0xff], false),
        },
        Case {
            input: ORIGINAL,
            escaped: b"test\xfe\x00\xfe\x00\xfe\x01\xfe\xfeabcd\x00",
            restrictions: InputRestrictions::new([0, 0xff], true),
        },
        Case { input: b"", escaped: b"", restrictions: InputRestrictions::none() },
        Case { input: b"", escaped: b"\x00", restrictions: InputRestrictions::new([], true) },
        Case { input: b"", escaped: b"\x00", restrictions: InputRestrictions::new([0, 0xff], true) },
    ]
}

#[test]
fn escape_matches_expectations() {
    for case in cases() {
        assert_eq!(
            escape(case.input, &case.restrictions),
            case.escaped,
            "escaping {:?} under {:?}",
            case.input,
            case.restrictions
        );
    }
}

#[test]
fn unescape_inverts() {
    for case in cases() {
        assert_eq!(
            unescape(case.escaped, &case.restrictions).unwrap(),
            case.input,
            "unescaping under {:?}",
            case.restrictions
        );
    }
}

#[test]
fn escaped_data_avoids_forbidden_bytes() {
    for case in cases() {
        let r = &case.restrictions;
        let body = if r.null_terminate() {
            &case.escaped[..case.escaped.len() - 1]
        } else {
            case.escaped
        };
        for &b in r.forbidden() {
            assert!(!body.contains(&b), "byte {b:#04x} under {r:?}");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Input sources
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn file_source_with_restrictions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.bin");
    std::fs::write(&path, ORIGINAL).unwrap();

    for case in cases() {
        if case.input != ORIGINAL {
            continue;
        }
        let input = Input::from_path_restricted(&path, &case.restrictions).unwrap();
        assert_eq!(input.as_view(), case.escaped, "under {:?}", case.restrictions);
    }
}

#[test]
fn file_source_sentinel_only_uses_the_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.bin");
    std::fs::write(&path, b"plain data").unwrap();

    let r = InputRestrictions::new([], true);
    let input = Input::from_path_restricted(&path, &r).unwrap();
    assert_eq!(input.as_view(), b"plain data\x00");
}

#[test]
fn stream_source_with_restrictions() {
    for case in cases() {
        let input = Input::from_stream(case.input, &case.restrictions).unwrap();
        assert_eq!(input.as_view(), case.escaped, "under {:?}", case.restrictions);
    }
}

#[test]
fn slices_are_views_onto_the_parent() {
    let input = Input::from_bytes(b"yasdvat\x00rav\xffsds\xfevvssca");
    let inner = input.slice(9);
    assert_eq!(inner.as_view(), b"av\xffsds\xfevvssca");

    // restricting a slice escapes the slice's bytes only
    let r = InputRestrictions::new([0, 0xff], true);
    let restricted = inner.restricted(&r).unwrap();
    assert_eq!(restricted.as_view(), b"av\xfe\x01sds\xfe\xfevvssca\x00");
}

#[test]
fn rerestriction_unrestricts_first() {
    let weak = InputRestrictions::new([0], true);
    let strong = InputRestrictions::new([0, 0xff], true);
    let input = Input::from_bytes(ORIGINAL).restricted(&weak).unwrap();
    let input = input.restricted(&strong).unwrap();
    assert_eq!(input.as_view(), escape(ORIGINAL, &strong).as_slice());
    let relaxed = input.restricted(&InputRestrictions::none()).unwrap();
    assert_eq!(relaxed.as_view(), ORIGINAL);
}

// ─────────────────────────────────────────────────────────────────────────────
// Output side
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn restricted_output_writes_original_bytes() {
    for case in cases() {
        let mut sink = Vec::new();
        {
            let mut w = RestrictedOutput::new(&mut sink, &case.restrictions);
            w.write_all(case.escaped).unwrap();
            w.finish().unwrap();
        }
        assert_eq!(sink, case.input, "under {:?}", case.restrictions);
    }
}

#[test]
fn restricted_output_handles_split_escape_pairs() {
    let r = InputRestrictions::new([0, 0xff], true);
    let escaped = escape(ORIGINAL, &r);
    for chunk_size in [1usize, 2, 3, 7] {
        let mut sink = Vec::new();
        {
            let mut w = RestrictedOutput::new(&mut sink, &r);
            for chunk in escaped.chunks(chunk_size) {
                w.write_all(chunk).unwrap();
            }
            w.finish().unwrap();
        }
        assert_eq!(sink, ORIGINAL, "chunk size {chunk_size}");
    }
}
