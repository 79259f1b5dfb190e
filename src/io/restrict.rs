//! Byte-level input restrictions and the escape transform.
//!
//! Algorithms may declare that certain byte values must never appear in
//! their input (typically `0`, reserved as a sentinel), and/or that the
//! input must end with a single trailing `0`.  [`InputRestrictions`] captures
//! that declaration; [`EscapeMap`] derives a concrete byte-stuffing scheme
//! from it.
//!
//! Scheme: the escape byte `e` is the largest byte value outside the
//! forbidden set.  Forbidden bytes, in ascending order, get escape codes
//! `0, 1, 2, ...` (skipping the value `e` itself); a forbidden byte `b` is
//! emitted as `e code(b)`, and a literal `e` as `e e`.  This is bijective
//! for any forbidden set of at most 255 bytes.

use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// InputRestrictions
// ─────────────────────────────────────────────────────────────────────────────

/// A set of forbidden byte values plus a null-termination flag.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct InputRestrictions {
    /// Sorted, deduplicated forbidden byte values.
    forbidden: Vec<u8>,
    null_terminate: bool,
}

impl InputRestrictions {
    /// No restrictions at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(forbidden: impl IntoIterator<Item = u8>, null_terminate: bool) -> Self {
        let mut forbidden: Vec<u8> = forbidden.into_iter().collect();
        forbidden.sort_unstable();
        forbidden.dedup();
        assert!(forbidden.len() < 256, "cannot forbid every byte value");
        InputRestrictions { forbidden, null_terminate }
    }

    /// Requires a trailing `0` sentinel and forbids `0` elsewhere.
    pub fn sentinel() -> Self {
        Self::new([0], true)
    }

    pub fn forbidden(&self) -> &[u8] {
        &self.forbidden
    }

    pub fn null_terminate(&self) -> bool {
        self.null_terminate
    }

    pub fn has_escape_restrictions(&self) -> bool {
        !self.forbidden.is_empty()
    }

    pub fn has_restrictions(&self) -> bool {
        self.has_escape_restrictions() || self.null_terminate
    }

    /// Union of two restriction sets; used when declarations propagate
    /// upward through sub-algorithm parameters.
    pub fn union(&self, other: &InputRestrictions) -> InputRestrictions {
        let mut forbidden = self.forbidden.clone();
        forbidden.extend_from_slice(&other.forbidden);
        InputRestrictions::new(forbidden, self.null_terminate || other.null_terminate)
    }
}

impl fmt::Debug for InputRestrictions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputRestrictions({:?}, nul={})", self.forbidden, self.null_terminate)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EscapeMap
// ─────────────────────────────────────────────────────────────────────────────

/// Byte-stuffing tables derived from an [`InputRestrictions`].
///
/// Lookup is O(1) both ways via 256-entry tables.
pub struct EscapeMap {
    escape_byte: u8,
    /// `replace[b]` is `Some(code)` if byte `b` must be escaped as
    /// `escape_byte code`; the escape byte maps to itself.
    replace: [Option<u8>; 256],
    /// Inverse: `restore[code]` is the original byte for that escape code.
    restore: [u8; 256],
}

impl EscapeMap {
    pub fn new(restrictions: &InputRestrictions) -> Self {
        let forbidden = restrictions.forbidden();
        let is_forbidden = {
            let mut t = [false; 256];
            for &b in forbidden {
                t[b as usize] = true;
            }
            t
        };

        let escape_byte = (0..=255u8)
            .rev()
            .find(|&b| !is_forbidden[b as usize])
            .expect("at least one byte value must remain allowed");

        let mut replace = [None; 256];
        let mut restore = [0u8; 256];

        let mut code = 0u8;
        for &b in forbidden {
            if code == escape_byte {
                code += 1;
            }
            replace[b as usize] = Some(code);
            restore[code as usize] = b;
            code += 1;
        }
        replace[escape_byte as usize] = Some(escape_byte);
        restore[escape_byte as usize] = escape_byte;

        EscapeMap { escape_byte, replace, restore }
    }

    pub fn escape_byte(&self) -> u8 {
        self.escape_byte
    }

    /// Escape code for `b`, or `None` if `b` passes through unchanged.
    #[inline]
    pub fn code(&self, b: u8) -> Option<u8> {
        self.replace[b as usize]
    }

    /// Original byte for escape `code`.
    #[inline]
    pub fn original(&self, code: u8) -> u8 {
        self.restore[code as usize]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Whole-buffer transforms
// ─────────────────────────────────────────────────────────────────────────────

/// Number of bytes `data` grows by under `restrictions`.
pub fn escaped_growth(data: &[u8], restrictions: &InputRestrictions) -> usize {
    let mut extra = if restrictions.null_terminate() { 1 } else { 0 };
    if restrictions.has_escape_restrictions() {
        let map = EscapeMap::new(restrictions);
        extra += data.iter().filter(|&&b| map.code(b).is_some()).count();
    }
    extra
}

/// Escapes `data` into a fresh buffer, appending the sentinel if requested.
pub fn escape(data: &[u8], restrictions: &InputRestrictions) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + escaped_growth(data, restrictions));
    if restrictions.has_escape_restrictions() {
        let map = EscapeMap::new(restrictions);
        for &b in data {
            match map.code(b) {
                Some(code) => {
                    out.push(map.escape_byte());
                    out.push(code);
                }
                None => out.push(b),
            }
        }
    } else {
        out.extend_from_slice(data);
    }
    if restrictions.null_terminate() {
        out.push(0);
    }
    out
}

/// Escapes the prefix `buf[..len]` in place inside a buffer that already has
/// room for the grown result; returns the escaped length (without sentinel).
///
/// Works back to front so source and destination may overlap.
pub fn escape_in_place(buf: &mut [u8], len: usize, restrictions: &InputRestrictions) -> usize {
    if !restrictions.has_escape_restrictions() {
        if restrictions.null_terminate() {
            buf[len] = 0;
        }
        return len;
    }
    let map = EscapeMap::new(restrictions);
    let grown = len
        + buf[..len]
            .iter()
            .filter(|&&b| map.code(b).is_some())
            .count();
    debug_assert!(grown + restrictions.null_terminate() as usize <= buf.len());

    let mut w = grown;
    for r in (0..len).rev() {
        let b = buf[r];
        match map.code(b) {
            Some(code) => {
                w -= 2;
                buf[w] = map.escape_byte();
                buf[w + 1] = code;
            }
            None => {
                w -= 1;
                buf[w] = b;
            }
        }
    }
    debug_assert_eq!(w, 0);
    if restrictions.null_terminate() {
        buf[grown] = 0;
    }
    grown
}

/// Error raised when unescaping malformed data.
#[derive(Debug, thiserror::Error)]
pub enum UnescapeError {
    #[error("escape byte at end of data with no code byte")]
    DanglingEscape,
    #[error("expected trailing sentinel byte")]
    MissingSentinel,
}

/// Inverts [`escape`]; strips the trailing sentinel if the restrictions
/// requested one.
pub fn unescape(data: &[u8], restrictions: &InputRestrictions) -> Result<Vec<u8>, UnescapeError> {
    let data = if restrictions.null_terminate() {
        match data.split_last() {
            Some((0, rest)) => rest,
            _ => return Err(UnescapeError::MissingSentinel),
        }
    } else {
        data
    };

    if !restrictions.has_escape_restrictions() {
        return Ok(data.to_vec());
    }

    let map = EscapeMap::new(restrictions);
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        if b == map.escape_byte() {
            let code = *data.get(i + 1).ok_or(UnescapeError::DanglingEscape)?;
            out.push(map.original(code));
            i += 2;
        } else {
            out.push(b);
            i += 1;
        }
    }
    Ok(out)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_byte_is_largest_free_value() {
        assert_eq!(EscapeMap::new(&InputRestrictions::new([0], true)).escape_byte(), 0xff);
        assert_eq!(EscapeMap::new(&InputRestrictions::new([0, 0xff], true)).escape_byte(), 0xfe);
        assert_eq!(
            EscapeMap::new(&InputRestrictions::new([0xff, 0xfe], false)).escape_byte(),
            0xfd
        );
    }

    #[test]
    fn codes_ascend_over_sorted_forbidden_bytes() {
        let map = EscapeMap::new(&InputRestrictions::new([0xff, 0], true));
        assert_eq!(map.code(0), Some(0));
        assert_eq!(map.code(0xff), Some(1));
        assert_eq!(map.code(map.escape_byte()), Some(map.escape_byte()));
        assert_eq!(map.code(b'a'), None);
    }

    #[test]
    fn escape_concrete_expectation() {
        let r = InputRestrictions::new([0, 0xff], true);
        let out = escape(b"a\x00b\xffc\xfed", &r);
        // escape byte 0xfe; 0 -> (fe 00), ff -> (fe 01), fe -> (fe fe)
        assert_eq!(out, b"a\xfe\x00b\xfe\x01c\xfe\xfed\x00");
        assert_eq!(unescape(&out, &r).unwrap(), b"a\x00b\xffc\xfed");
    }

    #[test]
    fn null_terminate_only() {
        let r = InputRestrictions::new([], true);
        assert_eq!(escape(b"abc", &r), b"abc\x00");
        assert_eq!(unescape(b"abc\x00", &r).unwrap(), b"abc");
        assert!(matches!(unescape(b"abc", &r), Err(UnescapeError::MissingSentinel)));
    }

    #[test]
    fn empty_input() {
        let r = InputRestrictions::new([0, 0xff], true);
        assert_eq!(escape(b"", &r), b"\x00");
        assert_eq!(unescape(b"\x00", &r).unwrap(), b"");
    }

    #[test]
    fn in_place_matches_out_of_place() {
        let r = InputRestrictions::new([0, 0xfe], true);
        let data = b"x\x00y\xfez\xffw".to_vec();
        let expect = escape(&data, &r);

        let mut buf = data.clone();
        buf.resize(data.len() + escaped_growth(&data, &r), 0xaa);
        let n = escape_in_place(&mut buf, data.len(), &r);
        assert_eq!(&buf[..n + 1], &expect[..]);
    }

    #[test]
    fn bijection_over_random_like_data() {
        let r = InputRestrictions::new([0, 1, 2, 0xfe, 0xff], true);
        let mut data = Vec::new();
        let mut x = 0x9e3779b97f4a7c15u64;
        for _ in 0..4096 {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            data.push(x as u8);
        }
        let escaped = escape(&data, &r);
        // no forbidden byte may survive escaping; the only 0 is the sentinel
        for &b in r.forbidden() {
            assert!(!escaped[..escaped.len() - 1].contains(&b));
        }
        assert_eq!(*escaped.last().unwrap(), 0);
        assert_eq!(unescape(&escaped, &r).unwrap(), data);
    }

    #[test]
    fn union_merges_restrictions() {
        let a = InputRestrictions::new([0], false);
        let b = InputRestrictions::new([0xff], true);
        let u = a.union(&b);
        assert_eq!(u.forbidden(), &[0, 0xff]);
        assert!(u.null_terminate());
    }
}
