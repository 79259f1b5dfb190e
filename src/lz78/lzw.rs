//! LZW factorisation.
//!
//! Uses the multi-root trie surface: one root per byte value, ids 0..=255.
//! Factors carry node ids only; the decoder reconstructs dictionary entries
//! one step behind the encoder, with the usual special case for a factor
//! that references the entry being defined.

use std::io::Write;

use crate::coders::{Coder, Decoder, Encoder, Range};
use crate::compressor::{coder_type, Compressor, FromConfig};
use crate::io::input::Input;
use crate::meta::config::Config;
use crate::meta::meta_builder::{Algorithm, Meta};
use crate::stats::StatPhase;
use crate::trie::{lz_trie_type, LzTrie, TernaryTrie};

use super::isqrt;

pub struct LzwCompressor<C: Coder, T: LzTrie> {
    cfg: Config,
    _marker: std::marker::PhantomData<(C, T)>,
}

impl<C: Coder, T: LzTrie> Algorithm for LzwCompressor<C, T> {
    fn meta() -> Meta {
        let mut m = Meta::new(
            crate::compressor::compressor_type(),
            "lzw",
            "Lempel-Ziv-Welch factorisation",
        );
        m.param("coder", "output encoder")
            .strategy(C::meta(), coder_type(), Some(crate::coders::BinaryCoder::meta()));
        m.param("lz_trie", "trie data structure")
            .strategy(T::meta(), lz_trie_type(), Some(TernaryTrie::meta()));
        m
    }
}

impl<C: Coder, T: LzTrie> FromConfig for LzwCompressor<C, T> {
    fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(LzwCompressor { cfg: cfg.clone(), _marker: std::marker::PhantomData })
    }
}

/// Id range for the `k`-th factor (0-based): roots plus one entry per
/// previously decoded factor, including the one being defined right now.
fn factor_range(k: u64) -> Range {
    Range::new(0, 255 + k)
}

impl<C: Coder, T: LzTrie> Compressor for LzwCompressor<C, T> {
    fn compress(&self, input: &Input, output: &mut dyn Write) -> anyhow::Result<()> {
        let view = input.as_view();
        let n = view.len();

        let phase = StatPhase::new("lzw compression");

        let mut dict = T::with_config(self.cfg.sub_config("lz_trie"), n, 256 + isqrt(n) * 2)?;
        let mut enc = C::encoder(self.cfg.sub_config("coder"), output);

        for b in 0u64..=255 {
            let root = dict.add_rootnode(b);
            debug_assert_eq!(root.id(), b);
        }

        let mut node = None;
        let mut factor_count: u64 = 0;

        for &c in view {
            dict.signal_character_read();
            let current = match node {
                None => dict.get_rootnode(c as u64),
                Some(v) => {
                    let child = dict.find_or_insert(v, c);
                    if child.is_new() {
                        enc.encode_bit(true)?;
                        enc.encode(v.id(), factor_range(factor_count))?;
                        factor_count += 1;
                        dict.get_rootnode(c as u64)
                    } else {
                        child
                    }
                }
            };
            node = Some(current);
        }

        if let Some(v) = node {
            enc.encode_bit(true)?;
            enc.encode(v.id(), factor_range(factor_count))?;
            factor_count += 1;
        }
        enc.encode_bit(false)?;
        enc.finalize()?;

        phase.log("factor_count", factor_count);
        Ok(())
    }

    fn decompress(&self, input: &Input, output: &mut dyn Write) -> anyhow::Result<()> {
        let mut dec = C::decoder(self.cfg.sub_config("coder"), input.as_stream());

        // entry j represents node id 256 + j: (parent id, appended byte)
        let mut entries: Vec<(u64, u8)> = Vec::new();
        let mut prev: Option<u64> = None;
        let mut factor_count: u64 = 0;

        let expand = |entries: &[(u64, u8)], mut id: u64| -> Vec<u8> {
            let mut bytes = Vec::new();
            while id >= 256 {
                let (parent, c) = entries[(id - 256) as usize];
                bytes.push(c);
                id = parent;
            }
            bytes.push(id as u8);
            bytes.reverse();
            bytes
        };

        while dec.decode_bit()? {
            let id = dec.decode(factor_range(factor_count))?;
            factor_count += 1;

            let string = if id == 256 + entries.len() as u64 {
                // the factor references the entry defined by itself
                let p = prev.ok_or_else(|| {
                    anyhow::anyhow!("lzw stream references an undefined entry")
                })?;
                let mut s = expand(&entries, p);
                s.push(s[0]);
                s
            } else if id < 256 + entries.len() as u64 {
                expand(&entries, id)
            } else {
                anyhow::bail!("lzw factor id {id} out of range");
            };

            if let Some(p) = prev {
                entries.push((p, string[0]));
            }
            output.write_all(&string)?;
            prev = Some(id);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coders::{AsciiCoder, BinaryCoder};
    use crate::trie::HashTrie;

    fn roundtrip<C: Coder, T: LzTrie>(spec: &str, data: &[u8]) -> Vec<u8> {
        let meta = LzwCompressor::<C, T>::meta();
        let mut lib = meta.known().clone();
        lib.insert(meta.decl()).unwrap();
        let cfg = Config::resolve(
            meta.decl(),
            &crate::meta::parser::parse(spec).unwrap(),
            &lib,
        )
        .unwrap();
        let comp = LzwCompressor::<C, T>::from_config(&cfg).unwrap();

        let mut packed = Vec::new();
        comp.compress(&Input::from_bytes(data), &mut packed).unwrap();
        let mut unpacked = Vec::new();
        comp.decompress(&Input::from_vec(packed), &mut unpacked).unwrap();
        unpacked
    }

    #[test]
    fn roundtrip_basics() {
        for data in [
            &b""[..],
            b"a",
            b"TOBEORNOTTOBEORTOBEORNOT",
            b"aaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            b"abcdebcdeabc",
        ] {
            assert_eq!(roundtrip::<BinaryCoder, TernaryTrie>("lzw", data), data);
            assert_eq!(
                roundtrip::<AsciiCoder, HashTrie>("lzw(coder=ascii, lz_trie=hash)", data),
                data
            );
        }
    }

    #[test]
    fn kwkwk_case() {
        // the classic pattern forcing a reference to the in-flight entry
        let data = b"abababab";
        assert_eq!(roundtrip::<BinaryCoder, TernaryTrie>("lzw", data), data);
    }

    #[test]
    fn binary_bytes() {
        let data: Vec<u8> = (0..=255u8).cycle().take(2048).collect();
        assert_eq!(roundtrip::<BinaryCoder, TernaryTrie>("lzw", &data), data);
    }
}
