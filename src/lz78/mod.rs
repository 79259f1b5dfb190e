//! LZ78/LZW factorisation.
//!
//! Factors are `(node_id, literal)` pairs referencing the dictionary trie;
//! ids follow insertion order (see [`crate::trie`]), so the decoder can
//! rebuild the dictionary from the factor stream alone.  Streams are
//! self-delimiting: every factor is preceded by a `1` bit, and a `0` bit
//! terminates the stream, so trailing bit padding can never be misread as an
//! extra factor.

pub mod lzw;
pub mod pointer_jumping;

pub use lzw::LzwCompressor;
pub use pointer_jumping::Lz78PointerJumpingCompressor;

use std::io::Write;

use crate::coders::{Coder, Decoder, Encoder, Range};
use crate::compressor::{coder_type, Compressor, FromConfig};
use crate::io::input::Input;
use crate::meta::config::Config;
use crate::meta::meta_builder::{Algorithm, Meta};
use crate::stats::StatPhase;
use crate::trie::{lz_trie_type, LzTrie, TernaryTrie};

/// Integer square root, used to size trie reservations.
pub(crate) fn isqrt(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let mut x = (n as f64).sqrt() as usize;
    while (x + 1) * (x + 1) <= n {
        x += 1;
    }
    while x * x > n {
        x -= 1;
    }
    x
}

// ─────────────────────────────────────────────────────────────────────────────
// Factor coding
// ─────────────────────────────────────────────────────────────────────────────

/// Encodes one `(node_id, literal)` factor.  `factor_count` is the number of
/// factors emitted since the last dictionary reset; it bounds the id range on
/// both sides of the stream.
pub fn encode_factor(
    enc: &mut impl Encoder,
    node_id: u64,
    literal: u8,
    factor_count: u64,
) -> std::io::Result<()> {
    enc.encode_bit(true)?;
    enc.encode(node_id, Range::new(0, factor_count))?;
    enc.encode(literal as u64, Range::BYTE)
}

/// Terminates a factor stream.
pub fn encode_end(enc: &mut impl Encoder) -> std::io::Result<()> {
    enc.encode_bit(false)?;
    enc.finalize()
}

/// Decodes a factor stream back into text.
///
/// `dict_max_size` must match the compressor's setting; the dictionary reset
/// points depend on it.
pub fn decode_factors(
    dec: &mut impl Decoder,
    out: &mut dyn Write,
    dict_max_size: u64,
) -> anyhow::Result<()> {
    // entry k represents node id k+1: (parent id, literal)
    let mut entries: Vec<(u64, u8)> = Vec::new();
    let mut expand_buf: Vec<u8> = Vec::new();

    while dec.decode_bit()? {
        let factor_count = entries.len() as u64;
        let node_id = dec.decode(Range::new(0, factor_count))?;
        let literal = dec.decode(Range::BYTE)? as u8;

        expand_buf.clear();
        expand_buf.push(literal);
        let mut id = node_id;
        while id != 0 {
            let (parent, c) = entries[(id - 1) as usize];
            expand_buf.push(c);
            id = parent;
        }
        expand_buf.reverse();
        out.write_all(&expand_buf)?;

        entries.push((node_id, literal));

        // mirror of the compressor's reset point: trie size is 1 + factors
        if dict_max_size != 0 && 1 + entries.len() as u64 == dict_max_size {
            entries.clear();
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Compressor
// ─────────────────────────────────────────────────────────────────────────────

/// Plain LZ78.
pub struct Lz78Compressor<C: Coder, T: LzTrie> {
    cfg: Config,
    dict_max_size: u64,
    _marker: std::marker::PhantomData<(C, T)>,
}

impl<C: Coder, T: LzTrie> Algorithm for Lz78Compressor<C, T> {
    fn meta() -> Meta {
        let mut m = Meta::new(
            crate::compressor::compressor_type(),
            "lz78",
            "Lempel-Ziv 78 factorisation",
        );
        m.param("coder", "output encoder")
            .strategy(C::meta(), coder_type(), Some(crate::coders::BinaryCoder::meta()));
        m.param("lz_trie", "trie data structure")
            .strategy(T::meta(), lz_trie_type(), Some(TernaryTrie::meta()));
        m.param("dict_size", "maximum dictionary size before reset (0 = unlimited)")
            .primitive_default(0);
        m
    }
}

impl<C: Coder, T: LzTrie> FromConfig for Lz78Compressor<C, T> {
    fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let dict_max_size = cfg.param("dict_size").as_uint()?;
        Ok(Lz78Compressor {
            cfg: cfg.clone(),
            dict_max_size,
            _marker: std::marker::PhantomData,
        })
    }
}

impl<C: Coder, T: LzTrie> Compressor for Lz78Compressor<C, T> {
    fn compress(&self, input: &Input, output: &mut dyn Write) -> anyhow::Result<()> {
        let view = input.as_view();
        let n = view.len();

        let phase = StatPhase::new("lz78 compression");

        let mut dict = T::with_config(self.cfg.sub_config("lz_trie"), n, isqrt(n) * 2)?;
        let mut enc = C::encoder(self.cfg.sub_config("coder"), output);

        let root = dict.add_rootnode(0);
        let mut node = root;
        let mut parent = root;
        let mut factor_count: u64 = 0;
        let mut stat_factors: u64 = 0;
        let mut stat_resets: u64 = 0;
        let mut last_byte = 0u8;

        for &c in view {
            dict.signal_character_read();
            last_byte = c;
            let child = dict.find_or_insert(node, c);
            if child.is_new() {
                encode_factor(&mut enc, node.id(), c, factor_count)?;
                factor_count += 1;
                stat_factors += 1;
                node = dict.get_rootnode(0);
                parent = node;
                debug_assert_eq!(factor_count + 1, dict.size() as u64);

                if self.dict_max_size != 0 && dict.size() as u64 == self.dict_max_size {
                    dict.clear();
                    let root = dict.add_rootnode(0);
                    debug_assert_eq!(root.id(), 0);
                    node = root;
                    parent = root;
                    factor_count = 0;
                    stat_resets += 1;
                }
            } else {
                parent = node;
                node = child;
            }
        }

        // pending prefix: node is the child of parent under last_byte
        if node.id() != 0 {
            encode_factor(&mut enc, parent.id(), last_byte, factor_count)?;
            stat_factors += 1;
        }
        encode_end(&mut enc)?;

        phase.log("factor_count", stat_factors);
        phase.log("dictionary_resets", stat_resets);
        Ok(())
    }

    fn decompress(&self, input: &Input, output: &mut dyn Write) -> anyhow::Result<()> {
        let mut dec = C::decoder(self.cfg.sub_config("coder"), input.as_stream());
        decode_factors(&mut dec, output, self.dict_max_size)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coders::{AsciiCoder, BinaryCoder};
    use crate::trie::{BinaryTrie, HashTrie};

    fn roundtrip<C: Coder, T: LzTrie>(spec: &str, data: &[u8]) -> Vec<u8> {
        let meta = Lz78Compressor::<C, T>::meta();
        let mut lib = meta.known().clone();
        lib.insert(meta.decl()).unwrap();
        let cfg = Config::resolve(
            meta.decl(),
            &crate::meta::parser::parse(spec).unwrap(),
            &lib,
        )
        .unwrap();
        let comp = Lz78Compressor::<C, T>::from_config(&cfg).unwrap();

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
            b"abcdebcdeabc",
            b"aaaaaaaaaaaaaaaa",
            b"to be or not to be that is the question",
        ] {
            assert_eq!(roundtrip::<BinaryCoder, TernaryTrie>("lz78", data), data);
            assert_eq!(roundtrip::<AsciiCoder, HashTrie>("lz78(coder=ascii, lz_trie=hash)", data), data);
        }
    }

    #[test]
    fn roundtrip_with_dict_reset() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 7) as u8 + b'a').collect();
        assert_eq!(
            roundtrip::<BinaryCoder, BinaryTrie>("lz78(lz_trie=binary, dict_size=64)", &data),
            data
        );
    }

    #[test]
    fn isqrt_is_exact() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(1 << 40), 1 << 20);
    }
}
