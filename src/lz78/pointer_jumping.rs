//! LZ78 with the pointer-jumping optimisation.
//!
//! Instead of walking the trie byte by byte, the factoriser accumulates a
//! fixed-width lookahead buffer and keeps a jump map from
//! `(trie node, buffer)` to the `(parent, node)` pair reached after feeding
//! the whole buffer through the trie.  A hit replays `jump_width` symbols in
//! one map probe; a miss drains the buffer the slow way and records the
//! mapping for next time.

use std::collections::HashMap;
use std::io::Write;

use xxhash_rust::xxh64::Xxh64Builder;

use crate::coders::Coder;
use crate::compressor::{coder_type, Compressor, FromConfig};
use crate::io::input::Input;
use crate::meta::config::Config;
use crate::meta::meta_builder::{Algorithm, Meta};
use crate::stats::StatPhase;
use crate::trie::{lz_trie_type, LzTrie, TernaryTrie, TrieNode};

use super::{decode_factors, encode_end, encode_factor, isqrt};

/// Upper bound on the configurable jump width.
pub const MAX_JUMP_WIDTH: usize = 17;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct JumpKey {
    node: u64,
    buf: [u8; MAX_JUMP_WIDTH],
}

#[derive(Clone, Copy)]
struct NodePair {
    parent: u64,
    node: u64,
}

pub struct Lz78PointerJumpingCompressor<C: Coder, T: LzTrie> {
    cfg: Config,
    dict_max_size: u64,
    jump_width: usize,
    _marker: std::marker::PhantomData<(C, T)>,
}

impl<C: Coder, T: LzTrie> Algorithm for Lz78PointerJumpingCompressor<C, T> {
    fn meta() -> Meta {
        let mut m = Meta::new(
            crate::compressor::compressor_type(),
            "lz78_pj",
            "Lempel-Ziv 78 factorisation with pointer jumping",
        );
        m.param("coder", "output encoder")
            .strategy(C::meta(), coder_type(), Some(crate::coders::BinaryCoder::meta()));
        m.param("lz_trie", "trie data structure")
            .strategy(T::meta(), lz_trie_type(), Some(TernaryTrie::meta()));
        m.param("dict_size", "maximum dictionary size before reset (0 = unlimited)")
            .primitive_default(0);
        m.param("jump_width", "lookahead width of the jump map")
            .primitive_default(4);
        m
    }
}

impl<C: Coder, T: LzTrie> FromConfig for Lz78PointerJumpingCompressor<C, T> {
    fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let dict_max_size = cfg.param("dict_size").as_uint()?;
        let jump_width = cfg.param("jump_width").as_uint()? as usize;
        anyhow::ensure!(
            (1..=MAX_JUMP_WIDTH).contains(&jump_width),
            "jump_width must be in 1..={MAX_JUMP_WIDTH}"
        );
        Ok(Lz78PointerJumpingCompressor {
            cfg: cfg.clone(),
            dict_max_size,
            jump_width,
            _marker: std::marker::PhantomData,
        })
    }
}

impl<C: Coder, T: LzTrie> Compressor for Lz78PointerJumpingCompressor<C, T> {
    fn compress(&self, input: &Input, output: &mut dyn Write) -> anyhow::Result<()> {
        let view = input.as_view();
        let n = view.len();

        let phase = StatPhase::new("lz78 pointer jumping compression");

        let mut dict = T::with_config(self.cfg.sub_config("lz_trie"), n, isqrt(n) * 2)?;
        let mut enc = C::encoder(self.cfg.sub_config("coder"), output);

        let root = dict.add_rootnode(0);
        let mut node = root;
        let mut parent = root;
        let mut factor_count: u64 = 0;
        let mut stat_factors: u64 = 0;
        let mut stat_jumps: u64 = 0;
        let mut stat_resets: u64 = 0;
        let mut last_byte = 0u8;

        let mut jump_map: HashMap<JumpKey, NodePair, Xxh64Builder> =
            HashMap::with_hasher(Xxh64Builder::new(0));
        let mut buf = [0u8; MAX_JUMP_WIDTH];
        let mut buf_len = 0usize;
        // trie position at the time the current buffer started filling
        let mut buf_start_node = node.id();
        // A jump entry is sound only for a pure traversal: if the drain
        // emitted a factor (or reset the dictionary), replaying it as a jump
        // would swallow that factor, so such drains are not recorded.
        let mut emitted_during_drain = false;

        macro_rules! add_char {
            ($c:expr) => {{
                let c: u8 = $c;
                dict.signal_character_read();
                last_byte = c;
                let child = dict.find_or_insert(node, c);
                if child.is_new() {
                    encode_factor(&mut enc, node.id(), c, factor_count)?;
                    factor_count += 1;
                    stat_factors += 1;
                    emitted_during_drain = true;
                    node = dict.get_rootnode(0);
                    parent = node;

                    if self.dict_max_size != 0 && dict.size() as u64 == self.dict_max_size {
                        dict.clear();
                        let root = dict.add_rootnode(0);
                        node = root;
                        parent = root;
                        factor_count = 0;
                        stat_resets += 1;
                        jump_map.clear();
                    }
                } else {
                    parent = node;
                    node = child;
                }
            }};
        }

        for &c in view {
            buf[buf_len] = c;
            buf_len += 1;
            if buf_len < self.jump_width {
                continue;
            }

            let key = JumpKey { node: buf_start_node, buf };
            if let Some(&pair) = jump_map.get(&key) {
                node = TrieNode::new(pair.node, false);
                parent = TrieNode::new(pair.parent, false);
                last_byte = buf[self.jump_width - 1];
                stat_jumps += 1;
            } else {
                emitted_during_drain = false;
                for i in 0..buf_len {
                    add_char!(buf[i]);
                }
                if !emitted_during_drain {
                    jump_map.insert(key, NodePair { parent: parent.id(), node: node.id() });
                }
            }
            buf_len = 0;
            buf = [0u8; MAX_JUMP_WIDTH];
            buf_start_node = node.id();
        }

        // partial trailing buffer
        for i in 0..buf_len {
            add_char!(buf[i]);
        }

        if node.id() != 0 {
            encode_factor(&mut enc, parent.id(), last_byte, factor_count)?;
            stat_factors += 1;
        }
        encode_end(&mut enc)?;

        phase.log("factor_count", stat_factors);
        phase.log("jump_hits", stat_jumps);
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
    use crate::coders::BinaryCoder;
    use crate::trie::{HashTrie, TernaryTrie};

    fn roundtrip<C: Coder, T: LzTrie>(spec: &str, data: &[u8]) -> Vec<u8> {
        let meta = Lz78PointerJumpingCompressor::<C, T>::meta();
        let mut lib = meta.known().clone();
        lib.insert(meta.decl()).unwrap();
        let cfg = Config::resolve(
            meta.decl(),
            &crate::meta::parser::parse(spec).unwrap(),
            &lib,
        )
        .unwrap();
        let comp = Lz78PointerJumpingCompressor::<C, T>::from_config(&cfg).unwrap();

        let mut packed = Vec::new();
        comp.compress(&Input::from_bytes(data), &mut packed).unwrap();
        let mut unpacked = Vec::new();
        comp.decompress(&Input::from_vec(packed), &mut unpacked).unwrap();
        unpacked
    }

    #[test]
    fn matches_plain_lz78_output() {
        // pointer jumping is an optimisation; the factor stream must be
        // byte-identical to the plain factoriser's
        let data = b"abcdebcdeabcabcdebcdeabcabcdebcdeabc";
        let meta = super::super::Lz78Compressor::<BinaryCoder, TernaryTrie>::meta();
        let mut lib = meta.known().clone();
        lib.insert(meta.decl()).unwrap();
        let cfg = Config::resolve(meta.decl(), &crate::meta::parser::parse("lz78").unwrap(), &lib)
            .unwrap();
        let plain =
            super::super::Lz78Compressor::<BinaryCoder, TernaryTrie>::from_config(&cfg).unwrap();
        let mut plain_out = Vec::new();
        plain.compress(&Input::from_bytes(data), &mut plain_out).unwrap();

        let meta = Lz78PointerJumpingCompressor::<BinaryCoder, TernaryTrie>::meta();
        let mut lib = meta.known().clone();
        lib.insert(meta.decl()).unwrap();
        let cfg = Config::resolve(
            meta.decl(),
            &crate::meta::parser::parse("lz78_pj(jump_width=3)").unwrap(),
            &lib,
        )
        .unwrap();
        let pj =
            Lz78PointerJumpingCompressor::<BinaryCoder, TernaryTrie>::from_config(&cfg).unwrap();
        let mut pj_out = Vec::new();
        pj.compress(&Input::from_bytes(data), &mut pj_out).unwrap();

        assert_eq!(plain_out, pj_out);
    }

    #[test]
    fn roundtrip_various_widths() {
        let data: Vec<u8> = (0..5000u32).map(|i| ((i * i) % 11) as u8 + b'a').collect();
        for jw in [1usize, 2, 4, 8, 17] {
            let spec = format!("lz78_pj(lz_trie=hash, jump_width={jw})");
            assert_eq!(roundtrip::<BinaryCoder, HashTrie>(&spec, &data), data, "jw {jw}");
        }
    }

    #[test]
    fn roundtrip_with_resets() {
        let data: Vec<u8> = (0..8000u32).map(|i| (i % 5) as u8 + b'x').collect();
        let spec = "lz78_pj(jump_width=4, dict_size=100)";
        assert_eq!(roundtrip::<BinaryCoder, TernaryTrie>(spec, &data), data);
    }

    #[test]
    fn repeated_short_period_roundtrips() {
        // drains that emit factors must not be recorded as jumps; this input
        // would silently drop factors otherwise
        let data = b"abababababababababababab";
        assert_eq!(
            roundtrip::<BinaryCoder, TernaryTrie>("lz78_pj(jump_width=2)", data),
            data
        );
    }
}
