//! LZ77/LZSS factorisation driven by the suffix and LCP arrays.
//!
//! For every text position the factoriser finds the longest previous
//! occurrence by scanning the LCP array towards the previous and next
//! smaller suffix-array values; a factor is emitted when the best match
//! reaches the threshold, otherwise the position stays literal.
//!
//! The input must carry a trailing `0` sentinel (declared through the meta's
//! sentinel requirement); the sentinel is unique, so no factor ever overlaps
//! it.

pub mod em;

use std::io::Write;

use crate::coders::{Coder, Decoder, Encoder, Range};
use crate::compressor::{coder_type, Compressor, FromConfig};
use crate::ds::text::{Space, TextDs};
use crate::io::input::Input;
use crate::meta::config::Config;
use crate::meta::meta_builder::{Algorithm, Meta};
use crate::stats::StatPhase;

use em::PointerJumpEm;

/// One LZSS factor: `len` bytes at `pos` copied from `src`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LzssFactor {
    pub pos: u64,
    pub src: u64,
    pub len: u64,
}

/// Computes the LCP-based factorisation of `text` (sentinel included).
///
/// Every returned factor satisfies `src < pos` and `len >= threshold`;
/// overlapping sources (`src + len > pos`) are legal and handled by the
/// decoders.
pub fn factorize(text: &[u8], threshold: u64) -> Vec<LzssFactor> {
    let n = text.len();
    let mut factors = Vec::new();
    if n < 2 {
        return factors;
    }

    let mut ds = TextDs::new(text, Space::Packed);
    ds.require_isa();
    ds.require_lcp();
    let sa = ds.relinquish_sa().expect("suffix array was just built");
    let isa = ds.relinquish_isa().expect("inverse suffix array was just built");
    let lcp = ds.relinquish_lcp().expect("lcp array was just built");

    let mut i = 0usize;
    while i + 1 < n {
        let cur_pos = isa.get(i) as usize;
        debug_assert_ne!(cur_pos, 0, "only the sentinel suffix can rank first");

        // previous smaller value: scan up the LCP array
        let mut psv_lcp = lcp.get(cur_pos);
        let mut psv_pos = cur_pos as i64 - 1;
        if psv_lcp > 0 {
            while psv_pos >= 0 && sa.get(psv_pos as usize) > i as u64 {
                psv_lcp = psv_lcp.min(lcp.get(psv_pos as usize));
                psv_pos -= 1;
            }
            if psv_pos < 0 {
                psv_lcp = 0;
            }
        }

        // next smaller value: scan down
        let mut nsv_lcp = 0u64;
        let mut nsv_pos = cur_pos + 1;
        if nsv_pos < n {
            nsv_lcp = u64::MAX;
            loop {
                nsv_lcp = nsv_lcp.min(lcp.get(nsv_pos));
                if sa.get(nsv_pos) < i as u64 {
                    break;
                }
                nsv_pos += 1;
                if nsv_pos >= n {
                    nsv_lcp = 0;
                    break;
                }
            }
        }

        let (max_lcp, src) = if psv_lcp >= nsv_lcp {
            (psv_lcp, if psv_pos >= 0 { sa.get(psv_pos as usize) } else { 0 })
        } else {
            (nsv_lcp, sa.get(nsv_pos))
        };

        if max_lcp >= threshold {
            debug_assert!(src < i as u64);
            debug_assert!(i as u64 + max_lcp <= (n - 1) as u64);
            factors.push(LzssFactor { pos: i as u64, src, len: max_lcp });
            i += max_lcp as usize;
        } else {
            i += 1;
        }
    }
    factors
}

// ─────────────────────────────────────────────────────────────────────────────
// Compressor
// ─────────────────────────────────────────────────────────────────────────────

pub struct LzssLcpCompressor<C: Coder> {
    cfg: Config,
    threshold: u64,
    em_decomp: bool,
    mem_mib: usize,
    _marker: std::marker::PhantomData<C>,
}

impl<C: Coder> Algorithm for LzssLcpCompressor<C> {
    fn meta() -> Meta {
        let mut m = Meta::new(
            crate::compressor::compressor_type(),
            "lzss_lcp",
            "LZSS factorisation via suffix and LCP arrays",
        );
        m.param("coder", "output encoder")
            .strategy(C::meta(), coder_type(), Some(crate::coders::BinaryCoder::meta()));
        m.param("threshold", "minimum factor length").primitive_default(3);
        m.param("decomp", "decompression strategy: scan or em").primitive_default("scan");
        m.param("mem", "memory budget in MiB for the em decompressor")
            .primitive_default(64);
        m.require_sentinel();
        m
    }
}

impl<C: Coder> FromConfig for LzssLcpCompressor<C> {
    fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let threshold = cfg.param("threshold").as_uint()?;
        anyhow::ensure!(threshold >= 1, "threshold must be at least 1");
        let decomp = cfg.param("decomp").as_string()?;
        let em_decomp = match decomp.as_str() {
            "scan" => false,
            "em" => true,
            other => anyhow::bail!("unknown decompression strategy: '{other}'"),
        };
        let mem_mib = cfg.param("mem").as_uint()? as usize;
        Ok(LzssLcpCompressor {
            cfg: cfg.clone(),
            threshold,
            em_decomp,
            mem_mib,
            _marker: std::marker::PhantomData,
        })
    }
}

impl<C: Coder> Compressor for LzssLcpCompressor<C> {
    fn compress(&self, input: &Input, output: &mut dyn Write) -> anyhow::Result<()> {
        let view = input.as_view();
        let n = view.len();
        anyhow::ensure!(
            view.last() == Some(&0),
            "lzss_lcp requires a sentinel-terminated input"
        );

        let factors = StatPhase::wrap("factorize", || factorize(view, self.threshold));

        let phase = StatPhase::new("encode");
        let mut enc = C::encoder(self.cfg.sub_config("coder"), output);
        enc.encode(n as u64, Range::UNIVERSE)?;

        let pos_range = Range::new(0, n as u64);
        let mut i = 0u64;
        let mut fi = 0usize;
        while (i as usize) < n {
            if fi < factors.len() && factors[fi].pos == i {
                let f = factors[fi];
                enc.encode_bit(true)?;
                enc.encode(f.src, pos_range)?;
                enc.encode(f.len, pos_range)?;
                i += f.len;
                fi += 1;
            } else {
                enc.encode_bit(false)?;
                enc.encode(view[i as usize] as u64, Range::BYTE)?;
                i += 1;
            }
        }
        enc.finalize()?;

        phase.log("factors", factors.len() as u64);
        phase.log("threshold", self.threshold);
        Ok(())
    }

    fn decompress(&self, input: &Input, output: &mut dyn Write) -> anyhow::Result<()> {
        let mut dec = C::decoder(self.cfg.sub_config("coder"), input.as_stream());
        let n = dec.decode(Range::UNIVERSE)? as usize;
        let pos_range = Range::new(0, n as u64);

        if self.em_decomp {
            let mut em = PointerJumpEm::new(n, self.mem_mib)?;
            let mut produced = 0u64;
            while (produced as usize) < n {
                if dec.decode_bit()? {
                    let src = dec.decode(pos_range)?;
                    let len = dec.decode(pos_range)?;
                    em.decode_factor(src, len)?;
                    produced += len;
                } else {
                    em.decode_literal(dec.decode(Range::BYTE)? as u8)?;
                    produced += 1;
                }
            }
            StatPhase::wrap("resolve", || em.process())?;
            em.write_to(output)?;
            return Ok(());
        }

        // in-memory back-buffer expansion
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            if dec.decode_bit()? {
                let src = dec.decode(pos_range)? as usize;
                let len = dec.decode(pos_range)? as usize;
                anyhow::ensure!(src + len <= n && src < out.len(), "factor out of bounds");
                for k in 0..len {
                    let b = out[src + k];
                    out.push(b);
                }
            } else {
                out.push(dec.decode(Range::BYTE)? as u8);
            }
        }
        output.write_all(&out)?;
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

    fn build<C: Coder>(spec: &str) -> LzssLcpCompressor<C> {
        let meta = LzssLcpCompressor::<C>::meta();
        let mut lib = meta.known().clone();
        lib.insert(meta.decl()).unwrap();
        let cfg =
            Config::resolve(meta.decl(), &crate::meta::parser::parse(spec).unwrap(), &lib).unwrap();
        LzssLcpCompressor::<C>::from_config(&cfg).unwrap()
    }

    fn roundtrip<C: Coder>(spec: &str, data: &[u8]) -> Vec<u8> {
        assert_eq!(data.last(), Some(&0), "test inputs carry the sentinel");
        let comp = build::<C>(spec);
        let mut packed = Vec::new();
        comp.compress(&Input::from_bytes(data), &mut packed).unwrap();
        let mut unpacked = Vec::new();
        comp.decompress(&Input::from_vec(packed), &mut unpacked).unwrap();
        unpacked
    }

    #[test]
    fn abracadabra_factors() {
        let factors = factorize(b"abracadabra\x00", 3);
        // "abra" at position 7 copies from position 0
        assert!(
            factors.contains(&LzssFactor { pos: 7, src: 0, len: 4 }),
            "factors: {factors:?}"
        );
        for f in &factors {
            assert!(f.src < f.pos);
            assert!(f.len >= 3);
        }
    }

    #[test]
    fn roundtrip_scan() {
        for data in [
            &b"\x00"[..],
            b"a\x00",
            b"abracadabra\x00",
            b"aaaaaaaaaaaaaaaaaaaaaaaa\x00",
            b"abcabcabcabcabcabcabc\x00",
        ] {
            assert_eq!(roundtrip::<BinaryCoder>("lzss_lcp", data), data);
            assert_eq!(roundtrip::<AsciiCoder>("lzss_lcp(coder=ascii)", data), data);
        }
    }

    #[test]
    fn roundtrip_em() {
        let mut data: Vec<u8> = b"the quick brown fox jumps over the lazy dog. "
            .iter()
            .copied()
            .cycle()
            .take(5000)
            .collect();
        data.push(0);
        assert_eq!(roundtrip::<BinaryCoder>("lzss_lcp(decomp=em, mem=1)", &data), data);
    }

    #[test]
    fn overlapping_factors_roundtrip() {
        let mut data = vec![b'a'; 500];
        data.push(0);
        assert_eq!(roundtrip::<BinaryCoder>("lzss_lcp", &data), data);
        assert_eq!(roundtrip::<BinaryCoder>("lzss_lcp(decomp=em, mem=1)", &data), data);
    }

    #[test]
    fn threshold_is_respected() {
        for t in [1u64, 2, 3, 5, 100] {
            let factors = factorize(b"abcabcabcabcabc\x00", t);
            for f in &factors {
                assert!(f.len >= t, "threshold {t}, factor {f:?}");
            }
        }
    }
}
