//! The algorithm catalogue: every monomorphised compressor and generator
//! this build ships, registered under its signature.

use std::io::Write;

use crate::coders::{AsciiCoder, BinaryCoder};
use crate::compressor::{compressor_type, Compressor, FromConfig};
use crate::generators::{
    generator_type, FibonacciGenerator, Generator, RandomGenerator, RunRichGenerator,
    ThueMorseGenerator,
};
use crate::io::input::Input;
use crate::lz78::{Lz78Compressor, Lz78PointerJumpingCompressor, LzwCompressor};
use crate::lzss::LzssLcpCompressor;
use crate::meta::config::Config;
use crate::meta::meta_builder::{Algorithm, Meta};
use crate::registry::Registry;
use crate::trie::{
    BinarySortedTrie, BinaryTrie, CompactHashTrie, EliasDisplacement, HashTrie,
    LayeredDisplacementStrategy, NaiveDisplacementStrategy, RollingTrie, TernaryTrie,
};

/// Copies input to output unchanged; exercises the registry and driver
/// plumbing without touching the data.
pub struct NoopCompressor;

impl Algorithm for NoopCompressor {
    fn meta() -> Meta {
        Meta::new(compressor_type(), "noop", "copies the input unchanged")
    }
}

impl FromConfig for NoopCompressor {
    fn from_config(_cfg: &Config) -> anyhow::Result<Self> {
        Ok(NoopCompressor)
    }
}

impl Compressor for NoopCompressor {
    fn compress(&self, input: &Input, output: &mut dyn Write) -> anyhow::Result<()> {
        output.write_all(input.as_view())?;
        Ok(())
    }

    fn decompress(&self, input: &Input, output: &mut dyn Write) -> anyhow::Result<()> {
        output.write_all(input.as_view())?;
        Ok(())
    }
}

pub type CompressorRegistry = Registry<dyn Compressor + Send + Sync>;
pub type GeneratorRegistry = Registry<dyn Generator + Send + Sync>;

/// All compressors of this build.
pub fn compressor_registry() -> CompressorRegistry {
    let mut reg: CompressorRegistry = Registry::with_root_type(compressor_type());

    macro_rules! register_lz78_like {
        ($comp:ident, $coder:ty) => {
            reg.register::<$comp<$coder, BinaryTrie>>().expect("registry construction");
            reg.register::<$comp<$coder, BinarySortedTrie>>().expect("registry construction");
            reg.register::<$comp<$coder, TernaryTrie>>().expect("registry construction");
            reg.register::<$comp<$coder, HashTrie>>().expect("registry construction");
            reg.register::<$comp<$coder, RollingTrie>>().expect("registry construction");
            reg.register::<$comp<$coder, CompactHashTrie<NaiveDisplacementStrategy>>>()
                .expect("registry construction");
            reg.register::<$comp<$coder, CompactHashTrie<LayeredDisplacementStrategy>>>()
                .expect("registry construction");
            reg.register::<$comp<$coder, CompactHashTrie<EliasDisplacement>>>()
                .expect("registry construction");
        };
    }

    register_lz78_like!(Lz78Compressor, BinaryCoder);
    register_lz78_like!(Lz78Compressor, AsciiCoder);
    register_lz78_like!(Lz78PointerJumpingCompressor, BinaryCoder);
    register_lz78_like!(Lz78PointerJumpingCompressor, AsciiCoder);

    reg.register::<LzwCompressor<BinaryCoder, TernaryTrie>>().expect("registry construction");
    reg.register::<LzwCompressor<BinaryCoder, HashTrie>>().expect("registry construction");
    reg.register::<LzwCompressor<AsciiCoder, TernaryTrie>>().expect("registry construction");
    reg.register::<LzwCompressor<AsciiCoder, HashTrie>>().expect("registry construction");

    reg.register::<LzssLcpCompressor<BinaryCoder>>().expect("registry construction");
    reg.register::<LzssLcpCompressor<AsciiCoder>>().expect("registry construction");

    reg.register::<NoopCompressor>().expect("registry construction");

    reg
}

/// All string generators of this build.
pub fn generator_registry() -> GeneratorRegistry {
    let mut reg: GeneratorRegistry = Registry::with_root_type(generator_type());
    reg.register::<RandomGenerator>().expect("registry construction");
    reg.register::<FibonacciGenerator>().expect("registry construction");
    reg.register::<ThueMorseGenerator>().expect("registry construction");
    reg.register::<RunRichGenerator>().expect("registry construction");
    reg
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registries_build() {
        let c = compressor_registry();
        assert!(c.doc_lines().len() > 30);
        let g = generator_registry();
        assert_eq!(g.doc_lines().len(), 4);
    }

    #[test]
    fn default_selections_resolve() {
        let reg = compressor_registry();
        for spec in [
            "lz78",
            "lz78(ascii)",
            "lz78(coder=ascii, lz_trie=compact_hash)",
            "lz78_pj(jump_width=2)",
            "lzw",
            "lzss_lcp",
            "noop",
        ] {
            let sel = reg.select(spec);
            assert!(sel.is_ok(), "spec {spec}: {:?}", sel.err().map(|e| e.to_string()));
        }
    }

    #[test]
    fn unknown_signature_reports_no_implementation() {
        let reg = compressor_registry();
        // lzw is not registered with every trie
        let err = reg.select("lzw(lz_trie=compact_hash)").unwrap_err();
        assert!(
            err.to_string().contains("No implementation found for algorithm"),
            "{err}"
        );
    }
}
