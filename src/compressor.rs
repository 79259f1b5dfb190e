//! The compressor contract.

use std::io::Write;

use crate::io::input::Input;
use crate::meta::config::Config;
use crate::meta::decl::TypeDesc;

/// The root algorithm type of every registered compressor.
pub fn compressor_type() -> TypeDesc {
    TypeDesc::new("compressor")
}

/// Type of entropy coders bound as sub-algorithms.
pub fn coder_type() -> TypeDesc {
    TypeDesc::new("coder")
}

/// Constructed from a resolved configuration.
pub trait FromConfig: Sized {
    fn from_config(cfg: &Config) -> anyhow::Result<Self>;
}

/// A registered compression algorithm.
///
/// Inputs arrive already escaped according to the declaration's aggregated
/// input restrictions; outputs are written escaped and unescaped again by the
/// driver's restricted sink.
pub trait Compressor {
    fn compress(&self, input: &Input, output: &mut dyn Write) -> anyhow::Result<()>;
    fn decompress(&self, input: &Input, output: &mut dyn Write) -> anyhow::Result<()>;
}
