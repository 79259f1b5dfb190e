//! Bit-packed binary coder.

use std::io::{self, Read, Write};

use crate::compressor::coder_type;
use crate::io::bits::{BitReader, BitWriter};
use crate::meta::config::Config;
use crate::meta::meta_builder::{Algorithm, Meta};

use super::{Coder, Decoder, Encoder, Range};

/// Encodes every value in the minimal bit width of its range; unbounded
/// ranges use the 7-bit-group varint of the bit layer.
pub struct BinaryCoder;

impl Algorithm for BinaryCoder {
    fn meta() -> Meta {
        Meta::new(coder_type(), "binary", "fixed-width bit packing")
    }
}

pub struct BinaryEncoder<W: Write> {
    bits: BitWriter<W>,
}

impl<W: Write> Encoder for BinaryEncoder<W> {
    fn encode(&mut self, v: u64, range: Range) -> io::Result<()> {
        debug_assert!(v >= range.min && v <= range.max);
        if range.is_unbounded() {
            self.bits.write_compressed_int(v - range.min)
        } else {
            self.bits.write_int(v - range.min, range.bit_width())
        }
    }

    fn finalize(&mut self) -> io::Result<()> {
        self.bits.flush()
    }
}

pub struct BinaryDecoder<R: Read> {
    bits: BitReader<R>,
}

impl<R: Read> Decoder for BinaryDecoder<R> {
    fn decode(&mut self, range: Range) -> io::Result<u64> {
        let unexpected =
            || io::Error::new(io::ErrorKind::UnexpectedEof, "binary code stream ended early");
        if range.is_unbounded() {
            let v = self.bits.read_compressed_int()?.ok_or_else(unexpected)?;
            Ok(v + range.min)
        } else {
            let v = self.bits.read_int(range.bit_width())?.ok_or_else(unexpected)?;
            Ok(v + range.min)
        }
    }
}

impl Coder for BinaryCoder {
    type Encoder<W: Write> = BinaryEncoder<W>;
    type Decoder<R: Read> = BinaryDecoder<R>;

    fn encoder<W: Write>(_cfg: &Config, sink: W) -> BinaryEncoder<W> {
        BinaryEncoder { bits: BitWriter::new(sink) }
    }

    fn decoder<R: Read>(_cfg: &Config, source: R) -> BinaryDecoder<R> {
        BinaryDecoder { bits: BitReader::new(source) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::meta_builder::Algorithm;

    fn cfg() -> Config {
        let meta = BinaryCoder::meta();
        let mut lib = meta.known().clone();
        lib.insert(meta.decl()).unwrap();
        Config::resolve(meta.decl(), &crate::meta::parser::parse("binary").unwrap(), &lib).unwrap()
    }

    #[test]
    fn roundtrip_mixed_ranges() {
        let cfg = cfg();
        let mut buf = Vec::new();
        {
            let mut enc = BinaryCoder::encoder(&cfg, &mut buf);
            enc.encode_bit(true).unwrap();
            enc.encode(200, Range::BYTE).unwrap();
            enc.encode(7, Range::new(3, 10)).unwrap();
            enc.encode(1 << 40, Range::UNIVERSE).unwrap();
            enc.finalize().unwrap();
        }
        let mut dec = BinaryCoder::decoder(&cfg, &buf[..]);
        assert!(dec.decode_bit().unwrap());
        assert_eq!(dec.decode(Range::BYTE).unwrap(), 200);
        assert_eq!(dec.decode(Range::new(3, 10)).unwrap(), 7);
        assert_eq!(dec.decode(Range::UNIVERSE).unwrap(), 1 << 40);
    }
}
