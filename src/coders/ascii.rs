//! Human-readable decimal coder.
//!
//! Values are written as decimal with a `:` terminator, regardless of range.
//! Output is byte-oriented; mostly useful for debugging compressed streams
//! and for the driver tests that inspect file contents.

use std::io::{self, Read, Write};

use crate::compressor::coder_type;
use crate::meta::config::Config;
use crate::meta::meta_builder::{Algorithm, Meta};

use super::{Coder, Decoder, Encoder, Range};

pub struct AsciiCoder;

impl Algorithm for AsciiCoder {
    fn meta() -> Meta {
        Meta::new(coder_type(), "ascii", "decimal values with ':' separators")
    }
}

pub struct AsciiEncoder<W: Write> {
    sink: W,
}

impl<W: Write> Encoder for AsciiEncoder<W> {
    fn encode(&mut self, v: u64, range: Range) -> io::Result<()> {
        debug_assert!(v >= range.min && v <= range.max);
        write!(self.sink, "{v}:")
    }

    fn finalize(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

pub struct AsciiDecoder<R: Read> {
    source: R,
}

impl<R: Read> Decoder for AsciiDecoder<R> {
    fn decode(&mut self, _range: Range) -> io::Result<u64> {
        let mut v: u64 = 0;
        let mut any = false;
        let mut byte = [0u8; 1];
        loop {
            let n = self.source.read(&mut byte)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "ascii code stream ended early",
                ));
            }
            match byte[0] {
                b'0'..=b'9' => {
                    any = true;
                    v = v
                        .checked_mul(10)
                        .and_then(|v| v.checked_add((byte[0] - b'0') as u64))
                        .ok_or_else(|| {
                            io::Error::new(io::ErrorKind::InvalidData, "ascii value overflows")
                        })?;
                }
                b':' if any => return Ok(v),
                other => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("unexpected byte {other:#04x} in ascii code stream"),
                    ))
                }
            }
        }
    }
}

impl Coder for AsciiCoder {
    type Encoder<W: Write> = AsciiEncoder<W>;
    type Decoder<R: Read> = AsciiDecoder<R>;

    fn encoder<W: Write>(_cfg: &Config, sink: W) -> AsciiEncoder<W> {
        AsciiEncoder { sink }
    }

    fn decoder<R: Read>(_cfg: &Config, source: R) -> AsciiDecoder<R> {
        AsciiDecoder { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        let meta = AsciiCoder::meta();
        let mut lib = meta.known().clone();
        lib.insert(meta.decl()).unwrap();
        Config::resolve(meta.decl(), &crate::meta::parser::parse("ascii").unwrap(), &lib).unwrap()
    }

    #[test]
    fn output_is_readable_decimal() {
        let cfg = cfg();
        let mut buf = Vec::new();
        {
            let mut enc = AsciiCoder::encoder(&cfg, &mut buf);
            enc.encode(0, Range::BYTE).unwrap();
            enc.encode(12345, Range::UNIVERSE).unwrap();
            enc.encode_bit(true).unwrap();
            enc.finalize().unwrap();
        }
        assert_eq!(buf, b"0:12345:1:");

        let mut dec = AsciiCoder::decoder(&cfg, &buf[..]);
        assert_eq!(dec.decode(Range::BYTE).unwrap(), 0);
        assert_eq!(dec.decode(Range::UNIVERSE).unwrap(), 12345);
        assert!(dec.decode_bit().unwrap());
    }

    #[test]
    fn garbage_is_rejected() {
        let cfg = cfg();
        let mut dec = AsciiCoder::decoder(&cfg, &b"12x"[..]);
        assert!(dec.decode(Range::UNIVERSE).is_err());
    }
}
