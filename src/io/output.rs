//! Output sinks and the unescape-on-write wrapper.
//!
//! Algorithm code writes *escaped* bytes; [`RestrictedOutput`] translates
//! them back to the original byte sequence on the way to the sink, so files
//! always receive unrestricted data.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::restrict::{EscapeMap, InputRestrictions};

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

enum Sink {
    File(BufWriter<File>),
    Stdout(io::Stdout),
    Memory(Vec<u8>),
}

/// A byte sink: file, stdout, or an in-memory buffer.
pub struct Output {
    sink: Sink,
}

/// Errors produced when opening output targets.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("output file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Output {
    /// Creates (or, with `overwrite`, truncates) a file sink.
    pub fn create_path(path: impl AsRef<Path>, overwrite: bool) -> Result<Self, OutputError> {
        let path = path.as_ref();
        if !overwrite && path.exists() {
            return Err(OutputError::AlreadyExists(path.to_path_buf()));
        }
        let file = File::create(path)?;
        Ok(Output { sink: Sink::File(BufWriter::new(file)) })
    }

    pub fn stdout() -> Self {
        Output { sink: Sink::Stdout(io::stdout()) }
    }

    /// In-memory sink; retrieve the bytes with [`Output::into_vec`].
    pub fn memory() -> Self {
        Output { sink: Sink::Memory(Vec::new()) }
    }

    pub fn as_writer(&mut self) -> &mut dyn Write {
        match &mut self.sink {
            Sink::File(w) => w,
            Sink::Stdout(w) => w,
            Sink::Memory(v) => v,
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.as_writer().flush()
    }

    /// The collected bytes of a memory sink.
    ///
    /// Panics on file or stdout sinks.
    pub fn into_vec(self) -> Vec<u8> {
        match self.sink {
            Sink::Memory(v) => v,
            _ => panic!("into_vec on a non-memory output"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RestrictedOutput
// ─────────────────────────────────────────────────────────────────────────────

/// Unescapes restricted bytes on the fly while writing.
///
/// Under `null_terminate` exactly one trailing `0` is the sentinel and must
/// not reach the sink.  Since "trailing" is only known at the end, raw zeros
/// are held back and released once a later non-zero byte proves they were
/// data; [`RestrictedOutput::finish`] (also run on drop) releases all but
/// the final one.
pub struct RestrictedOutput<W: Write> {
    /// `None` only after `into_inner` moved the sink out.
    inner: Option<W>,
    map: Option<EscapeMap>,
    escape_byte: u8,
    null_terminate: bool,
    /// An escape byte was consumed; the next byte is its code.
    pending_escape: bool,
    /// Raw zeros held back until proven to be data.
    held_zeros: usize,
    finished: bool,
}

impl<W: Write> RestrictedOutput<W> {
    pub fn new(inner: W, restrictions: &InputRestrictions) -> Self {
        let map = restrictions
            .has_escape_restrictions()
            .then(|| EscapeMap::new(restrictions));
        let escape_byte = map.as_ref().map(|m| m.escape_byte()).unwrap_or(0);
        RestrictedOutput {
            inner: Some(inner),
            map,
            escape_byte,
            null_terminate: restrictions.null_terminate(),
            pending_escape: false,
            held_zeros: 0,
            finished: false,
        }
    }

    fn inner_mut(&mut self) -> &mut W {
        self.inner.as_mut().expect("sink present until into_inner")
    }

    fn release_held(&mut self, keep_back: usize) -> io::Result<()> {
        while self.held_zeros > keep_back {
            self.inner_mut().write_all(&[0])?;
            self.held_zeros -= 1;
        }
        Ok(())
    }

    fn put(&mut self, b: u8) -> io::Result<()> {
        if self.null_terminate {
            if b == 0 {
                self.held_zeros += 1;
                return Ok(());
            }
            self.release_held(0)?;
        }
        self.inner_mut().write_all(&[b])
    }

    /// Drops the trailing sentinel and flushes.  Runs on drop if not called.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.finished || self.inner.is_none() {
            return Ok(());
        }
        self.finished = true;
        // all held zeros but the sentinel itself were data
        self.release_held(1)?;
        self.held_zeros = 0;
        self.inner_mut().flush()
    }

    pub fn into_inner(mut self) -> io::Result<W> {
        self.finish()?;
        Ok(self.inner.take().expect("sink present until into_inner"))
    }
}

impl<W: Write> Write for RestrictedOutput<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &b in buf {
            if self.pending_escape {
                self.pending_escape = false;
                let map = self.map.as_ref().expect("pending escape without a map");
                let original = map.original(b);
                self.put(original)?;
                continue;
            }
            if self.map.is_some() && b == self.escape_byte {
                self.pending_escape = true;
                continue;
            }
            self.put(b)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner_mut().flush()
    }
}

impl<W: Write> Drop for RestrictedOutput<W> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.finish();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::restrict::escape;

    fn roundtrip(data: &[u8], r: &InputRestrictions) -> Vec<u8> {
        let escaped = escape(data, r);
        let mut out = Vec::new();
        {
            let mut w = RestrictedOutput::new(&mut out, r);
            // write in awkward chunk sizes to cross escape-pair boundaries
            for chunk in escaped.chunks(3) {
                w.write_all(chunk).unwrap();
            }
            w.finish().unwrap();
        }
        out
    }

    #[test]
    fn unescapes_to_original_bytes() {
        let r = InputRestrictions::new([0, 0xff], true);
        let data = b"test\x00\x00\xff\xfeabcd";
        assert_eq!(roundtrip(data, &r), data);
    }

    #[test]
    fn sentinel_only_strips_exactly_one_trailing_zero() {
        let r = InputRestrictions::new([], true);
        assert_eq!(roundtrip(b"abc", &r), b"abc");
        // interior and trailing zeros are data; only the sentinel goes
        assert_eq!(roundtrip(b"a\x00b\x00", &r), b"a\x00b\x00");
    }

    #[test]
    fn no_restrictions_passes_through() {
        let r = InputRestrictions::none();
        assert_eq!(roundtrip(b"\x00\xff\xferaw", &r), b"\x00\xff\xferaw");
    }

    #[test]
    fn escaped_zero_is_data_not_sentinel() {
        let r = InputRestrictions::new([0], true);
        assert_eq!(roundtrip(b"x\x00", &r), b"x\x00");
    }

    #[test]
    fn memory_output_collects() {
        let mut out = Output::memory();
        out.as_writer().write_all(b"xyz").unwrap();
        assert_eq!(out.into_vec(), b"xyz");
    }
}
