//! Uniform input abstraction over memory views, files, and streams.
//!
//! An [`Input`] is a window onto a materialised, possibly escape-restricted
//! byte buffer.  All three sources converge on the same in-memory
//! representation:
//!
//! * memory views are copied (and escaped) into a private buffer;
//! * files are memory-mapped: read-only when no rewriting is needed, with a
//!   one-byte over-map when only a trailing sentinel is required and the file
//!   length is not a page multiple (the kernel zero page provides it);
//! * streams are drained into a page-granular growing buffer and escaped in
//!   place.
//!
//! Slicing never re-reads the source: child inputs share the parent's buffer
//! through an `Arc` and only narrow the window.

use std::fs::File;
use std::io::{self, Read};
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;

use super::restrict::{self, InputRestrictions, UnescapeError};

/// Allocation granularity for stream buffering.
pub(crate) fn page_size() -> usize {
    // SAFETY: sysconf with a valid name has no preconditions.
    let ps = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if ps <= 0 {
        4096
    } else {
        ps as usize
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backing storage
// ─────────────────────────────────────────────────────────────────────────────

enum Backing {
    Owned(Vec<u8>),
    Map(Mmap),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Owned(v) => v,
            Backing::Map(m) => m,
        }
    }
}

struct InputBuffer {
    backing: Backing,
    /// The restrictions the buffer contents currently satisfy.
    restrictions: InputRestrictions,
}

// ─────────────────────────────────────────────────────────────────────────────
// Input
// ─────────────────────────────────────────────────────────────────────────────

/// A readable window onto restricted input data.
#[derive(Clone)]
pub struct Input {
    buf: Arc<InputBuffer>,
    range: Range<usize>,
}

/// Errors produced while acquiring or re-restricting input data.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("input path not found or is not a file: {0}")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Unescape(#[from] UnescapeError),
}

impl Input {
    fn from_buffer(backing: Backing, restrictions: InputRestrictions) -> Self {
        let len = backing.bytes().len();
        Input {
            buf: Arc::new(InputBuffer { backing, restrictions }),
            range: 0..len,
        }
    }

    /// Input over a byte slice, with no restrictions applied.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::from_buffer(Backing::Owned(data.to_vec()), InputRestrictions::none())
    }

    /// Input over an owned buffer, with no restrictions applied.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self::from_buffer(Backing::Owned(data), InputRestrictions::none())
    }

    /// Memory-maps a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InputError> {
        Self::from_path_restricted(path, &InputRestrictions::none())
    }

    /// Memory-maps a file and applies `restrictions` up front.
    pub fn from_path_restricted(
        path: impl AsRef<Path>,
        restrictions: &InputRestrictions,
    ) -> Result<Self, InputError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(InputError::NotFound(path.display().to_string()));
        }
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;

        if !restrictions.has_restrictions() || len == 0 {
            if restrictions.has_restrictions() {
                // empty file still needs the escape pass for the sentinel
                let data = restrict::escape(&[], restrictions);
                return Ok(Self::from_buffer(Backing::Owned(data), restrictions.clone()));
            }
            let backing = if len == 0 {
                Backing::Owned(Vec::new())
            } else {
                // SAFETY: the file stays open for the mapping's lifetime and
                // is never truncated by this process.
                Backing::Map(unsafe { Mmap::map(&file)? })
            };
            return Ok(Self::from_buffer(backing, restrictions.clone()));
        }

        let only_nul = !restrictions.has_escape_restrictions() && restrictions.null_terminate();
        if only_nul && len % page_size() != 0 {
            // the mapping's zero fill past EOF is the sentinel — no copy
            // SAFETY: as above; the extra byte stays inside the final page.
            let map = unsafe { memmap2::MmapOptions::new().len(len + 1).map(&file)? };
            return Ok(Self::from_buffer(Backing::Map(map), restrictions.clone()));
        }

        // Escaping rewrites the data, so materialise a private copy with the
        // grown size and escape in place.
        // SAFETY: as above.
        let map = unsafe { Mmap::map(&file)? };
        let grown = len + restrict::escaped_growth(&map, restrictions);
        let mut buf = Vec::with_capacity(grown);
        buf.extend_from_slice(&map);
        buf.resize(grown, 0);
        restrict::escape_in_place(&mut buf, len, restrictions);
        Ok(Self::from_buffer(Backing::Owned(buf), restrictions.clone()))
    }

    /// Drains a stream into a page-granular buffer and applies `restrictions`.
    pub fn from_stream(
        mut stream: impl Read,
        restrictions: &InputRestrictions,
    ) -> Result<Self, InputError> {
        let ps = page_size();
        let mut buf: Vec<u8> = Vec::with_capacity(ps);
        let mut len = 0usize;
        loop {
            if buf.capacity() == len {
                buf.reserve(buf.capacity().max(ps));
            }
            buf.resize(buf.capacity(), 0);
            let n = stream.read(&mut buf[len..])?;
            if n == 0 {
                break;
            }
            len += n;
        }
        buf.truncate(len);

        let grown = len + restrict::escaped_growth(&buf, restrictions);
        buf.resize(grown, 0);
        restrict::escape_in_place(&mut buf, len, restrictions);
        Ok(Self::from_buffer(Backing::Owned(buf), restrictions.clone()))
    }

    /// The restrictions the current contents satisfy.
    pub fn restrictions(&self) -> &InputRestrictions {
        &self.buf.restrictions
    }

    /// Applies a (possibly different) restriction set.
    ///
    /// An already-restricted buffer is first unescaped back to the original
    /// bytes, then re-escaped; a no-op when the restrictions already match.
    pub fn restricted(self, restrictions: &InputRestrictions) -> Result<Self, InputError> {
        if self.buf.restrictions == *restrictions {
            return Ok(self);
        }
        let original = if self.buf.restrictions.has_restrictions() {
            restrict::unescape(self.as_view(), &self.buf.restrictions)?
        } else {
            self.as_view().to_vec()
        };
        let data = restrict::escape(&original, restrictions);
        Ok(Self::from_buffer(Backing::Owned(data), restrictions.clone()))
    }

    /// Window starting at `offset`, to the end of this input.
    pub fn slice(&self, offset: usize) -> Input {
        assert!(offset <= self.range.len());
        Input {
            buf: Arc::clone(&self.buf),
            range: self.range.start + offset..self.range.end,
        }
    }

    /// Window `[offset, offset + len)` of this input.
    pub fn slice_len(&self, offset: usize, len: usize) -> Input {
        assert!(offset + len <= self.range.len());
        let start = self.range.start + offset;
        Input { buf: Arc::clone(&self.buf), range: start..start + len }
    }

    pub fn size(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Contiguous view of the window.
    pub fn as_view(&self) -> &[u8] {
        &self.buf.backing.bytes()[self.range.clone()]
    }

    /// A `Read` cursor over the window.  Shares the backing buffer.
    pub fn as_stream(&self) -> InputReader {
        InputReader { input: self.clone(), pos: 0 }
    }
}

/// Cursor returned by [`Input::as_stream`].
pub struct InputReader {
    input: Input,
    pos: usize,
}

impl Read for InputReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let view = self.input.as_view();
        let n = buf.len().min(view.len() - self.pos);
        buf[..n].copy_from_slice(&view[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_source_escapes_into_private_buffer() {
        let r = InputRestrictions::sentinel();
        let input = Input::from_bytes(b"ab\x00cd").restricted(&r).unwrap();
        // 0 escaped as (0xff, 0), sentinel appended
        assert_eq!(input.as_view(), b"ab\xff\x00cd\x00");
    }

    #[test]
    fn slicing_shares_the_buffer() {
        let input = Input::from_bytes(b"hello world");
        let child = input.slice(6);
        assert_eq!(child.as_view(), b"world");
        let grandchild = child.slice_len(1, 3);
        assert_eq!(grandchild.as_view(), b"orl");
    }

    #[test]
    fn rerestricting_goes_through_the_original() {
        let a = InputRestrictions::new([0], true);
        let b = InputRestrictions::new([0, 0xff], true);
        let input = Input::from_bytes(b"x\x00y\xffz").restricted(&a).unwrap();
        let input = input.restricted(&b).unwrap();
        // under b: escape byte 0xfe, 0 -> (fe 00), ff -> (fe 01)
        assert_eq!(input.as_view(), b"x\xfe\x00y\xfe\x01z\x00");
        let back = input.restricted(&InputRestrictions::none()).unwrap();
        assert_eq!(back.as_view(), b"x\x00y\xffz");
    }

    #[test]
    fn stream_source_is_materialised_once() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let r = InputRestrictions::new([0], true);
        let input = Input::from_stream(&data[..], &r).unwrap();
        let expect = restrict::escape(&data, &r);
        assert_eq!(input.as_view(), &expect[..]);
    }

    #[test]
    fn reader_covers_the_window() {
        let input = Input::from_bytes(b"abcdef");
        let mut s = String::new();
        input.slice_len(2, 3).as_stream().read_to_string(&mut s).unwrap();
        assert_eq!(s, "cde");
    }
}
