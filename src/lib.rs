//! tdc — a composable lossless compression framework.
//!
//! The crate is organised around a compositional algorithm registry:
//! compressors are declared with typed parameters ([`meta`]), resolved from a
//! textual configuration grammar at run time, and dispatched statically
//! through their bound-strategy signature ([`registry`]).  The building
//! blocks (bit streams, restricted I/O buffers, packed integer vectors,
//! compact quotient hashing, suffix/LCP indexes, LZ78 tries) are public and
//! usable on their own.
//!
//! ```no_run
//! use tdc::catalogue::compressor_registry;
//! use tdc::io::input::Input;
//!
//! let registry = compressor_registry();
//! let sel = registry.select("lz78(coder=ascii)").unwrap();
//! let mut packed = Vec::new();
//! sel.instance()
//!     .compress(&Input::from_bytes(b"abcdebcdeabc"), &mut packed)
//!     .unwrap();
//! ```

pub mod catalogue;
pub mod cli;
pub mod coders;
pub mod compressor;
pub mod ds;
pub mod generators;
pub mod hash;
pub mod io;
pub mod lz78;
pub mod lzss;
pub mod meta;
pub mod registry;
pub mod stats;
pub mod trie;

pub use compressor::{Compressor, FromConfig};
pub use meta::{Algorithm, Config, Meta, TypeDesc};
pub use registry::{Registry, RegistryError, Selection};

/// Crate version, as reported by `tdc --version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
