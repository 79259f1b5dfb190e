//! I/O layer: bit streams, restricted buffers, input/output abstraction.

pub mod bits;
pub mod input;
pub mod output;
pub mod restrict;

pub use bits::{BitReader, BitWriter};
pub use input::{Input, InputError};
pub use output::{Output, OutputError, RestrictedOutput};
pub use restrict::{EscapeMap, InputRestrictions};
