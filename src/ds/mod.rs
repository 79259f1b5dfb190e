//! Core data structures: packed integer vectors and text indexes.

pub mod int_vector;
pub mod suffix_array;
pub mod text;

pub use int_vector::{BitVec, FixedIntVector, IntVector};
pub use text::{Space, TextDs};
