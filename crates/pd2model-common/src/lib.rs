//! Common utilities for pd2model.
//!
//! This crate provides the foundational pieces shared by the model crates:
//!
//! - [`BinaryReader`] - Zero-copy little-endian reading from byte slices
//! - [`hash`] - The engine's 64-bit string hash used for symbolic names

mod error;
mod reader;

pub mod hash;

pub use error::{Error, Result};
pub use reader::BinaryReader;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
