//! pd2model - Diesel engine model file library.
//!
//! This crate provides a unified interface to the pd2model crates for working
//! with `.model` files.
//!
//! # Crates
//!
//! - [`pd2model_common`] - Common utilities (binary reading, the engine string hash)
//! - [`pd2model_sections`] - Object3D sections, hierarchy linking and the file container
//!
//! # Example
//!
//! ```no_run
//! use pd2model::prelude::*;
//!
//! let mut names = Hashlist::load("hashlist.txt")?;
//! let mut model = ModelFile::open("unit.model")?;
//!
//! let root = model.create_object(HashName::from_string("rp_extra", &mut names), None)?;
//! println!("created object {}", root);
//!
//! model.write("unit_out.model")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use pd2model_common as common;
pub use pd2model_sections as sections;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use pd2model_common::{hash, BinaryReader};
    pub use pd2model_sections::{
        HashDictionary, HashName, Hashlist, ModelFile, Object3D, ObjectTable, Section, Transform,
    };
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
