//! Diesel model sections and scene-graph linking.
//!
//! Model files from the Diesel engine are a flat list of typed sections. This
//! crate decodes the Object3D sections that make up the model's node
//! hierarchy, links them into a parent/child graph with world transforms,
//! and writes them back byte-for-byte. Other section kinds are carried
//! through as raw bytes.
//!
//! # Example
//!
//! ```no_run
//! use pd2model_sections::{Hashlist, ModelFile};
//!
//! let hashlist = Hashlist::load("hashlist.txt")?;
//! let mut model = ModelFile::open("weapon.model")?;
//!
//! for root in model.objects().roots() {
//!     println!("{}", root.summary(&hashlist));
//! }
//!
//! // Move object 12 under object 3 and save.
//! model.objects_mut().set_parent(12, Some(3))?;
//! model.write("weapon_edited.model")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod file;
mod graph;
mod hashlist;
mod header;
mod name;
mod object3d;
mod transform;

pub use error::{Error, Result};
pub use file::{ModelFile, RawSection, Section};
pub use graph::ObjectTable;
pub use hashlist::{HashDictionary, Hashlist};
pub use header::{tags, RawSectionHeader, SectionHeader};
pub use name::HashName;
pub use object3d::{ChildRef, Object3D};
pub use transform::{Decomposed, Transform};
