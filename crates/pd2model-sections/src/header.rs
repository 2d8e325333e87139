//! Section headers.
//!
//! Every section in a model file is prefixed by a 12-byte header giving its
//! type tag, its identifier, and its payload size.

use pd2model_common::BinaryReader;
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::Result;

/// Known section type tags.
pub mod tags {
    /// A positioned, named, parented scene object.
    pub const OBJECT3D: u32 = 0x0FFC_D100;
}

/// On-disk layout of a section header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct RawSectionHeader {
    pub type_code: U32,
    pub id: U32,
    pub size: U32,
}

impl RawSectionHeader {
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

/// A parsed section header with the absolute payload offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    /// Section type tag.
    pub type_code: u32,
    /// Section identifier, unique within a file.
    pub id: u32,
    /// Declared payload size in bytes.
    pub size: u32,
    /// Absolute offset of the first payload byte.
    pub start: usize,
}

impl SectionHeader {
    /// Header for a payload that starts at `start`.
    pub const fn new(type_code: u32, id: u32, size: u32, start: usize) -> Self {
        Self {
            type_code,
            id,
            size,
            start,
        }
    }

    /// Read a header, leaving the reader at the start of the payload.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let raw: RawSectionHeader = reader.read_struct()?;
        Ok(Self {
            type_code: raw.type_code.get(),
            id: raw.id.get(),
            size: raw.size.get(),
            start: reader.position(),
        })
    }

    /// Absolute offset one past the last payload byte.
    #[inline]
    pub const fn end(&self) -> usize {
        self.start + self.size as usize
    }

    /// The on-disk header bytes.
    pub fn to_raw(&self) -> RawSectionHeader {
        RawSectionHeader {
            type_code: U32::new(self.type_code),
            id: U32::new(self.id),
            size: U32::new(self.size),
        }
    }

    /// Check if this is an Object3D section.
    pub fn is_object3d(&self) -> bool {
        self.type_code == tags::OBJECT3D
    }
}
