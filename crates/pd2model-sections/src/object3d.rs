//! Object3D sections.
//!
//! An Object3D is a named node in the model's scene graph with a local
//! transform and a parent. Its payload layout (little-endian) is:
//!
//! | Size | Field |
//! |------|-------|
//! | 8 | name hash |
//! | 4 | child reference count N |
//! | 12N | N x (referenced id: u32, 8 reserved bytes) |
//! | 64 | 4x4 local transform, row-major f32 |
//! | 12 | translation (M41, M42, M43), overrides the matrix's own |
//! | 4 | parent id, 0 for a root |
//! | rest | unparsed trailing bytes |
//!
//! The translation is stored twice; only the second copy is read back and
//! both copies are written from it.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use glam::Vec3;
use pd2model_common::BinaryReader;

use crate::hashlist::HashDictionary;
use crate::header::{tags, SectionHeader};
use crate::name::HashName;
use crate::transform::Transform;
use crate::{Error, Result};

/// Size of the payload before the child references.
const HEAD_SIZE: usize = 8 + 4;
/// Size of one child reference entry.
const CHILD_REF_SIZE: usize = 4 + 8;
/// Size of the payload after the child references.
const TAIL_SIZE: usize = 64 + 12 + 4;

/// A child reference entry carried in an Object3D payload.
///
/// These are kept for round-tripping only; linking uses the parent id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildRef {
    /// Referenced section id.
    pub id: u32,
    /// Reserved bytes as read. Always written back as zeros.
    pub reserved: [u8; 8],
}

impl ChildRef {
    /// A reference with zeroed reserved bytes.
    pub const fn new(id: u32) -> Self {
        Self {
            id,
            reserved: [0; 8],
        }
    }
}

/// A positioned, named, parented scene object.
#[derive(Debug, Clone)]
pub struct Object3D {
    pub(crate) id: u32,
    size: u32,
    name: HashName,
    child_refs: Vec<ChildRef>,
    transform: Transform,
    pub(crate) raw_parent_id: u32,
    trailing: Vec<u8>,

    // Runtime link state, never read from disk.
    pub(crate) parent: Option<u32>,
    pub(crate) children: Vec<u32>,
    pub(crate) world_transform: Transform,
    pub(crate) linked: bool,
}

impl Object3D {
    /// Create an unlinked root object with an identity transform.
    pub fn new(id: u32, name: HashName) -> Self {
        Self {
            id,
            size: 0,
            name,
            child_refs: Vec::new(),
            transform: Transform::IDENTITY,
            raw_parent_id: 0,
            trailing: Vec::new(),
            parent: None,
            children: Vec::new(),
            world_transform: Transform::IDENTITY,
            linked: false,
        }
    }

    /// Parse an Object3D from a standalone payload.
    pub fn parse(id: u32, payload: &[u8]) -> Result<Self> {
        let header = SectionHeader::new(tags::OBJECT3D, id, payload.len() as u32, 0);
        let mut reader = BinaryReader::new(payload);
        Self::read(&mut reader, &header)
    }

    /// Read an Object3D section.
    ///
    /// The reader is seeked to the header's payload start. Any bytes between
    /// the fixed fields and the header's declared end are kept verbatim.
    pub fn read(reader: &mut BinaryReader<'_>, header: &SectionHeader) -> Result<Self> {
        reader.seek(header.start);

        let mut object =
            Self::read_fixed(reader).map_err(|e| truncated(header.id, reader.position(), e))?;
        object.id = header.id;
        object.size = header.size;

        let end = header.end();
        if reader.position() > end {
            return Err(Error::TruncatedRecord {
                section: header.id,
                offset: end,
                needed: reader.position() - header.start,
                available: header.size as usize,
            });
        }

        let trailing = reader
            .read_bytes_to(end)
            .map_err(|e| truncated(header.id, reader.position(), e))?;
        if !trailing.is_empty() {
            log::debug!(
                "object3d {}: keeping {} unparsed trailing bytes",
                header.id,
                trailing.len()
            );
        }
        object.trailing = trailing.to_vec();

        Ok(object)
    }

    fn read_fixed(reader: &mut BinaryReader<'_>) -> pd2model_common::Result<Self> {
        let name = HashName::from_hash(reader.read_u64()?);

        let child_count = reader.read_u32()? as usize;
        // Cap the preallocation by what the buffer could actually hold.
        let mut child_refs = Vec::with_capacity(child_count.min(reader.remaining() / CHILD_REF_SIZE));
        for _ in 0..child_count {
            let id = reader.read_u32()?;
            let reserved = reader.read_array::<8>()?;
            child_refs.push(ChildRef { id, reserved });
        }

        let rows = reader.read_f32_array::<16>()?;
        let mut transform = Transform::from_rows_array(&rows);
        let [x, y, z] = reader.read_f32_array::<3>()?;
        transform.set_translation(Vec3::new(x, y, z));

        let raw_parent_id = reader.read_u32()?;

        let mut object = Self::new(0, name);
        object.child_refs = child_refs;
        object.transform = transform;
        object.raw_parent_id = raw_parent_id;
        Ok(object)
    }

    /// Write the payload.
    ///
    /// The parent id comes from the live parent once the object is linked,
    /// otherwise from the id read from disk.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_u64::<LittleEndian>(self.name.hash())?;

        out.write_u32::<LittleEndian>(self.child_refs.len() as u32)?;
        for child in &self.child_refs {
            out.write_u32::<LittleEndian>(child.id)?;
            out.write_u64::<LittleEndian>(0)?;
        }

        for value in self.transform.to_rows_array() {
            out.write_f32::<LittleEndian>(value)?;
        }
        let translation = self.transform.translation();
        out.write_f32::<LittleEndian>(translation.x)?;
        out.write_f32::<LittleEndian>(translation.y)?;
        out.write_f32::<LittleEndian>(translation.z)?;

        out.write_u32::<LittleEndian>(self.parent_id())?;
        out.write_all(&self.trailing)?;
        Ok(())
    }

    /// Encode the payload to a new buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Length of the encoded payload.
    pub fn encoded_len(&self) -> usize {
        HEAD_SIZE + CHILD_REF_SIZE * self.child_refs.len() + TAIL_SIZE + self.trailing.len()
    }

    /// Register this object's name with a dictionary.
    pub fn collect_hashes<D: HashDictionary + ?Sized>(&self, dict: &mut D) {
        self.name.collect(dict);
    }

    /// One-line description with the name resolved through a dictionary.
    pub fn summary<D: HashDictionary + ?Sized>(&self, dict: &D) -> String {
        format!(
            "[Object3D] ID: {} size: {} name: {} children: {} {} parent: {}{}",
            self.id,
            self.size,
            self.name.display_string(dict),
            self.child_refs.len(),
            self.transform,
            self.parent_id(),
            self.trailing_note()
        )
    }

    fn trailing_note(&self) -> String {
        if self.trailing.is_empty() {
            String::new()
        } else {
            format!(" trailing: {} bytes", self.trailing.len())
        }
    }

    /// Section identifier.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Declared payload size when read, 0 for created objects.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn name(&self) -> &HashName {
        &self.name
    }

    pub fn set_name(&mut self, name: HashName) {
        self.name = name;
    }

    /// Local transform.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Replace the local transform.
    ///
    /// World transforms are not refreshed; call
    /// [`ObjectTable::update_transforms`](crate::ObjectTable::update_transforms).
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn child_refs(&self) -> &[ChildRef] {
        &self.child_refs
    }

    pub fn child_refs_mut(&mut self) -> &mut Vec<ChildRef> {
        &mut self.child_refs
    }

    /// Parent id as read from disk.
    pub fn raw_parent_id(&self) -> u32 {
        self.raw_parent_id
    }

    /// The parent id that will be written.
    pub fn parent_id(&self) -> u32 {
        if self.linked {
            self.parent.unwrap_or(0)
        } else {
            self.raw_parent_id
        }
    }

    /// Live parent, once linked.
    pub fn parent(&self) -> Option<u32> {
        self.parent
    }

    /// Live children in link order.
    pub fn children(&self) -> &[u32] {
        &self.children
    }

    pub fn world_transform(&self) -> &Transform {
        &self.world_transform
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Unparsed bytes after the fixed fields.
    pub fn trailing(&self) -> &[u8] {
        &self.trailing
    }
}

impl std::fmt::Display for Object3D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[Object3D] ID: {} size: {} name: {} children: {} {} parent: {}{}",
            self.id,
            self.size,
            self.name,
            self.child_refs.len(),
            self.transform,
            self.parent_id(),
            self.trailing_note()
        )
    }
}

fn truncated(section: u32, offset: usize, err: pd2model_common::Error) -> Error {
    match err {
        pd2model_common::Error::UnexpectedEof { needed, available } => Error::TruncatedRecord {
            section,
            offset,
            needed,
            available,
        },
        other => Error::Common(other),
    }
}
