//! Model file handling.
//!
//! A model file is a flat list of sections:
//! - 4 bytes: section count, or -1 for the extended header
//! - extended header only: 4 bytes declared file size, 4 bytes section count
//! - per section: 4 bytes type tag, 4 bytes id, 4 bytes payload size, payload
//!
//! Object3D sections are decoded and linked into an [`ObjectTable`]; every
//! other section kind is kept as raw bytes and written back untouched.

use std::fs;
use std::io::Write;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use pd2model_common::{BinaryReader, IntoBytes};

use crate::graph::ObjectTable;
use crate::hashlist::HashDictionary;
use crate::header::{tags, RawSectionHeader, SectionHeader};
use crate::name::HashName;
use crate::object3d::Object3D;
use crate::{Error, Result};

/// Section count marking the extended header.
const EXTENDED_HEADER: i32 = -1;

/// A section this crate does not decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSection {
    pub type_code: u32,
    pub id: u32,
    pub data: Vec<u8>,
}

/// One entry in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    /// An Object3D, stored in the file's object table under this id.
    Object3D(u32),
    /// Any other section.
    Raw(RawSection),
}

/// A parsed model file.
#[derive(Debug, Clone, Default)]
pub struct ModelFile {
    /// Whether the extended header (with a declared file size) is used.
    extended: bool,
    /// Declared file size minus actual size, as read.
    size_adjust: i64,
    sections: Vec<Section>,
    objects: ObjectTable,
}

impl ModelFile {
    /// Create an empty model that will be written with the extended header.
    pub fn new() -> Self {
        Self {
            extended: true,
            ..Self::default()
        }
    }

    /// Read and link a model file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("reading model {}", path.display());
        let data = fs::read(path)?;
        Self::parse(&data)
    }

    /// Parse and link a model from bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);

        let mut count = reader.read_i32()?;
        let mut extended = false;
        let mut size_adjust = 0;
        if count == EXTENDED_HEADER {
            extended = true;
            let declared = reader.read_u32()?;
            size_adjust = i64::from(declared) - data.len() as i64;
            count = reader.read_i32()?;
        }
        if count < 0 {
            return Err(Error::InvalidSectionCount(count));
        }

        let mut sections = Vec::with_capacity((count as usize).min(reader.remaining() / RawSectionHeader::SIZE));
        let mut objects = ObjectTable::new();

        for _ in 0..count {
            let header = SectionHeader::read(&mut reader)?;
            if header.is_object3d() {
                let object = Object3D::read(&mut reader, &header)?;
                objects.insert(object)?;
                sections.push(Section::Object3D(header.id));
            } else {
                let payload = reader.read_bytes(header.size as usize).map_err(|_| {
                    Error::TruncatedRecord {
                        section: header.id,
                        offset: header.start,
                        needed: header.size as usize,
                        available: data.len().saturating_sub(header.start),
                    }
                })?;
                sections.push(Section::Raw(RawSection {
                    type_code: header.type_code,
                    id: header.id,
                    data: payload.to_vec(),
                }));
            }
            reader.seek(header.end());
        }

        if !reader.is_empty() {
            log::warn!("{} bytes after the last section ignored", reader.remaining());
        }

        objects.link_all()?;
        log::info!(
            "parsed {} sections ({} objects)",
            sections.len(),
            objects.len()
        );

        Ok(Self {
            extended,
            size_adjust,
            sections,
            objects,
        })
    }

    /// Write the model to disk.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        log::info!("writing model {}", path.display());
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Encode the model to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Write the model to a stream.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let count = self.sections.len() as i32;
        if self.extended {
            let declared = (self.encoded_len() as i64 + self.size_adjust).max(0) as u32;
            out.write_i32::<LittleEndian>(EXTENDED_HEADER)?;
            out.write_u32::<LittleEndian>(declared)?;
        }
        out.write_i32::<LittleEndian>(count)?;

        for section in &self.sections {
            match section {
                Section::Object3D(id) => {
                    let object = self.objects.get(*id).ok_or(Error::ObjectNotFound(*id))?;
                    let header = SectionHeader::new(tags::OBJECT3D, *id, object.encoded_len() as u32, 0);
                    out.write_all(header.to_raw().as_bytes())?;
                    object.write_to(out)?;
                }
                Section::Raw(raw) => {
                    let header = SectionHeader::new(raw.type_code, raw.id, raw.data.len() as u32, 0);
                    out.write_all(header.to_raw().as_bytes())?;
                    out.write_all(&raw.data)?;
                }
            }
        }
        Ok(())
    }

    /// Length of the encoded file.
    pub fn encoded_len(&self) -> usize {
        let header = if self.extended { 12 } else { 4 };
        let sections: usize = self
            .sections
            .iter()
            .map(|section| {
                RawSectionHeader::SIZE
                    + match section {
                        Section::Object3D(id) => {
                            self.objects.get(*id).map_or(0, Object3D::encoded_len)
                        }
                        Section::Raw(raw) => raw.data.len(),
                    }
            })
            .sum();
        header + sections
    }

    /// Add a new linked Object3D section at the end of the file.
    ///
    /// The id is one past the highest section id in use. Returns the id.
    pub fn create_object(&mut self, name: HashName, parent: Option<u32>) -> Result<u32> {
        let id = self.next_id();
        self.objects.create(id, name, parent)?;
        self.sections.push(Section::Object3D(id));
        Ok(id)
    }

    fn next_id(&self) -> u32 {
        self.sections
            .iter()
            .map(|section| match section {
                Section::Object3D(id) => *id,
                Section::Raw(raw) => raw.id,
            })
            .max()
            .map_or(1, |id| id + 1)
    }

    /// Register every object's known name with a dictionary.
    pub fn collect_hashes<D: HashDictionary + ?Sized>(&self, dict: &mut D) {
        for object in self.objects.iter() {
            object.collect_hashes(dict);
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Sections that were not decoded.
    pub fn raw_sections(&self) -> impl Iterator<Item = &RawSection> {
        self.sections.iter().filter_map(|section| match section {
            Section::Raw(raw) => Some(raw),
            Section::Object3D(_) => None,
        })
    }

    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut ObjectTable {
        &mut self.objects
    }

    /// Check if the extended header is used.
    pub fn is_extended(&self) -> bool {
        self.extended
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::object3d::tests::{identity_rows, payload};
    use crate::Hashlist;

    const MATERIAL_TAG: u32 = 0x3C54_609C;

    fn section(type_code: u32, id: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = SectionHeader::new(type_code, id, payload.len() as u32, 0)
            .to_raw()
            .as_bytes()
            .to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn model(extended: bool, sections: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = sections.concat();
        let mut out = Vec::new();
        if extended {
            out.extend_from_slice(&(-1i32).to_le_bytes());
            out.extend_from_slice(&((12 + body.len()) as u32).to_le_bytes());
        }
        out.extend_from_slice(&(sections.len() as i32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    fn object(id: u32, parent: u32, translation: [f32; 3], trailing: &[u8]) -> Vec<u8> {
        let mut rows = identity_rows();
        rows[12..15].copy_from_slice(&translation);
        section(
            tags::OBJECT3D,
            id,
            &payload(u64::from(id) << 8, &[], rows, translation, parent, trailing),
        )
    }

    fn sample(extended: bool) -> Vec<u8> {
        model(
            extended,
            &[
                object(2, 1, [5.0, 0.0, 0.0], &[1, 2, 3]),
                section(MATERIAL_TAG, 3, &[9, 9, 9, 9]),
                object(1, 0, [0.0; 3], &[]),
            ],
        )
    }

    #[test]
    fn test_parse_links_objects() {
        let file = ModelFile::parse(&sample(true)).unwrap();

        assert!(file.is_extended());
        assert_eq!(file.sections().len(), 3);
        assert_eq!(file.objects().len(), 2);

        let child = file.objects().get(2).unwrap();
        assert!(child.is_linked());
        assert_eq!(child.parent(), Some(1));
        assert_eq!(child.trailing(), &[1, 2, 3]);
        assert_eq!(child.world_transform().translation(), Vec3::new(5.0, 0.0, 0.0));

        let raw: Vec<_> = file.raw_sections().collect();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].type_code, MATERIAL_TAG);
        assert_eq!(raw[0].data, vec![9, 9, 9, 9]);
    }

    #[test]
    fn test_roundtrip_extended() {
        let data = sample(true);
        let file = ModelFile::parse(&data).unwrap();
        assert_eq!(file.encoded_len(), data.len());
        assert_eq!(file.to_bytes().unwrap(), data);
    }

    #[test]
    fn test_roundtrip_plain_header() {
        let data = sample(false);
        let file = ModelFile::parse(&data).unwrap();
        assert!(!file.is_extended());
        assert_eq!(file.to_bytes().unwrap(), data);
    }

    #[test]
    fn test_declared_size_convention_is_kept() {
        let mut data = sample(true);
        // A producer that counts the file size without the 12-byte header.
        let declared = (data.len() - 12) as u32;
        data[4..8].copy_from_slice(&declared.to_le_bytes());

        let mut file = ModelFile::parse(&data).unwrap();
        file.create_object(HashName::from_hash(1), None).unwrap();
        let out = file.to_bytes().unwrap();

        let written = u32::from_le_bytes([out[4], out[5], out[6], out[7]]) as usize;
        assert_eq!(written, out.len() - 12);
    }

    #[test]
    fn test_dangling_parent_fails_parse() {
        let data = model(false, &[object(1, 99, [0.0; 3], &[])]);
        assert!(matches!(
            ModelFile::parse(&data),
            Err(Error::DanglingParentReference { id: 1, parent: 99 })
        ));
    }

    #[test]
    fn test_truncated_section_fails_parse() {
        let mut data = sample(false);
        data.truncate(data.len() - 10);
        assert!(matches!(
            ModelFile::parse(&data),
            Err(Error::TruncatedRecord { section: 1, .. })
        ));
    }

    #[test]
    fn test_truncated_raw_section() {
        let mut data = model(false, &[section(MATERIAL_TAG, 4, &[0; 16])]);
        data.truncate(data.len() - 1);
        assert!(matches!(
            ModelFile::parse(&data),
            Err(Error::TruncatedRecord { section: 4, needed: 16, available: 15, .. })
        ));
    }

    #[test]
    fn test_undersized_object_does_not_swallow_next_section() {
        let body = payload(1 << 8, &[], identity_rows(), [0.0; 3], 0, &[]);
        let mut short = SectionHeader::new(tags::OBJECT3D, 1, body.len() as u32 - 4, 0)
            .to_raw()
            .as_bytes()
            .to_vec();
        short.extend_from_slice(&body);
        let data = model(false, &[short, section(0x1234, 2, &[5, 6, 7, 8])]);

        assert!(matches!(
            ModelFile::parse(&data),
            Err(Error::TruncatedRecord { section: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_section_count() {
        let data = (-5i32).to_le_bytes();
        assert!(matches!(
            ModelFile::parse(&data),
            Err(Error::InvalidSectionCount(-5))
        ));
    }

    #[test]
    fn test_reparent_then_write() {
        let data = model(
            false,
            &[
                object(1, 0, [0.0; 3], &[]),
                object(2, 0, [0.0; 3], &[]),
                object(3, 1, [0.0; 3], &[]),
            ],
        );
        let mut file = ModelFile::parse(&data).unwrap();
        file.objects_mut().set_parent(3, Some(2)).unwrap();

        let reparsed = ModelFile::parse(&file.to_bytes().unwrap()).unwrap();
        assert_eq!(reparsed.objects().get(3).unwrap().raw_parent_id(), 2);
        assert_eq!(reparsed.objects().children(2).unwrap(), &[3]);
    }

    #[test]
    fn test_create_object_and_reload() {
        let mut dict = Hashlist::new();
        let mut file = ModelFile::parse(&sample(true)).unwrap();

        let name = HashName::from_string("rp_new", &mut dict);
        let id = file.create_object(name, Some(2)).unwrap();
        assert_eq!(id, 4);

        let reparsed = ModelFile::parse(&file.to_bytes().unwrap()).unwrap();
        let created = reparsed.objects().get(id).unwrap();
        assert_eq!(created.parent(), Some(2));
        assert_eq!(created.name().display_string(&dict), "rp_new");
        assert_eq!(created.world_transform().translation(), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_collect_hashes() {
        let mut source = Hashlist::new();
        let mut file = ModelFile::new();
        let root = file
            .create_object(HashName::from_string("rp_root", &mut source), None)
            .unwrap();
        file.create_object(HashName::from_string("a_child", &mut source), Some(root))
            .unwrap();

        let mut dict = Hashlist::new();
        file.collect_hashes(&mut dict);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_open_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.model");
        let output = dir.path().join("out.model");
        fs::write(&input, sample(true)).unwrap();

        let file = ModelFile::open(&input).unwrap();
        file.write(&output).unwrap();
        assert_eq!(fs::read(&output).unwrap(), sample(true));
    }
}
