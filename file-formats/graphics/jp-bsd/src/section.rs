//! Section table and offset resolution
//!
//! Every position in a scene descriptor is stored relative to something: the
//! end of the fixed 2048-byte header for catalog-level offsets, or the base of
//! one of ten named sections for animation data. The section table sits at a
//! fixed position and lists those bases.

use std::io::{Read, Seek, SeekFrom};

use binrw::BinRead;
use log::debug;

use crate::error::{BsdError, Result};

/// Size of the fixed header every offset is relative to
pub const BSD_HEADER_SIZE: u64 = 2048;

/// Position of the section table, relative to the header end
pub const SECTION_TABLE_POSITION: u64 = 0x53C;

/// Size of the section table in bytes
pub const SECTION_TABLE_SIZE: u64 = 80;

/// A `(base offset, count)` pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct SectionEntry {
    pub offset: i32,
    /// Element count; for the node table this word is an auxiliary offset
    pub count: i32,
}

/// Named sections in table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    NodeTable,
    AnimationTable,
    AnimationData,
    QuaternionData,
    HierarchyData,
    FaceTable,
    FaceData,
    VertexTableIndex,
    VertexTable,
    VertexData,
}

impl SectionKind {
    pub const ALL: [Self; 10] = [
        Self::NodeTable,
        Self::AnimationTable,
        Self::AnimationData,
        Self::QuaternionData,
        Self::HierarchyData,
        Self::FaceTable,
        Self::FaceData,
        Self::VertexTableIndex,
        Self::VertexTable,
        Self::VertexData,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::NodeTable => "node table",
            Self::AnimationTable => "animation table",
            Self::AnimationData => "animation data",
            Self::QuaternionData => "quaternion data",
            Self::HierarchyData => "hierarchy data",
            Self::FaceTable => "animated face table",
            Self::FaceData => "animated face data",
            Self::VertexTableIndex => "vertex table index",
            Self::VertexTable => "vertex table",
            Self::VertexData => "vertex data",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// The ten section bases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct SectionTable {
    pub entries: [SectionEntry; 10],
}

impl SectionTable {
    /// Read the section table from its fixed position
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        reader.seek(SeekFrom::Start(SECTION_TABLE_POSITION + BSD_HEADER_SIZE))?;
        let table = Self::read(reader)?;
        for kind in SectionKind::ALL {
            let entry = table.entry(kind);
            debug!(
                "Section {} at {} ({}) holds {}",
                kind.name(),
                entry.offset,
                i64::from(entry.offset) + BSD_HEADER_SIZE as i64,
                entry.count
            );
        }
        Ok(table)
    }

    pub fn entry(&self, kind: SectionKind) -> SectionEntry {
        self.entries[kind.index()]
    }

    /// Absolute file position of `relative` inside the `kind` section
    pub fn resolve(&self, kind: SectionKind, relative: i32) -> Result<u64> {
        let position =
            i64::from(relative) + i64::from(self.entry(kind).offset) + BSD_HEADER_SIZE as i64;
        u64::try_from(position).map_err(|_| BsdError::InvalidOffset {
            field: kind.name(),
            value: i64::from(relative),
        })
    }
}

/// Absolute file position of a header-relative offset
pub fn resolve_absolute(offset: i32, field: &'static str) -> Result<u64> {
    u64::try_from(offset)
        .map(|o| o + BSD_HEADER_SIZE)
        .map_err(|_| BsdError::InvalidOffset {
            field,
            value: i64::from(offset),
        })
}

/// Header-relative offsets use both `0` and `-1` to mean "absent"
pub fn is_present(offset: i32) -> bool {
    offset != 0 && offset != -1
}

/// Section-relative offsets may legitimately be `0`; only `-1` means "absent"
pub fn is_linked(offset: i32) -> bool {
    offset != -1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_section_table_order_and_resolve() {
        let mut data = vec![0u8; (BSD_HEADER_SIZE + SECTION_TABLE_POSITION) as usize];
        for i in 0..10i32 {
            data.extend_from_slice(&(i * 100).to_le_bytes());
            data.extend_from_slice(&(i + 1).to_le_bytes());
        }
        let table = SectionTable::read_from(&mut Cursor::new(&data)).unwrap();

        assert_eq!(table.entry(SectionKind::NodeTable).offset, 0);
        assert_eq!(table.entry(SectionKind::QuaternionData).offset, 300);
        assert_eq!(table.entry(SectionKind::VertexData).count, 10);
        assert_eq!(table.resolve(SectionKind::HierarchyData, 20).unwrap(), 420 + 2048);
    }

    #[test]
    fn test_resolve_rejects_negative_position() {
        let table = SectionTable::default();
        assert!(matches!(
            table.resolve(SectionKind::FaceData, -4096),
            Err(BsdError::InvalidOffset { .. })
        ));
    }

    #[test]
    fn test_presence_rules() {
        assert!(!is_present(0));
        assert!(!is_present(-1));
        assert!(is_present(64));
        assert!(is_linked(0));
        assert!(!is_linked(-1));
    }
}
