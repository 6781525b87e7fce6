//! Render object catalog
//!
//! The catalog is a count followed by fixed-width records, one per render
//! object. Each record only stores offsets; nothing here dereferences them.
//!
//! Two layouts exist. They share the record field map and differ in where the
//! count lives and in a 24-byte trailer the extended layout appends to every
//! record. The layout is never guessed from the data.

use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use binrw::BinRead;
use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, trace};

use crate::error::{BsdError, Result};
use crate::section::{BSD_HEADER_SIZE, SectionKind, SectionTable, is_present};

/// Position of the animated light table, relative to the header end
pub const ANIMATED_LIGHTS_POSITION: u64 = 0xD8;

/// Number of slots in the animated light table
pub const ANIMATED_LIGHTS_TABLE_SIZE: usize = 40;

/// Upper bound on the number of render objects in a catalog
pub const MAX_RENDER_OBJECTS: i32 = 1000;

/// Size of the record fields shared by both layouts
const RECORD_BODY_SIZE: u64 = 2124;

/// Catalog layout selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub enum RecordLayout {
    /// Count at `0x1D8`, 2124-byte records
    #[default]
    Standard,
    /// Count at `0x1E8`, 2148-byte records
    Extended,
}

impl RecordLayout {
    /// Position of the object count, relative to the header end
    pub const fn count_position(self) -> u64 {
        match self {
            Self::Standard => 0x1D8,
            Self::Extended => 0x1D8 + 16,
        }
    }

    pub const fn record_size(self) -> u64 {
        match self {
            Self::Standard => RECORD_BODY_SIZE,
            Self::Extended => RECORD_BODY_SIZE + 24,
        }
    }

    const fn trailer_size(self) -> u64 {
        self.record_size() - RECORD_BODY_SIZE
    }
}

impl fmt::Display for RecordLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Extended => write!(f, "extended"),
        }
    }
}

/// One catalog entry.
///
/// Offsets are relative to the end of the fixed header. `0` and `-1` both mean
/// the resource is absent.
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct RenderObjectRecord {
    pub id: u32,
    pub unknown_offset0: i32,
    pub animation_data_offset: i32,
    pub tsp_offset: i32,
    pub referenced_id: i32,
    pub kind: i32,
    pub face_table_offset: i32,
    pub vertex_table_index_offset: i32,
    pub flat_textured_face_offset: i32,
    pub secondary_textured_face_offset: i32,
    pub hierarchy_offset: i32,
    pub secondary_untextured_face_offset: i32,
    pub primary_textured_face_offset: i32,
    pub primary_untextured_face_offset: i32,
    pub color_offset: i32,
    #[br(pad_before = 64)]
    pub vertex_offset: i32,
    pub vertex_count: u16,
    /// Fixed-point scale, one unit per `16 * 4096`
    #[br(pad_before = 30)]
    pub scale: [i32; 3],
    #[br(pad_before = 1820, map = |raw: [u8; 132]| file_name_from_bytes(&raw))]
    pub file_name: String,
}

impl RenderObjectRecord {
    /// The designated world object carries level geometry instead of a model
    pub fn is_world(&self) -> bool {
        self.id == 0
    }

    pub fn is_animated(&self) -> bool {
        is_present(self.animation_data_offset)
    }

    /// Scale in model units; integer division by 16 happens first
    pub fn scale_factors(&self) -> [f32; 3] {
        self.scale.map(|v| (v / 16) as f32 / 4096.0)
    }

    /// Id of the object this one reuses geometry from, if any
    pub fn reference(&self) -> Option<i32> {
        (self.referenced_id != -1).then_some(self.referenced_id)
    }
}

fn file_name_from_bytes(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Animated light table summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct AnimatedLights {
    pub count: i32,
    /// Colour count of every table slot; empty when `count` is zero
    pub color_counts: Vec<i32>,
}

impl AnimatedLights {
    /// Entry stride: colour count followed by 16 reserved bytes
    const ENTRY_SIZE: u64 = 20;

    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        reader.seek(SeekFrom::Start(ANIMATED_LIGHTS_POSITION + BSD_HEADER_SIZE))?;
        let count = reader.read_i32::<LittleEndian>()?;
        let mut color_counts = Vec::new();
        if count != 0 {
            let table = reader.stream_position()?;
            for i in 0..ANIMATED_LIGHTS_TABLE_SIZE as u64 {
                reader.seek(SeekFrom::Start(table + i * Self::ENTRY_SIZE))?;
                color_counts.push(reader.read_i32::<LittleEndian>()?);
            }
        }
        Ok(Self {
            count,
            color_counts,
        })
    }

    /// Size in bytes of the colour section stored before the node table
    pub fn color_section_size(&self) -> i64 {
        self.color_counts.iter().map(|&n| i64::from(n) * 4).sum()
    }
}

/// Decoded catalog: section table, light summary and render object records
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct Catalog {
    pub layout: RecordLayout,
    pub sections: SectionTable,
    pub lights: AnimatedLights,
    pub records: Vec<RenderObjectRecord>,
}

impl Catalog {
    pub fn read<R: Read + Seek>(reader: &mut R, layout: RecordLayout) -> Result<Self> {
        let sections = SectionTable::read_from(reader)?;
        let lights = AnimatedLights::read(reader)?;
        debug!(
            "{} animated lights, colour section {} bytes",
            lights.count,
            lights.color_section_size()
        );

        reader.seek(SeekFrom::Start(layout.count_position() + BSD_HEADER_SIZE))?;
        let count = reader.read_i32::<LittleEndian>()?;
        if !(1..=MAX_RENDER_OBJECTS).contains(&count) {
            return Err(BsdError::InvalidCount {
                field: "render object count",
                value: i64::from(count),
            });
        }
        let first_record = reader.stream_position()?;

        let region_end = i64::from(sections.entry(SectionKind::NodeTable).offset)
            + BSD_HEADER_SIZE as i64
            - lights.color_section_size();
        let implied = (region_end - first_record as i64) / i64::from(count);
        if implied != layout.record_size() as i64 {
            return Err(BsdError::RecordSizeMismatch {
                field: "render object catalog",
                expected: layout.record_size(),
                actual: implied,
            });
        }
        debug!(
            "{} render objects ({} layout) at {}",
            count, layout, first_record
        );

        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let start = reader.stream_position()?;
            let record = RenderObjectRecord::read(reader)?;
            reader.seek(SeekFrom::Current(layout.trailer_size() as i64))?;
            let consumed = reader.stream_position()? - start;
            if consumed != layout.record_size() {
                return Err(BsdError::RecordSizeMismatch {
                    field: "render object record",
                    expected: layout.record_size(),
                    actual: consumed as i64,
                });
            }
            trace!(
                "Render object {} '{}' kind {} (tsp {}, animation {})",
                record.id,
                record.file_name,
                record.kind,
                record.tsp_offset,
                record.animation_data_offset
            );
            records.push(record);
        }

        Ok(Self {
            layout,
            sections,
            lights,
            records,
        })
    }

    pub fn find(&self, id: u32) -> Option<&RenderObjectRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
