//! Per-bone vertex tables and animated faces
//!
//! Animated models do not use the static vertex pool. Every bone owns a vertex
//! table, and animated faces address their corners as `(table, vertex)` pairs.

use std::io::{Read, Seek, SeekFrom};

use binrw::BinRead;
use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, trace};

use crate::error::{BsdError, Result};
use crate::section::{SectionKind, SectionTable};
use crate::types::{BsdColor, BsdUv, BsdVertex, TexInfo, clut_position};

/// A bone's vertex pool.
///
/// `rest` never changes after load. `current` holds the posed positions and is
/// overwritten in full every time a pose is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct VertexTable {
    /// Offset into the vertex data section, `-1` for an empty table
    pub offset: i32,
    pub rest: Vec<BsdVertex>,
    pub current: Vec<BsdVertex>,
}

impl VertexTable {
    pub fn len(&self) -> usize {
        self.rest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    /// Copy the rest positions over the current ones
    pub fn reset(&mut self) {
        self.current.clone_from(&self.rest);
    }
}

/// Read all vertex tables of an animated object
pub fn read_vertex_tables<R: Read + Seek>(
    reader: &mut R,
    sections: &SectionTable,
    index_offset: i32,
) -> Result<Vec<VertexTable>> {
    reader.seek(SeekFrom::Start(
        sections.resolve(SectionKind::VertexTableIndex, index_offset)?,
    ))?;
    let table_offset = reader.read_i32::<LittleEndian>()?;
    let table_count = reader.read_i32::<LittleEndian>()?;
    if table_count < 0 {
        return Err(BsdError::InvalidCount {
            field: "vertex table count",
            value: i64::from(table_count),
        });
    }
    debug!("{} vertex tables at {}", table_count, table_offset);

    reader.seek(SeekFrom::Start(
        sections.resolve(SectionKind::VertexTable, table_offset)?,
    ))?;
    let mut headers = Vec::with_capacity((table_count as usize).min(256));
    for _ in 0..table_count {
        let offset = reader.read_i32::<LittleEndian>()?;
        let count = reader.read_i32::<LittleEndian>()?;
        headers.push((offset, count));
    }

    let mut tables = Vec::with_capacity(headers.len());
    for (i, (offset, count)) in headers.into_iter().enumerate() {
        if offset == -1 {
            tables.push(VertexTable {
                offset,
                ..VertexTable::default()
            });
            continue;
        }
        if count < 0 {
            return Err(BsdError::InvalidCount {
                field: "vertex table size",
                value: i64::from(count),
            });
        }
        reader.seek(SeekFrom::Start(
            sections.resolve(SectionKind::VertexData, offset)?,
        ))?;
        let mut rest = Vec::with_capacity((count as usize).min(4096));
        for _ in 0..count {
            rest.push(BsdVertex::read(reader)?);
        }
        trace!("Vertex table {} holds {} vertices", i, rest.len());
        tables.push(VertexTable {
            offset,
            current: rest.clone(),
            rest,
        });
    }
    Ok(tables)
}

/// One corner of an animated face
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct VertexRef {
    /// Vertex index inside the table
    pub data_index: u8,
    /// Table index; only the low five bits are meaningful
    #[br(map = |raw: u8| raw & 0x1F)]
    pub table_index: u8,
}

/// Animated face record (28 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct AnimatedFace {
    pub colors: [BsdColor; 3],
    pub uv0: BsdUv,
    pub clut: i16,
    pub uv1: BsdUv,
    #[br(map = |raw: i16| TexInfo::from_bits_retain(raw as u16))]
    pub tex_info: TexInfo,
    pub uv2: BsdUv,
    pub corners: [VertexRef; 3],
}

impl AnimatedFace {
    pub fn uvs(&self) -> [BsdUv; 3] {
        [self.uv0, self.uv1, self.uv2]
    }

    /// Palette position in VRAM
    pub fn clut_position(&self) -> (u16, u16) {
        clut_position(self.clut as u16)
    }

    /// Current posed position of each corner, if every reference resolves
    pub fn positions(&self, tables: &[VertexTable]) -> Option<[BsdVertex; 3]> {
        let mut out = [BsdVertex::default(); 3];
        for (slot, corner) in out.iter_mut().zip(self.corners) {
            *slot = *tables
                .get(usize::from(corner.table_index))?
                .current
                .get(usize::from(corner.data_index))?;
        }
        Some(out)
    }
}

/// Read the animated faces of an object.
///
/// Every corner's table index must name one of the `table_count` loaded tables.
pub fn read_animated_faces<R: Read + Seek>(
    reader: &mut R,
    sections: &SectionTable,
    face_table_offset: i32,
    table_count: usize,
) -> Result<Vec<AnimatedFace>> {
    reader.seek(SeekFrom::Start(
        sections.resolve(SectionKind::FaceTable, face_table_offset)?,
    ))?;
    let data_offset = reader.read_i32::<LittleEndian>()?;
    let count = reader.read_i32::<LittleEndian>()?;
    if count < 0 {
        return Err(BsdError::InvalidCount {
            field: "animated face count",
            value: i64::from(count),
        });
    }
    debug!("{} animated faces at {}", count, data_offset);

    reader.seek(SeekFrom::Start(
        sections.resolve(SectionKind::FaceData, data_offset)?,
    ))?;
    let mut faces = Vec::with_capacity((count as usize).min(4096));
    for _ in 0..count {
        let face = AnimatedFace::read(reader)?;
        for corner in face.corners {
            if usize::from(corner.table_index) >= table_count {
                return Err(BsdError::InvalidReference {
                    field: "animated face vertex table",
                    value: i64::from(corner.table_index),
                    max: table_count,
                });
            }
        }
        faces.push(face);
    }
    Ok(faces)
}
