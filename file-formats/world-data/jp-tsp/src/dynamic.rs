//! Dynamic faces
//!
//! A dynamic block lists faces whose texture coordinates cycle through a table
//! of alternate records. The table holds `table_size` rows of one record per
//! listed face; which row is active is tracked by a stride that the renderer
//! advances on its own schedule. Advancing never touches geometry.

use std::io::{Read, Seek, SeekFrom};

use binrw::BinRead;
use log::{debug, trace};

use crate::error::{Result, TspError};
use crate::header::{TspHeader, TspSectionKind};
use crate::types::Uv;

/// Size of a dynamic block header in bytes
pub const DYNAMIC_BLOCK_HEADER_SIZE: u64 = 14;

/// How a dynamic block's stride moves through its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub enum DynamicFaceEffect {
    /// Advance by the increment and hold on the last row
    PlayAndStopAtLast,
    /// Jump ahead by 23 rows, wrapping around
    JumpToLast,
    /// Advance by one, wrapping to the first row
    Cycle,
    /// Bounce between the first and last rows
    Pulse,
}

impl DynamicFaceEffect {
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::PlayAndStopAtLast),
            1 => Some(Self::JumpToLast),
            2 => Some(Self::Cycle),
            3 => Some(Self::Pulse),
            _ => None,
        }
    }
}

/// Position of a block inside its table together with the direction of travel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct StrideState {
    pub stride: i32,
    pub increment: i32,
}

impl Default for StrideState {
    fn default() -> Self {
        Self {
            stride: 0,
            increment: 1,
        }
    }
}

/// Advance a stride by one tick.
///
/// Pure: the same inputs always produce the same state. A table size of zero
/// or less leaves the state unchanged.
pub fn advance_stride(effect: DynamicFaceEffect, state: StrideState, table_size: i32) -> StrideState {
    if table_size <= 0 {
        return state;
    }
    let StrideState {
        mut stride,
        mut increment,
    } = state;

    match effect {
        DynamicFaceEffect::PlayAndStopAtLast => {
            stride += increment;
            if stride >= table_size {
                stride = table_size - 1;
                increment = 0;
            }
        }
        DynamicFaceEffect::JumpToLast => {
            stride = (stride + 23) % table_size;
        }
        DynamicFaceEffect::Cycle => {
            stride += 1;
            if stride >= table_size {
                stride = 0;
            }
        }
        DynamicFaceEffect::Pulse => {
            stride += increment;
            // Bounce targets stay inside the table for single-row blocks
            if stride < 0 {
                stride = 1.min(table_size - 1);
                increment = 1;
            } else if stride >= table_size {
                stride = (table_size - 2).max(0);
                increment = -1;
            }
        }
    }

    StrideState { stride, increment }
}

#[derive(Debug, Clone, Copy, BinRead)]
#[br(little)]
struct DynamicBlockHeader {
    size: i16,
    unk0: u8,
    effect: u8,
    dynamic_data_index: i16,
    table_size: i16,
    num_faces: i16,
    face_index_offset: i16,
    face_data_offset: i16,
}

/// Alternate texture record for one face (10 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct DynamicFaceData {
    pub uv0: Uv,
    pub cba: u16,
    pub uv1: Uv,
    pub tsb: u16,
    pub uv2: Uv,
}

/// A block of faces sharing one texture animation
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct DynamicFaceBlock {
    pub unk0: u8,
    pub effect: DynamicFaceEffect,
    /// Identifier used by level scripts to trigger this block
    pub dynamic_data_index: i16,
    /// Number of rows in the alternate texture table
    pub table_size: i16,
    pub face_indices: Vec<i16>,
    /// `table_size` rows of `face_indices.len()` records each
    pub face_data: Vec<DynamicFaceData>,
}

impl DynamicFaceBlock {
    /// Advance a stride using this block's effect and table size
    pub fn advance(&self, state: StrideState) -> StrideState {
        advance_stride(self.effect, state, i32::from(self.table_size))
    }

    /// Texture records of the row selected by `stride`, one per listed face
    pub fn row(&self, stride: i32) -> Option<&[DynamicFaceData]> {
        let width = self.face_indices.len();
        let start = usize::try_from(stride).ok()?.checked_mul(width)?;
        self.face_data.get(start..start + width)
    }

    /// Whether a face index belongs to this block
    pub fn contains_face(&self, face: usize) -> bool {
        self.face_indices.iter().any(|&i| usize::try_from(i).ok() == Some(face))
    }
}

/// Read all dynamic blocks described by the header
pub fn read_dynamic_blocks<R: Read + Seek>(
    reader: &mut R,
    header: &TspHeader,
    base: u64,
) -> Result<Vec<DynamicFaceBlock>> {
    let count = header.count(TspSectionKind::DynamicBlocks)?;
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut position = header.resolve(base, TspSectionKind::DynamicBlocks)?;
    debug!("Reading {} dynamic blocks at {}", count, position);

    let mut blocks = Vec::with_capacity(count);
    for index in 0..count {
        reader.seek(SeekFrom::Start(position))?;
        let raw = DynamicBlockHeader::read(reader)?;
        trace!("Dynamic block {}: {:?}", index, raw);

        let effect = DynamicFaceEffect::from_raw(raw.effect).ok_or(TspError::InvalidEffect(raw.effect))?;
        let size = non_negative(raw.size, "dynamic block size")?;
        if (size as u64) < DYNAMIC_BLOCK_HEADER_SIZE {
            return Err(TspError::InvalidCount {
                field: "dynamic block size",
                value: raw.size as i64,
            });
        }
        let num_faces = non_negative(raw.num_faces, "dynamic block faces")?;
        let table_size = non_negative(raw.table_size, "dynamic block table size")?;

        reader.seek(SeekFrom::Start(
            position + non_negative(raw.face_index_offset, "face index offset")? as u64,
        ))?;
        let mut face_indices = Vec::with_capacity(num_faces);
        for _ in 0..num_faces {
            face_indices.push(i16::read_le(reader)?);
        }

        reader.seek(SeekFrom::Start(
            position + non_negative(raw.face_data_offset, "face data offset")? as u64,
        ))?;
        let rows = num_faces * table_size;
        let mut face_data = Vec::with_capacity(rows.min(4096));
        for _ in 0..rows {
            face_data.push(DynamicFaceData::read(reader)?);
        }

        blocks.push(DynamicFaceBlock {
            unk0: raw.unk0,
            effect,
            dynamic_data_index: raw.dynamic_data_index,
            table_size: raw.table_size,
            face_indices,
            face_data,
        });
        position += size as u64;
    }
    Ok(blocks)
}

fn non_negative(value: i16, field: &'static str) -> Result<usize> {
    usize::try_from(value).map_err(|_| TspError::InvalidCount {
        field,
        value: value as i64,
    })
}
