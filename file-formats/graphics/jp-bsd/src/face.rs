//! Static face packets
//!
//! Static geometry is stored as GPU primitive packets. Five independent blocks
//! may be present per render object, each an `i32` count followed by packets
//! that are each trailed by a packed word of three vertex indices.

use std::io::{Read, Seek, SeekFrom};

use binrw::BinRead;
use byteorder::{LittleEndian, ReadBytesExt};
use log::trace;

use crate::catalog::RenderObjectRecord;
use crate::error::{BsdError, Result};
use crate::section::resolve_absolute;
use crate::types::{BsdColor, BsdUv, TexInfo};

/// Gouraud-shaded textured triangle packet (40 bytes)
#[derive(Debug, Clone, Copy, BinRead)]
#[br(little)]
struct Gt3Packet {
    _tag: u32,
    rgb0: BsdColor,
    _xy0: [i16; 2],
    uv0: BsdUv,
    cba: u16,
    rgb1: BsdColor,
    _xy1: [i16; 2],
    uv1: BsdUv,
    tex_info: u16,
    rgb2: BsdColor,
    _xy2: [i16; 2],
    uv2: BsdUv,
    _pad: u16,
}

/// Gouraud-shaded untextured triangle packet (28 bytes)
#[derive(Debug, Clone, Copy, BinRead)]
#[br(little)]
struct G3Packet {
    _tag: u32,
    rgb0: BsdColor,
    _xy0: [i16; 2],
    rgb1: BsdColor,
    _xy1: [i16; 2],
    rgb2: BsdColor,
    _xy2: [i16; 2],
}

/// Flat-shaded textured triangle packet (32 bytes)
#[derive(Debug, Clone, Copy, BinRead)]
#[br(little)]
struct Ft3Packet {
    _tag: u32,
    rgb0: BsdColor,
    _xy0: [i16; 2],
    uv0: BsdUv,
    cba: u16,
    _xy1: [i16; 2],
    uv1: BsdUv,
    tex_info: u16,
    _xy2: [i16; 2],
    uv2: BsdUv,
    _pad: u16,
}

/// Packet layout of a face block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub enum PacketKind {
    Gt3,
    G3,
    Ft3,
}

impl PacketKind {
    pub const fn size(self) -> u64 {
        match self {
            Self::Gt3 => 40,
            Self::G3 => 28,
            Self::Ft3 => 32,
        }
    }
}

/// Which face array a block appends to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub enum FaceCategory {
    Textured,
    Untextured,
}

/// The five face blocks a render object record can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub enum FaceStage {
    PrimaryTextured,
    SecondaryTextured,
    FlatTextured,
    PrimaryUntextured,
    SecondaryUntextured,
}

impl FaceStage {
    pub const ALL: [Self; 5] = [
        Self::PrimaryTextured,
        Self::SecondaryTextured,
        Self::FlatTextured,
        Self::PrimaryUntextured,
        Self::SecondaryUntextured,
    ];

    pub const fn packet(self) -> PacketKind {
        match self {
            Self::PrimaryTextured | Self::SecondaryTextured => PacketKind::Gt3,
            Self::FlatTextured => PacketKind::Ft3,
            Self::PrimaryUntextured | Self::SecondaryUntextured => PacketKind::G3,
        }
    }

    pub const fn category(self) -> FaceCategory {
        match self.packet() {
            PacketKind::Gt3 | PacketKind::Ft3 => FaceCategory::Textured,
            PacketKind::G3 => FaceCategory::Untextured,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::PrimaryTextured => "primary textured faces",
            Self::SecondaryTextured => "secondary textured faces",
            Self::FlatTextured => "flat textured faces",
            Self::PrimaryUntextured => "primary untextured faces",
            Self::SecondaryUntextured => "secondary untextured faces",
        }
    }

    /// The record's offset for this block
    pub fn offset(self, record: &RenderObjectRecord) -> i32 {
        match self {
            Self::PrimaryTextured => record.primary_textured_face_offset,
            Self::SecondaryTextured => record.secondary_textured_face_offset,
            Self::FlatTextured => record.flat_textured_face_offset,
            Self::PrimaryUntextured => record.primary_untextured_face_offset,
            Self::SecondaryUntextured => record.secondary_untextured_face_offset,
        }
    }
}

/// A decoded static triangle.
///
/// Colours are already remapped to `0..=255`. Untextured faces leave the UVs,
/// texture info and CBA zeroed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct BsdFace {
    pub uv: [BsdUv; 3],
    pub colors: [BsdColor; 3],
    pub tex_info: TexInfo,
    pub cba: u16,
    pub vertices: [u32; 3],
}

/// Split a packed vertex word into three indices
pub fn unpack_vertex_indices(packed: u32) -> [u32; 3] {
    [
        packed & 0xFF,
        (packed & 0x3FC00) >> 10,
        (packed & 0xFF0_0000) >> 20,
    ]
}

impl BsdFace {
    fn from_gt3(p: &Gt3Packet) -> Self {
        Self {
            uv: [p.uv0, p.uv1, p.uv2],
            colors: [p.rgb0.remapped(), p.rgb1.remapped(), p.rgb2.remapped()],
            tex_info: TexInfo::from_bits_retain(p.tex_info),
            cba: p.cba,
            vertices: [0; 3],
        }
    }

    fn from_g3(p: &G3Packet) -> Self {
        Self {
            colors: [p.rgb0.remapped(), p.rgb1.remapped(), p.rgb2.remapped()],
            ..Self::default()
        }
    }

    fn from_ft3(p: &Ft3Packet) -> Self {
        let color = p.rgb0.remapped();
        Self {
            uv: [p.uv0, p.uv1, p.uv2],
            colors: [color; 3],
            tex_info: TexInfo::from_bits_retain(p.tex_info),
            cba: p.cba,
            vertices: [0; 3],
        }
    }
}

/// Read one face block at the header-relative `offset`
pub fn read_face_block<R: Read + Seek>(
    reader: &mut R,
    stage: FaceStage,
    offset: i32,
) -> Result<Vec<BsdFace>> {
    reader.seek(SeekFrom::Start(resolve_absolute(offset, stage.name())?))?;
    let count = reader.read_i32::<LittleEndian>()?;
    if count < 0 {
        return Err(BsdError::InvalidCount {
            field: stage.name(),
            value: i64::from(count),
        });
    }
    trace!("Reading {} {} at {}", count, stage.name(), offset);

    let mut faces = Vec::with_capacity((count as usize).min(4096));
    for _ in 0..count {
        let mut face = match stage.packet() {
            PacketKind::Gt3 => BsdFace::from_gt3(&Gt3Packet::read(reader)?),
            PacketKind::G3 => BsdFace::from_g3(&G3Packet::read(reader)?),
            PacketKind::Ft3 => BsdFace::from_ft3(&Ft3Packet::read(reader)?),
        };
        face.vertices = unpack_vertex_indices(reader.read_u32::<LittleEndian>()?);
        faces.push(face);
    }
    Ok(faces)
}
