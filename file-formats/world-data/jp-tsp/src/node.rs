//! Spatial node tree and tagged face primitives
//!
//! Nodes are stored back to back in the node section. A node with a non-zero
//! face count is a leaf; its faces live in the face section at
//! `base_data + face section`, encoded as a stream of tagged primitives. Inner
//! nodes reference up to three children by index, which may point forward, so
//! children are linked in a second pass once every node is read.

use std::io::{Read, Seek, SeekFrom};

use binrw::BinRead;
use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, trace};

use crate::error::{Result, TspError};
use crate::header::{TspHeader, TspSectionKind, resolve_offset};
use crate::types::{BoundingBox, Uv};

/// Size of a full face record in bytes
pub const TSP_FACE_RECORD_SIZE: u64 = 16;

/// Size of a node record in bytes
pub const TSP_NODE_RECORD_SIZE: u64 = 36;

bitflags! {
    /// Flag bits carried by a face's TSB word
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TsbFlags: u16 {
        /// Semi-transparency is enabled for the face
        const TRANSPARENT = 0x4000;
    }
}

/// A face record: three vertex indices plus texture descriptors (16 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct TspFace {
    pub v0: u16,
    pub v1: u16,
    pub v2: u16,
    pub uv0: Uv,
    pub cba: u16,
    pub uv1: Uv,
    pub tsb: u16,
    pub uv2: Uv,
}

impl TspFace {
    pub fn flags(&self) -> TsbFlags {
        TsbFlags::from_bits_truncate(self.tsb)
    }

    pub fn is_transparent(&self) -> bool {
        self.flags().contains(TsbFlags::TRANSPARENT)
    }

    /// VRAM texture page
    pub fn texture_page(&self) -> u16 {
        self.tsb & 0x1F
    }

    /// Colour mode (4-bit, 8-bit or direct)
    pub fn color_mode(&self) -> u16 {
        (self.tsb >> 7) & 0x3
    }

    /// Palette position in VRAM as `(x, y)`
    pub fn clut_position(&self) -> (u16, u16) {
        ((self.cba << 4) & 0x3F0, (self.cba >> 6) & 0x1FF)
    }

    pub fn indices(&self) -> [u16; 3] {
        [self.v0, self.v1, self.v2]
    }
}

/// Primitive encoding selected by a 16-bit tag.
///
/// Tags 0..=7: bit 0 selects a quad, bit 1 gouraud shading, and tags from 4
/// upward are untextured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct Primitive {
    pub quad: bool,
    pub gouraud: bool,
    pub textured: bool,
}

impl Primitive {
    pub fn from_tag(tag: u16) -> Option<Self> {
        if tag > 7 {
            return None;
        }
        Some(Self {
            quad: tag & 1 != 0,
            gouraud: tag & 2 != 0,
            textured: tag < 4,
        })
    }
}

/// A face read from a leaf's primitive stream.
///
/// Triangle primitives only carry indices, so their texture fields are zero.
/// Quads keep the first of their two triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct TspLeafFace {
    pub primitive: Primitive,
    pub face: TspFace,
}

#[derive(Debug, Clone, Copy, BinRead)]
#[br(little)]
struct TspNodeRecord {
    bbox: BoundingBox,
    child_indices: [i32; 3],
    base_data: i32,
    num_faces: i16,
    kind: i16,
    reserved: i32,
}

/// A node of the spatial partition tree
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct TspNode {
    pub bbox: BoundingBox,
    /// Raw child indices as stored (-1 means no child)
    pub child_indices: [i32; 3],
    /// Offset of the leaf primitive stream relative to the face section
    pub base_data: i32,
    pub num_faces: i16,
    pub kind: i16,
    pub reserved: i32,
    /// Leaf faces, empty for inner nodes
    pub faces: Vec<TspLeafFace>,
    /// Children resolved to node indices after all nodes are read
    pub children: [Option<usize>; 3],
}

impl TspNode {
    pub fn is_leaf(&self) -> bool {
        self.num_faces != 0
    }

    pub fn transparent_face_count(&self) -> usize {
        self.faces.iter().filter(|f| f.face.is_transparent()).count()
    }
}

/// Read every node, its leaf faces, and link children.
pub fn read_nodes<R: Read + Seek>(
    reader: &mut R,
    header: &TspHeader,
    base: u64,
) -> Result<Vec<TspNode>> {
    let count = header.count(TspSectionKind::Nodes)?;
    let node_start = header.resolve(base, TspSectionKind::Nodes)?;
    let face_start = header.resolve(base, TspSectionKind::Faces)?;

    debug!("Reading {} nodes at {}", count, node_start);
    reader.seek(SeekFrom::Start(node_start))?;

    let mut nodes = Vec::with_capacity(count.min(4096));
    for index in 0..count {
        let record = TspNodeRecord::read(reader)?;
        trace!(
            "Node {}: children {:?} base data {} faces {}",
            index, record.child_indices, record.base_data, record.num_faces
        );

        let mut faces = Vec::new();
        if record.num_faces != 0 {
            let num_faces =
                usize::try_from(record.num_faces).map_err(|_| TspError::InvalidCount {
                    field: "node faces",
                    value: record.num_faces as i64,
                })?;
            let resume = reader.stream_position()?;
            let stream = resolve_offset(face_start, record.base_data, "node base data")?;
            reader.seek(SeekFrom::Start(stream))?;
            faces = read_primitives(reader, index, num_faces)?;
            reader.seek(SeekFrom::Start(resume))?;
        }

        nodes.push(TspNode {
            bbox: record.bbox,
            child_indices: record.child_indices,
            base_data: record.base_data,
            num_faces: record.num_faces,
            kind: record.kind,
            reserved: record.reserved,
            faces,
            children: [None; 3],
        });
    }

    link_children(&mut nodes)?;
    Ok(nodes)
}

/// Decode `count` tagged primitives from the current position
fn read_primitives<R: Read + Seek>(
    reader: &mut R,
    node: usize,
    count: usize,
) -> Result<Vec<TspLeafFace>> {
    let mut faces = Vec::with_capacity(count);
    while faces.len() < count {
        let tag = reader.read_u16::<LittleEndian>()?;
        let primitive = Primitive::from_tag(tag).ok_or(TspError::UnknownPrimitive { node, tag })?;

        let face = if primitive.quad {
            let face = TspFace::read(reader)?;
            // Second triangle of the quad is not kept
            let _pad = reader.read_u16::<LittleEndian>()?;
            face
        } else {
            TspFace {
                v0: reader.read_u16::<LittleEndian>()?,
                v1: reader.read_u16::<LittleEndian>()?,
                v2: reader.read_u16::<LittleEndian>()?,
                ..TspFace::default()
            }
        };
        faces.push(TspLeafFace { primitive, face });
    }
    Ok(faces)
}

/// Second pass: turn stored child indices into node references
fn link_children(nodes: &mut [TspNode]) -> Result<()> {
    let len = nodes.len();
    for node in nodes.iter_mut().filter(|n| !n.is_leaf()) {
        for (slot, &index) in node.child_indices.iter().enumerate() {
            node.children[slot] = match index {
                -1 => None,
                i if i >= 0 && (i as usize) < len => Some(i as usize),
                i => {
                    return Err(TspError::InvalidReference {
                        field: "node child",
                        value: i as i64,
                        max: len,
                    });
                }
            };
        }
    }
    Ok(())
}
