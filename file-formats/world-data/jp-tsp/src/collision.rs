//! Collision sub-mesh
//!
//! The collision data is independent from the render geometry: it carries its
//! own vertices, normals and faces plus a 2D KD-tree over the X/Z footprint.
//! KD leaves reference a run of the shared face-index list.

use std::io::{Read, Seek, SeekFrom};

use binrw::BinRead;
use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, trace};

use crate::error::{Result, TspError};
use crate::types::TspVertex;

/// Collision header (18 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct CollisionHeader {
    pub min_x: i16,
    pub min_z: i16,
    pub max_x: i16,
    pub max_z: i16,
    pub num_kd_nodes: u16,
    pub num_face_indices: u16,
    pub num_vertices: u16,
    pub num_normals: u16,
    pub num_faces: u16,
}

/// KD-tree node.
///
/// A negative `child0` marks a leaf whose face run starts at `child1` and
/// spans `!child0` entries. Otherwise a negative `child1` selects a Z split
/// (the far child is `!child1`), a non-negative one an X split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct KdNode {
    pub child0: i16,
    pub child1: i16,
    pub split: i16,
    pub property_set_file_index: i16,
}

impl KdNode {
    pub fn is_leaf(&self) -> bool {
        self.child0 < 0
    }

    /// Face run of a leaf as `(start, length)`; the length is the one's
    /// complement of `child0`.
    pub fn face_run(&self) -> Option<(i16, i16)> {
        self.is_leaf().then_some((self.child1, !self.child0))
    }
}

/// Collision triangle (10 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct CollisionFace {
    pub v0: u16,
    pub v1: u16,
    pub v2: u16,
    pub normal_index: u16,
    pub plane_distance: i16,
}

/// Decoded collision mesh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct CollisionMesh {
    pub header: CollisionHeader,
    pub kd_nodes: Vec<KdNode>,
    pub face_indices: Vec<i16>,
    pub vertices: Vec<TspVertex>,
    /// Face normals in 1.15 fixed point
    pub normals: Vec<TspVertex>,
    pub faces: Vec<CollisionFace>,
}

impl CollisionMesh {
    /// Read the collision block starting at `position`
    pub fn read<R: Read + Seek>(reader: &mut R, position: u64) -> Result<Self> {
        reader.seek(SeekFrom::Start(position))?;
        let header = CollisionHeader::read(reader)?;
        debug!(
            "Collision bounds ({}, {})..({}, {}), {} KD nodes, {} faces",
            header.min_x, header.min_z, header.max_x, header.max_z, header.num_kd_nodes, header.num_faces
        );

        let kd_nodes = read_records::<_, KdNode>(reader, header.num_kd_nodes)?;

        let mut face_indices = Vec::with_capacity(header.num_face_indices as usize);
        for _ in 0..header.num_face_indices {
            face_indices.push(reader.read_i16::<LittleEndian>()?);
        }

        // The index list is padded to a 4-byte boundary only when the pad is zero
        let pad = reader.read_i16::<LittleEndian>()?;
        if pad != 0 {
            trace!("No pad after face index list ({}), rewinding", pad);
            reader.seek(SeekFrom::Current(-2))?;
        }

        let vertices = read_records::<_, TspVertex>(reader, header.num_vertices)?;
        let normals = read_records::<_, TspVertex>(reader, header.num_normals)?;
        let faces = read_records::<_, CollisionFace>(reader, header.num_faces)?;

        let mesh = Self {
            header,
            kd_nodes,
            face_indices,
            vertices,
            normals,
            faces,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    fn validate(&self) -> Result<()> {
        for face in &self.faces {
            if face.normal_index as usize >= self.normals.len() {
                return Err(TspError::InvalidReference {
                    field: "collision normal index",
                    value: face.normal_index as i64,
                    max: self.normals.len(),
                });
            }
            for v in [face.v0, face.v1, face.v2] {
                if v as usize >= self.vertices.len() {
                    return Err(TspError::InvalidReference {
                        field: "collision vertex index",
                        value: v as i64,
                        max: self.vertices.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Whether an X/Z point lies inside the collision bounds (inclusive)
    pub fn contains(&self, x: i32, z: i32) -> bool {
        let h = &self.header;
        x >= i32::from(h.min_x) && x <= i32::from(h.max_x) && z >= i32::from(h.min_z) && z <= i32::from(h.max_z)
    }
}

fn read_records<R, T>(reader: &mut R, count: u16) -> Result<Vec<T>>
where
    R: Read + Seek,
    T: for<'a> BinRead<Args<'a> = ()> + binrw::meta::ReadEndian,
{
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        records.push(T::read(reader)?);
    }
    Ok(records)
}
