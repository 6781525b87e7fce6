//! Bone hierarchy
//!
//! Bones are 20-byte records linked by section-relative offsets. Each bone
//! owns one vertex table (and the rotation with the same index) plus a rest
//! position. `child2` shares its parent's parent transform; `child1` inherits
//! the bone's own transform.
//!
//! # Algorithm
//!
//! Posing starts from the frame translation and walks the tree from the root:
//!
//! 1. Build the bone rotation from its quaternion and transpose it
//! 2. Move the bone position through the parent transform
//! 3. The local transform is that translation times the rotation
//! 4. Transform every vertex of the bone's current table
//! 5. Recurse into `child2` with the parent transform, then `child1` with the
//!    local transform

use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};

use binrw::BinRead;
use glam::{Mat4, Vec3};
use log::trace;

use crate::codec::Quaternion;
use crate::error::{BsdError, Result};
use crate::section::{SectionKind, SectionTable};
use crate::types::BsdVertex;
use crate::vertex::VertexTable;

/// Size of a bone record
pub const BONE_RECORD_SIZE: u64 = 20;

/// Value of the pad word in every bone record
pub const BONE_PAD: i16 = -12851;

/// Deepest bone chain accepted while loading
pub const MAX_BONE_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy, BinRead)]
#[br(little)]
struct BoneRecord {
    table_index: u16,
    position: BsdVertex,
    pad: i16,
    child1: i32,
    child2: i32,
}

/// A bone stored in the tree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct BoneNode {
    /// Vertex table and rotation index
    pub table_index: u16,
    pub position: BsdVertex,
    /// Offset this bone was read from, inside the hierarchy section
    pub offset: i32,
    pub child1: Option<usize>,
    pub child2: Option<usize>,
}

impl BoneNode {
    pub fn children(&self) -> impl Iterator<Item = usize> {
        self.child2.into_iter().chain(self.child1)
    }
}

/// Bone tree stored as an arena; the root is always index 0
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct BoneTree {
    pub nodes: Vec<BoneNode>,
}

impl BoneTree {
    /// Load the tree rooted at `root_offset`.
    ///
    /// Every table index must name one of the `table_count` vertex tables.
    pub fn read<R: Read + Seek>(
        reader: &mut R,
        sections: &SectionTable,
        root_offset: i32,
        table_count: usize,
    ) -> Result<Self> {
        let mut tree = Self::default();
        let mut path = HashSet::new();
        let mut visited = HashSet::new();
        tree.load_bone(
            reader,
            sections,
            root_offset,
            table_count,
            &mut path,
            &mut visited,
        )?;
        trace!("Loaded {} bones", tree.nodes.len());
        Ok(tree)
    }

    fn load_bone<R: Read + Seek>(
        &mut self,
        reader: &mut R,
        sections: &SectionTable,
        offset: i32,
        table_count: usize,
        path: &mut HashSet<i32>,
        visited: &mut HashSet<i32>,
    ) -> Result<usize> {
        if !path.insert(offset) {
            return Err(BsdError::CyclicHierarchy { offset });
        }
        // Every bone record belongs to exactly one parent
        if !visited.insert(offset) {
            return Err(BsdError::SharedBone { offset });
        }
        if path.len() > MAX_BONE_DEPTH {
            return Err(BsdError::InvalidCount {
                field: "bone hierarchy depth",
                value: path.len() as i64,
            });
        }

        reader.seek(SeekFrom::Start(
            sections.resolve(SectionKind::HierarchyData, offset)?,
        ))?;
        let record = BoneRecord::read(reader)?;
        if record.pad != BONE_PAD {
            return Err(BsdError::InvalidPadding {
                field: "bone record",
                expected: BONE_PAD as u16,
                actual: record.pad as u16,
            });
        }
        if usize::from(record.table_index) >= table_count {
            return Err(BsdError::InvalidReference {
                field: "bone vertex table",
                value: i64::from(record.table_index),
                max: table_count,
            });
        }

        let index = self.nodes.len();
        self.nodes.push(BoneNode {
            table_index: record.table_index,
            position: record.position,
            offset,
            child1: None,
            child2: None,
        });

        if record.child2 != -1 {
            let child = self.load_bone(
                reader,
                sections,
                record.child2,
                table_count,
                path,
                visited,
            )?;
            self.nodes[index].child2 = Some(child);
        }
        if record.child1 != -1 {
            let child = self.load_bone(
                reader,
                sections,
                record.child1,
                table_count,
                path,
                visited,
            )?;
            self.nodes[index].child1 = Some(child);
        }
        path.remove(&offset);
        Ok(index)
    }

    pub fn root(&self) -> Option<&BoneNode> {
        self.nodes.first()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Largest rotation index any bone reads
    pub fn max_table_index(&self) -> Option<u16> {
        self.nodes.iter().map(|n| n.table_index).max()
    }

    /// Depth of the deepest bone, counting the root as 1
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = Vec::new();
        if !self.nodes.is_empty() {
            stack.push((0, 1));
        }
        while let Some((index, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            for child in self.nodes[index].children() {
                stack.push((child, depth + 1));
            }
        }
        deepest
    }

    /// Pose every bone's current vertex table.
    ///
    /// `rotations` must hold an entry for every bone's table index and
    /// `tables` must already hold rest positions in `current`.
    pub fn apply(&self, rotations: &[Quaternion], tables: &mut [VertexTable], root: Mat4) {
        if !self.nodes.is_empty() {
            self.apply_bone(0, rotations, tables, root);
        }
    }

    fn apply_bone(
        &self,
        index: usize,
        rotations: &[Quaternion],
        tables: &mut [VertexTable],
        parent: Mat4,
    ) {
        let bone = &self.nodes[index];
        let slot = usize::from(bone.table_index);
        let rotation = rotations
            .get(slot)
            .copied()
            .unwrap_or(Quaternion::IDENTITY);

        let local = local_transform(parent, bone.position, rotation);
        if let Some(table) = tables.get_mut(slot) {
            for vertex in &mut table.current {
                *vertex = transform_vertex(local, *vertex);
            }
        }

        if let Some(child) = bone.child2 {
            self.apply_bone(child, rotations, tables, parent);
        }
        if let Some(child) = bone.child1 {
            self.apply_bone(child, rotations, tables, local);
        }
    }
}

/// `translate(parent * position) * transpose(rotation)`
pub fn local_transform(parent: Mat4, position: BsdVertex, rotation: Quaternion) -> Mat4 {
    let rotation = Mat4::from_quat(rotation.to_quat()).transpose();
    let translated = parent.transform_point3(position.to_vec3());
    Mat4::from_translation(translated) * rotation
}

/// Transform a vertex, truncating back to integers
pub fn transform_vertex(transform: Mat4, vertex: BsdVertex) -> BsdVertex {
    let p: Vec3 = transform.transform_point3(vertex.to_vec3());
    BsdVertex {
        x: p.x as i16,
        y: p.y as i16,
        z: p.z as i16,
        pad: vertex.pad,
    }
}
