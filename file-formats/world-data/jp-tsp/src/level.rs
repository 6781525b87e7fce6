use crate::collision::CollisionMesh;
use crate::dynamic::{DynamicFaceBlock, StrideState};
use crate::header::TspHeader;
use crate::node::{TspFace, TspNode};
use crate::query::CollisionHit;
use crate::types::{Color, TspVertex};

/// A fully decoded level geometry block
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct TspLevel {
    pub header: TspHeader,
    /// Node tree; index 0 is the root
    pub nodes: Vec<TspNode>,
    /// Full face records of the face section
    pub faces: Vec<TspFace>,
    pub vertices: Vec<TspVertex>,
    pub colors: Vec<Color>,
    pub dynamic_blocks: Vec<DynamicFaceBlock>,
    pub collision: Option<CollisionMesh>,
}

impl TspLevel {
    /// Root of the node tree
    pub fn root(&self) -> Option<&TspNode> {
        self.nodes.first()
    }

    /// Resolved children of a node
    pub fn children(&self, node: &TspNode) -> impl Iterator<Item = &TspNode> {
        node.children
            .iter()
            .flatten()
            .filter_map(|&index| self.nodes.get(index))
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Number of faces reachable through leaves
    pub fn leaf_face_count(&self) -> usize {
        self.nodes.iter().map(|n| n.faces.len()).sum()
    }

    /// Whether any dynamic block animates the given face
    pub fn is_face_dynamic(&self, face: usize) -> bool {
        self.dynamic_blocks.iter().any(|b| b.contains_face(face))
    }

    /// Dynamic block by its script identifier
    pub fn dynamic_block(&self, dynamic_data_index: i16) -> Option<&DynamicFaceBlock> {
        self.dynamic_blocks
            .iter()
            .find(|b| b.dynamic_data_index == dynamic_data_index)
    }

    /// Advance the stride of the block at `block` by one tick
    pub fn advance_stride(&self, block: usize, state: StrideState) -> Option<StrideState> {
        self.dynamic_blocks.get(block).map(|b| b.advance(state))
    }

    /// Floor height under `(x, z)` from the collision mesh
    pub fn height_at(&self, x: i32, z: i32) -> Option<CollisionHit> {
        self.collision.as_ref()?.height_at(x, z)
    }
}
