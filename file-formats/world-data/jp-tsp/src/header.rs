//! TSP header and section offset resolution
//!
//! A TSP block starts with a 52-byte header: an id, a version and six
//! `(count, offset)` pairs. Every offset is relative to the start of the TSP
//! block, which itself may be embedded inside a larger container, so all
//! positions are resolved against a caller-supplied base.

use binrw::BinRead;

use crate::error::{Result, TspError};
use crate::node::TSP_FACE_RECORD_SIZE;

/// Size of the on-disk TSP header in bytes
pub const TSP_HEADER_SIZE: u64 = 52;

/// A `(count, offset)` pair from the TSP header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct TspSection {
    pub count: i32,
    pub offset: i32,
}

/// Named sections of a TSP block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TspSectionKind {
    Nodes,
    Faces,
    Vertices,
    DynamicBlocks,
    Colors,
    Collision,
}

impl TspSectionKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nodes => "nodes",
            Self::Faces => "faces",
            Self::Vertices => "vertices",
            Self::DynamicBlocks => "dynamic blocks",
            Self::Colors => "colors",
            Self::Collision => "collision",
        }
    }
}

/// TSP header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct TspHeader {
    pub id: u16,
    pub version: u16,
    pub nodes: TspSection,
    pub faces: TspSection,
    pub vertices: TspSection,
    pub dynamic_blocks: TspSection,
    pub colors: TspSection,
    pub collision: TspSection,
}

impl TspHeader {
    /// Get a section by kind
    pub fn section(&self, kind: TspSectionKind) -> TspSection {
        match kind {
            TspSectionKind::Nodes => self.nodes,
            TspSectionKind::Faces => self.faces,
            TspSectionKind::Vertices => self.vertices,
            TspSectionKind::DynamicBlocks => self.dynamic_blocks,
            TspSectionKind::Colors => self.colors,
            TspSectionKind::Collision => self.collision,
        }
    }

    /// Element count of a section, rejecting negative values
    pub fn count(&self, kind: TspSectionKind) -> Result<usize> {
        let count = self.section(kind).count;
        usize::try_from(count).map_err(|_| TspError::InvalidCount {
            field: kind.name(),
            value: count as i64,
        })
    }

    /// Absolute stream position of a section for a TSP block starting at `base`
    pub fn resolve(&self, base: u64, kind: TspSectionKind) -> Result<u64> {
        resolve_offset(base, self.section(kind).offset, kind.name())
    }

    /// Face count derived from the distance between the face and vertex sections.
    ///
    /// The header count is unreliable in some files, the section span is not.
    pub fn derived_face_count(&self) -> Result<usize> {
        let span = i64::from(self.vertices.offset) - i64::from(self.faces.offset);
        if span < 0 {
            return Err(TspError::InvalidOffset {
                field: "faces",
                value: span,
            });
        }
        Ok((span as u64 / TSP_FACE_RECORD_SIZE) as usize)
    }
}

/// Add a block-relative offset to a base position
pub(crate) fn resolve_offset(base: u64, offset: i32, field: &'static str) -> Result<u64> {
    u64::try_from(offset)
        .ok()
        .and_then(|o| base.checked_add(o))
        .ok_or(TspError::InvalidOffset {
            field,
            value: offset as i64,
        })
}
