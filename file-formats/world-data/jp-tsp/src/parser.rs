use std::io::{Read, Seek, SeekFrom};

use binrw::BinRead;
use log::{debug, warn};

use crate::collision::CollisionMesh;
use crate::dynamic::read_dynamic_blocks;
use crate::error::Result;
use crate::header::{TspHeader, TspSectionKind};
use crate::level::TspLevel;
use crate::node::{TspFace, read_nodes};
use crate::types::{Color, TspVertex};

/// Upper bound on capacity reserved from an untrusted count
const MAX_PREALLOCATION: usize = 4096;

/// Parser for TSP level geometry blocks
#[derive(Debug, Clone, Copy, Default)]
pub struct TspParser;

impl TspParser {
    /// Create a new TSP parser
    pub fn new() -> Self {
        Self
    }

    /// Parse a TSP block starting at `base`.
    ///
    /// `base` is the absolute position of the block inside `reader`; every
    /// header offset is resolved against it.
    pub fn parse<R: Read + Seek>(&self, reader: &mut R, base: u64) -> Result<TspLevel> {
        reader.seek(SeekFrom::Start(base))?;
        let mut header = TspHeader::read(reader)?;
        debug!(
            "TSP id {} version {}: {} nodes, {} faces, {} vertices, {} colors",
            header.id,
            header.version,
            header.nodes.count,
            header.faces.count,
            header.vertices.count,
            header.colors.count
        );

        let face_count = header.derived_face_count()?;
        if usize::try_from(header.faces.count).ok() != Some(face_count) {
            warn!(
                "TSP face count {} does not match face section span, using {}",
                header.faces.count, face_count
            );
            header.faces.count = i32::try_from(face_count).unwrap_or(i32::MAX);
        }

        let nodes = read_nodes(reader, &header, base)?;
        debug!("Read {} nodes", nodes.len());

        let faces = self.read_array::<_, TspFace>(reader, &header, base, TspSectionKind::Faces)?;
        let vertices =
            self.read_array::<_, TspVertex>(reader, &header, base, TspSectionKind::Vertices)?;
        let colors = self.read_array::<_, Color>(reader, &header, base, TspSectionKind::Colors)?;
        let dynamic_blocks = read_dynamic_blocks(reader, &header, base)?;

        let collision = if header.collision.count > 0 {
            let position = header.resolve(base, TspSectionKind::Collision)?;
            Some(CollisionMesh::read(reader, position)?)
        } else {
            None
        };

        Ok(TspLevel {
            header,
            nodes,
            faces,
            vertices,
            colors,
            dynamic_blocks,
            collision,
        })
    }

    fn read_array<R, T>(
        &self,
        reader: &mut R,
        header: &TspHeader,
        base: u64,
        kind: TspSectionKind,
    ) -> Result<Vec<T>>
    where
        R: Read + Seek,
        T: for<'a> BinRead<Args<'a> = ()> + binrw::meta::ReadEndian,
    {
        let count = header.count(kind)?;
        if count == 0 {
            return Ok(Vec::new());
        }
        reader.seek(SeekFrom::Start(header.resolve(base, kind)?))?;
        let mut items = Vec::with_capacity(count.min(MAX_PREALLOCATION));
        for _ in 0..count {
            items.push(T::read(reader)?);
        }
        debug!("Read {} {}", items.len(), kind.name());
        Ok(items)
    }
}
