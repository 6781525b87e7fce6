//! Decoded render objects

use std::io::{Read, Seek};

use glam::Vec3;
use jp_tsp::TspLevel;
use log::trace;

use crate::animation::{AnimationClip, AnimationFrame};
use crate::catalog::RenderObjectRecord;
use crate::error::Result;
use crate::face::{BsdFace, FaceCategory, FaceStage, read_face_block};
use crate::hierarchy::BoneTree;
use crate::types::{BsdColor, BsdVertex};
use crate::vertex::{AnimatedFace, VertexTable};

/// A render object with everything it owns.
///
/// Static objects fill `vertices`, `colors` and the two face arrays. Animated
/// objects additionally carry vertex tables, animated faces, a skeleton and
/// clips. The world object (id `0`) only carries `level`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct RenderObject {
    pub id: u32,
    pub referenced_id: i32,
    pub kind: i32,
    pub file_name: String,
    pub scale: Vec3,
    pub vertices: Vec<BsdVertex>,
    pub colors: Vec<BsdColor>,
    pub textured_faces: Vec<BsdFace>,
    pub untextured_faces: Vec<BsdFace>,
    pub vertex_tables: Vec<VertexTable>,
    pub animated_faces: Vec<AnimatedFace>,
    pub skeleton: Option<BoneTree>,
    pub animations: Vec<AnimationClip>,
    pub level: Option<TspLevel>,
    pub(crate) current: Option<(usize, usize)>,
    pub(crate) center: Vec3,
}

impl RenderObject {
    /// An empty object carrying the record's identity
    pub fn from_record(record: &RenderObjectRecord) -> Self {
        let [x, y, z] = record.scale_factors();
        Self {
            id: record.id,
            referenced_id: record.referenced_id,
            kind: record.kind,
            file_name: record.file_name.clone(),
            scale: Vec3::new(x, y, z),
            ..Self::default()
        }
    }

    pub fn is_world(&self) -> bool {
        self.level.is_some()
    }

    pub fn is_animated(&self) -> bool {
        self.skeleton.is_some()
    }

    /// Read a face block and append it to the stage's category.
    ///
    /// Blocks may be appended any number of times; faces keep call order. On
    /// error nothing is appended.
    pub fn append_faces<R: Read + Seek>(
        &mut self,
        reader: &mut R,
        stage: FaceStage,
        offset: i32,
    ) -> Result<usize> {
        let faces = read_face_block(reader, stage, offset)?;
        let added = faces.len();
        match stage.category() {
            FaceCategory::Textured => self.textured_faces.extend(faces),
            FaceCategory::Untextured => self.untextured_faces.extend(faces),
        }
        trace!("Object {}: {} {} appended", self.id, added, stage.name());
        Ok(added)
    }

    pub fn face_count(&self) -> usize {
        self.textured_faces.len() + self.untextured_faces.len() + self.animated_faces.len()
    }

    /// `(animation, frame)` of the applied pose
    pub fn current_pose(&self) -> Option<(usize, usize)> {
        self.current
    }

    pub fn current_frame(&self) -> Option<&AnimationFrame> {
        let (animation, frame) = self.current?;
        self.animations.get(animation)?.frames.get(frame)
    }

    /// Mean of all posed vertex positions; zero until a pose is applied
    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub(crate) fn refresh_center(&mut self) {
        let (sum, count) = self
            .vertex_tables
            .iter()
            .flat_map(|t| t.current.iter())
            .fold((Vec3::ZERO, 0usize), |(sum, n), v| (sum + v.to_vec3(), n + 1));
        self.center = if count == 0 {
            Vec3::ZERO
        } else {
            sum / count as f32
        };
    }
}
